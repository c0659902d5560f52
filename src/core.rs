//! SpectralBasis: the cached eigenbasis of a regular mesh graph.
//!
//! A basis is built once per `(n, res, k, bounds, sigma)` configuration and
//! then shared read-only (usually behind an `Arc`) by every encoder:
//!
//! - a `res x res` unit mesh is the node set of a Gaussian kernel graph
//! - the normalised symmetric Laplacian of that graph is decomposed once
//! - the `k` smallest eigenvectors are row-normalised into `E` (`res^2 x k`)
//! - the left pseudoinverse `(E^T E)^-1 E^T` is cached next to `E`
//! - an index map subsamples any `n x n` grid down to the mesh
//!
//! Nothing is mutated after construction, so concurrent projections against
//! the same basis are safe.
//!
//! # Examples
//!
//! ```
//! use shapespace::builder::SpectralBasisBuilder;
//!
//! let basis = SpectralBasisBuilder::new()
//!     .with_grid_size(16)
//!     .with_resolution(8)
//!     .with_eigenvectors(5)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(basis.eigenvalues().len(), 5);
//! assert!(basis.eigenvalues()[0].abs() < 1e-6);
//! ```

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::eigenmaps::{compute_eigenmaps, row_normalise, EigenSolver};
use crate::errors::{Result, ShapeSpaceError};
use crate::graph::{GraphFactory, GraphParams};
use crate::reduction::Projector;
use crate::sampling::{GridIndexMap, UnitMesh};

/// Configuration of a spectral basis.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SpectralParams {
    /// Rows/columns of the native (square) SDF grid
    pub n: usize,
    /// Mesh points per axis used to build the graph
    pub res: usize,
    /// Retained eigenvectors
    pub k: usize,
    /// Domain coordinate of the first grid row/column
    pub lb: f64,
    /// Domain coordinate of the last grid row/column
    pub ub: f64,
    /// Kernel bandwidth
    pub sigma: f64,
}

impl Default for SpectralParams {
    fn default() -> Self {
        Self { n: 64, res: 16, k: 25, lb: 0.0, ub: 1.0, sigma: 1.0 }
    }
}

// Custom PartialEq implementation using approximate equality for floats
impl PartialEq for SpectralParams {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n
            && self.res == other.res
            && self.k == other.k
            && approx::relative_eq!(self.lb, other.lb)
            && approx::relative_eq!(self.ub, other.ub)
            && approx::relative_eq!(self.sigma, other.sigma)
    }
}

impl SpectralParams {
    /// Reject configurations that cannot produce a basis.
    pub fn validate(&self) -> Result<()> {
        if self.res < 2 {
            return Err(ShapeSpaceError::DegenerateMesh(self.res));
        }
        if self.k == 0 {
            return Err(ShapeSpaceError::EmptyBasis);
        }
        let nodes = self.res * self.res;
        if self.k > nodes {
            return Err(ShapeSpaceError::TooManyEigenvectors { k: self.k, nodes });
        }
        if self.res > self.n {
            return Err(ShapeSpaceError::ResolutionExceedsGrid { res: self.res, n: self.n });
        }
        if !(self.lb.is_finite() && self.ub.is_finite()) || self.ub <= self.lb {
            return Err(ShapeSpaceError::InvalidBounds { lb: self.lb, ub: self.ub });
        }
        GraphParams { sigma: self.sigma, ..GraphParams::default() }.validate()
    }

    #[inline]
    pub fn nnodes(&self) -> usize {
        self.res * self.res
    }
}

/// Numerical health of a basis, recorded during construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericalDiagnostics {
    /// Largest imaginary component discarded from the eigendecomposition
    pub imaginary_residue: f64,
    /// Round-off negative eigenvalues clamped to zero
    pub negative_eigenvalues_clamped: usize,
    /// Eigenvector rows with zero norm
    pub zero_norm_rows: usize,
    /// Condition number of `E^T E`
    pub gram_condition: f64,
    /// Whether `E^T E` had to be regularised before inversion
    pub regularised: bool,
}

impl NumericalDiagnostics {
    pub fn is_stable(&self) -> bool {
        self.imaginary_residue <= crate::eigenmaps::IMAGINARY_TOLERANCE
            && !self.regularised
            && self.zero_norm_rows == 0
    }
}

/// Cached spectral basis over a regular mesh.
#[derive(Clone, Debug)]
pub struct SpectralBasis {
    params: SpectralParams,
    mesh: UnitMesh,
    index_map: GridIndexMap,
    eigenvectors: DenseMatrix<f64>,
    eigenvalues: Vec<f64>,
    projector: Projector,
    diagnostics: NumericalDiagnostics,
}

impl SpectralBasis {
    /// Build a basis with the given solver. Prefer
    /// [`crate::builder::SpectralBasisBuilder`] for everyday use.
    pub fn new(params: SpectralParams, solver: &dyn EigenSolver) -> Result<Self> {
        params.validate()?;
        info!(
            "Building spectral basis: n={}, res={}, k={}, bounds=[{}, {}], sigma={}",
            params.n, params.res, params.k, params.lb, params.ub, params.sigma
        );

        // Steps 1 and 6: mesh and index map into the native grid
        let mesh = UnitMesh::new(params.res);
        let index_map = GridIndexMap::new(&mesh.coords, params.n, params.lb, params.ub)?;

        // Steps 2 and 3: kernel graph and its normalised Laplacian
        let graph_params = GraphParams { sigma: params.sigma, ..GraphParams::default() };
        let gl = GraphFactory::build_mesh_laplacian(&mesh, &graph_params)?;

        // Step 4: k smallest eigenpairs
        let pairs = compute_eigenmaps(solver, &gl.matrix, params.k)?;

        // Step 5: unit-norm rows
        let (eigenvectors, zero_norm_rows) = row_normalise(&pairs.vectors);

        let projector = Projector::new(&eigenvectors)?;

        let diagnostics = NumericalDiagnostics {
            imaginary_residue: pairs.imaginary_residue,
            negative_eigenvalues_clamped: pairs.clamped,
            zero_norm_rows,
            gram_condition: projector.gram_condition,
            regularised: projector.regularised,
        };
        debug!("Basis diagnostics: {:?}", diagnostics);
        info!("Spectral basis ready: {} eigenpairs over {} nodes", params.k, mesh.nnodes());

        Ok(Self {
            params,
            mesh,
            index_map,
            eigenvectors,
            eigenvalues: pairs.values,
            projector,
            diagnostics,
        })
    }

    #[inline]
    pub fn params(&self) -> &SpectralParams {
        &self.params
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.params.k
    }

    #[inline]
    pub fn res(&self) -> usize {
        self.params.res
    }

    #[inline]
    pub fn nnodes(&self) -> usize {
        self.mesh.nnodes()
    }

    pub fn mesh(&self) -> &UnitMesh {
        &self.mesh
    }

    /// Native-grid index of each mesh coordinate, shared by both axes.
    pub fn index_map(&self) -> &GridIndexMap {
        &self.index_map
    }

    /// Row-normalised eigenvectors `E`, `res^2 x k`.
    pub fn eigenvectors(&self) -> &DenseMatrix<f64> {
        &self.eigenvectors
    }

    /// Ascending eigenvalues paired with the columns of `E`.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Cached `(E^T E)^-1 E^T`, `k x res^2`.
    pub fn pseudoinverse(&self) -> &DenseMatrix<f64> {
        &self.projector.pinv
    }

    pub(crate) fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn diagnostics(&self) -> &NumericalDiagnostics {
        &self.diagnostics
    }
}

impl fmt::Display for SpectralBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.eigenvectors.shape();
        write!(
            f,
            "SpectralBasis(n={}, res={}, k={}, E={}x{})",
            self.params.n, self.params.res, self.params.k, rows, cols
        )
    }
}
