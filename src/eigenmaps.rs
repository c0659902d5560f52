//! # Eigenmaps of the mesh Laplacian
//!
//! Computes the `k` eigenpairs of smallest eigenvalue and row-normalises the
//! eigenvector matrix so every node's spectral feature vector has unit norm.
//!
//! # Solver seam
//!
//! Eigensolvers implement [`EigenSolver`]. The default [`DenseSymmetricSolver`]
//! runs smartcore's symmetric EVD (Householder tridiagonalisation followed by
//! implicit QL), which guarantees real eigenvalues. A truncated iterative
//! solver (e.g. Lanczos) can be plugged in for large meshes; it has to honour
//! the same contract:
//!
//! - exactly `k` pairs, eigenvalues ascending
//! - eigenvectors as the columns of an `N x k` matrix
//! - imaginary round-off reported in [`EigenPairs::imaginary_residue`]
//!
//! Row normalisation is applied by the caller, never by the solver.

use std::cmp::Ordering;
use std::fmt::Debug;

use log::{debug, info, log_enabled, trace, warn, Level};

use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linalg::traits::evd::EVDDecomposable;

use crate::errors::{Result, ShapeSpaceError};
use crate::operators::{column, eigen_residual, norm};

/// Imaginary parts above this are reported as numerical instability.
pub const IMAGINARY_TOLERANCE: f64 = 1e-10;
/// Negative eigenvalues down to `-NEGATIVE_TOLERANCE` are round-off and clamp to 0.
pub const NEGATIVE_TOLERANCE: f64 = 1e-10;

/// Truncated eigendecomposition of a symmetric matrix.
#[derive(Clone, Debug)]
pub struct EigenPairs {
    /// Eigenvalues in ascending order
    pub values: Vec<f64>,
    /// `N x k`, column `j` pairs with `values[j]`
    pub vectors: DenseMatrix<f64>,
    /// Largest discarded imaginary component
    pub imaginary_residue: f64,
    /// Round-off negative eigenvalues that were clamped to zero
    pub clamped: usize,
}

impl EigenPairs {
    #[inline]
    pub fn k(&self) -> usize {
        self.values.len()
    }
}

pub trait EigenSolver: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// The `k` eigenpairs of smallest eigenvalue of the symmetric `matrix`.
    fn smallest(&self, matrix: &DenseMatrix<f64>, k: usize) -> Result<EigenPairs>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DenseSymmetricSolver;

impl EigenSolver for DenseSymmetricSolver {
    fn name(&self) -> &'static str {
        "dense-symmetric"
    }

    fn smallest(&self, matrix: &DenseMatrix<f64>, k: usize) -> Result<EigenPairs> {
        let (n, m) = matrix.shape();
        if n != m {
            return Err(ShapeSpaceError::shape_mismatch(
                "square matrix",
                format!("{}x{}", n, m),
            ));
        }
        if k == 0 || k > n {
            return Err(ShapeSpaceError::TooManyEigenvectors { k, nodes: n });
        }

        info!("Dense symmetric eigendecomposition of {}x{} matrix", n, n);
        let evd = matrix
            .evd(true)
            .map_err(|e| ShapeSpaceError::Eigensolver(e.to_string()))?;
        trace!("EVD finished");

        let imaginary_residue = evd.e.iter().fold(0.0f64, |acc, &x| acc.max(x.abs()));
        if imaginary_residue > IMAGINARY_TOLERANCE {
            warn!(
                "Symmetric EVD left an imaginary residue of {:.3e}; keeping the real part",
                imaginary_residue
            );
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| evd.d[a].partial_cmp(&evd.d[b]).unwrap_or(Ordering::Equal));
        order.truncate(k);

        let mut clamped = 0usize;
        let values: Vec<f64> = order
            .iter()
            .map(|&idx| {
                let v = evd.d[idx];
                if v < 0.0 && v >= -NEGATIVE_TOLERANCE {
                    clamped += 1;
                    0.0
                } else {
                    if v < 0.0 {
                        warn!("Eigenvalue {:.3e} is negative beyond round-off", v);
                    }
                    v
                }
            })
            .collect();

        let vectors = DenseMatrix::from_iterator(
            (0..n).flat_map(|row| order.iter().map(move |&col| (row, col))).map(|pos| *evd.V.get(pos)),
            n,
            k,
            0,
        );

        debug!("Smallest {} eigenvalues: {:?}", k, values);
        Ok(EigenPairs { values, vectors, imaginary_residue, clamped })
    }
}

/// Scale every row of `vectors` to unit Euclidean norm.
///
/// Rows with (numerically) zero norm are left at zero; their count is returned.
pub fn row_normalise(vectors: &DenseMatrix<f64>) -> (DenseMatrix<f64>, usize) {
    let (n, k) = vectors.shape();
    let mut zero_rows = 0usize;
    let mut flat = Vec::with_capacity(n * k);

    for i in 0..n {
        let row: Vec<f64> = (0..k).map(|j| *vectors.get((i, j))).collect();
        let r = norm(&row);
        if r > f64::EPSILON {
            flat.extend(row.iter().map(|x| x / r));
        } else {
            zero_rows += 1;
            flat.extend(std::iter::repeat(0.0).take(k));
        }
    }

    if zero_rows > 0 {
        warn!("{} eigenvector rows have zero norm and stay unnormalised", zero_rows);
    }
    (DenseMatrix::from_iterator(flat.into_iter(), n, k, 0), zero_rows)
}

/// Largest `|L v - lambda v|` over the pairs, for debug logging.
pub fn max_residual(matrix: &DenseMatrix<f64>, pairs: &EigenPairs) -> f64 {
    (0..pairs.k())
        .map(|j| eigen_residual(matrix, &column(&pairs.vectors, j), pairs.values[j]))
        .fold(0.0, f64::max)
}

/// Solve, then log the residual when debug logging is on.
pub fn compute_eigenmaps(
    solver: &dyn EigenSolver,
    matrix: &DenseMatrix<f64>,
    k: usize,
) -> Result<EigenPairs> {
    debug!("Computing {} eigenpairs with the {} solver", k, solver.name());
    let pairs = solver.smallest(matrix, k)?;
    if log_enabled!(Level::Debug) {
        debug!("Max eigen residual: {:.3e}", max_residual(matrix, &pairs));
    }
    Ok(pairs)
}
