//! Error taxonomy for basis construction, encoding and interpolation.
//!
//! Configuration errors are raised once, when a [`crate::core::SpectralBasis`]
//! is built, and are never retried. Numerical instability is *not* an error:
//! it is logged with `warn!` and recorded in
//! [`crate::core::NumericalDiagnostics`]. Coordinate clamping in the
//! interpolator is a silent, deterministic correction.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeSpaceError {
    #[error("mesh resolution must be at least 2, got {0}")]
    DegenerateMesh(usize),

    #[error("number of retained eigenvectors must be at least 1")]
    EmptyBasis,

    #[error("k={k} exceeds the {nodes} nodes of the mesh")]
    TooManyEigenvectors { k: usize, nodes: usize },

    #[error("invalid domain bounds [{lb}, {ub}]")]
    InvalidBounds { lb: f64, ub: f64 },

    #[error("mesh resolution {res} exceeds grid resolution {n}")]
    ResolutionExceedsGrid { res: usize, n: usize },

    #[error("mesh coordinate {coord} maps to index {index} outside a {n}-point grid")]
    MeshOutsideBounds { coord: f64, index: i64, n: usize },

    #[error("kernel bandwidth must be finite and positive, got {0}")]
    InvalidBandwidth(f64),

    #[error("eigendecomposition failed: {0}")]
    Eigensolver(String),

    #[error("shape mismatch: expected {expected}, got {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("feature grid of shape ({channels}, {rows}, {cols}) needs {expected} values, got {found}")]
    GridData {
        channels: usize,
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },

    #[error("cannot parse shape: {0}")]
    ShapeParse(String),

    #[error("train fraction must lie in [0, 1], got {0}")]
    InvalidSplit(f64),
}

impl ShapeSpaceError {
    /// True for the errors raised while validating a basis configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ShapeSpaceError::DegenerateMesh(_)
                | ShapeSpaceError::EmptyBasis
                | ShapeSpaceError::TooManyEigenvectors { .. }
                | ShapeSpaceError::InvalidBounds { .. }
                | ShapeSpaceError::ResolutionExceedsGrid { .. }
                | ShapeSpaceError::MeshOutsideBounds { .. }
                | ShapeSpaceError::InvalidBandwidth(_)
        )
    }

    pub(crate) fn shape_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        ShapeSpaceError::ShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShapeSpaceError>;
