//! # Least-squares projection onto a fixed spectral basis
//!
//! For a basis matrix `E` (`N x k`) the coefficients minimising `|E c - f|_2`
//! are given by the Moore–Penrose left pseudoinverse
//!
//! ```text
//! c = (E^T E)^-1 E^T f
//! ```
//!
//! `(E^T E)^-1 E^T` depends on `E` only, so it is computed once per basis and
//! every projection afterwards is a single `k x N` matrix-vector product.
//!
//! The Gram matrix `E^T E` is inverted through its own symmetric
//! eigendecomposition `V diag(mu) V^T`. When its reciprocal condition number
//! drops below [`GRAM_RCOND`] the spectrum is shifted by a Tikhonov ridge
//! `mu_max * GRAM_RCOND` and the event is logged as numerical instability.

use log::{debug, info, warn};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linalg::traits::evd::EVDDecomposable;

use crate::errors::{Result, ShapeSpaceError};
use crate::operators::{mat_vec, mul_transpose, transpose_mul};

/// Smallest accepted `mu_min / mu_max` of the Gram matrix before regularising.
pub const GRAM_RCOND: f64 = 1e-12;

/// `E^T E`
pub fn gram(e: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    transpose_mul(e, e)
}

/// Cached left pseudoinverse of a basis matrix.
#[derive(Clone, Debug)]
pub struct Projector {
    /// `k x N`
    pub pinv: DenseMatrix<f64>,
    /// `mu_max / mu_min` of `E^T E`, infinite when singular
    pub gram_condition: f64,
    pub regularised: bool,
}

impl Projector {
    /// Compute `(E^T E)^-1 E^T`.
    pub fn new(e: &DenseMatrix<f64>) -> Result<Self> {
        let (n, k) = e.shape();
        info!("Computing left pseudoinverse of {}x{} basis", n, k);

        let g = gram(e);
        let evd = g
            .evd(true)
            .map_err(|err| ShapeSpaceError::Eigensolver(err.to_string()))?;

        let mu_max = evd.d.iter().fold(0.0f64, |acc, &x| acc.max(x));
        let mu_min = evd.d.iter().fold(f64::INFINITY, |acc, &x| acc.min(x));
        let gram_condition = if mu_min > 0.0 { mu_max / mu_min } else { f64::INFINITY };
        debug!("Gram spectrum in [{:.3e}, {:.3e}], condition {:.3e}", mu_min, mu_max, gram_condition);

        let regularised = mu_min <= mu_max * GRAM_RCOND;
        let ridge = if regularised {
            let ridge = (mu_max * GRAM_RCOND).max(f64::MIN_POSITIVE);
            warn!(
                "E^T E is near-singular (condition {:.3e}); regularising with ridge {:.3e}",
                gram_condition, ridge
            );
            ridge
        } else {
            0.0
        };

        // (E^T E)^-1 = V diag(1 / mu) V^T
        let inv_mu: Vec<f64> = evd.d.iter().map(|&mu| 1.0 / (mu.max(0.0) + ridge)).collect();
        let scaled_v = DenseMatrix::from_iterator(
            (0..k).flat_map(|i| (0..k).map(move |j| (i, j))).map(|(i, j)| evd.V.get((i, j)) * inv_mu[j]),
            k,
            k,
            0,
        );
        let gram_inv = mul_transpose(&scaled_v, &evd.V);

        // (E^T E)^-1 E^T
        let pinv = mul_transpose(&gram_inv, e);
        debug!("Pseudoinverse shape: {:?}", pinv.shape());

        Ok(Self { pinv, gram_condition, regularised })
    }

    /// Number of coefficients produced per projection.
    #[inline]
    pub fn k(&self) -> usize {
        self.pinv.shape().0
    }

    /// Number of samples expected per projection.
    #[inline]
    pub fn nsamples(&self) -> usize {
        self.pinv.shape().1
    }

    /// Least-squares coefficients of `f` in the basis.
    pub fn project(&self, f: &[f64]) -> Result<Vec<f64>> {
        if f.len() != self.nsamples() {
            return Err(ShapeSpaceError::shape_mismatch(
                format!("{} samples", self.nsamples()),
                format!("{} samples", f.len()),
            ));
        }
        Ok(mat_vec(&self.pinv, f))
    }
}
