//! Spectral shape encoding of signed distance fields.
//!
//! An encoder is a thin, stateless view over a shared [`SpectralBasis`]:
//! it subsamples an `n x n` SDF grid at the basis index map, flattens the
//! `res x res` samples in node order and multiplies by the cached
//! pseudoinverse. The result is the least-squares coefficient vector
//! ("shape code") of length `k`.

use std::ops::Index;
use std::sync::Arc;

use log::{debug, info, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array2;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::core::SpectralBasis;
use crate::errors::{Result, ShapeSpaceError};
use crate::operators::mat_vec;

/// Least-squares coefficients of one geometry in a spectral basis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeCode {
    pub coefficients: Vec<f64>,
}

impl ShapeCode {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.coefficients
    }

    /// Repeat the code once per node: an `n_nodes x k` conditioning matrix.
    pub fn tile(&self, n_nodes: usize) -> DenseMatrix<f64> {
        let k = self.len();
        DenseMatrix::from_iterator(
            (0..n_nodes).flat_map(|_| self.coefficients.iter().copied()),
            n_nodes,
            k,
            0,
        )
    }
}

impl Index<usize> for ShapeCode {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.coefficients[i]
    }
}

#[derive(Clone, Debug)]
pub struct SpectralShapeEncoder {
    basis: Arc<SpectralBasis>,
}

impl SpectralShapeEncoder {
    pub fn new(basis: Arc<SpectralBasis>) -> Self {
        debug!("Creating encoder over {}", basis);
        Self { basis }
    }

    pub fn basis(&self) -> &Arc<SpectralBasis> {
        &self.basis
    }

    /// Length of every code this encoder produces.
    #[inline]
    pub fn k(&self) -> usize {
        self.basis.k()
    }

    /// Subsample an `n x n` SDF grid to the `res^2` mesh samples, in node order.
    pub fn sample(&self, sdf: &DenseMatrix<f64>) -> Result<Vec<f64>> {
        self.basis.index_map().sample(sdf)
    }

    /// Shape code of an `n x n` SDF grid.
    pub fn encode(&self, sdf: &DenseMatrix<f64>) -> Result<ShapeCode> {
        let f = self.sample(sdf)?;
        trace!("Sampled {} SDF values", f.len());
        self.project(&f)
    }

    /// Shape code of already-sampled mesh values (length `res^2`).
    pub fn project(&self, samples: &[f64]) -> Result<ShapeCode> {
        Ok(ShapeCode::new(self.basis.projector().project(samples)?))
    }

    /// Encode many grids in parallel; fails on the first malformed grid.
    pub fn encode_batch(&self, sdfs: &[DenseMatrix<f64>]) -> Result<Vec<ShapeCode>> {
        info!("Encoding batch of {} SDF grids", sdfs.len());
        sdfs.par_iter().map(|sdf| self.encode(sdf)).collect()
    }

    /// `E c`: the spectral reconstruction of a code over the mesh nodes.
    pub fn reconstruct(&self, code: &ShapeCode) -> Result<Vec<f64>> {
        if code.len() != self.k() {
            return Err(ShapeSpaceError::shape_mismatch(
                format!("code of length {}", self.k()),
                format!("code of length {}", code.len()),
            ));
        }
        Ok(mat_vec(self.basis.eigenvectors(), code.as_slice()))
    }

    /// Root-mean-square residual of the rank-k reconstruction of `sdf`.
    pub fn reconstruction_error(&self, sdf: &DenseMatrix<f64>) -> Result<f64> {
        let f = self.sample(sdf)?;
        let code = self.project(&f)?;
        let approx = self.reconstruct(&code)?;
        let sq: f64 = f.iter().zip(approx.iter()).map(|(a, b)| (a - b).powi(2)).sum();
        Ok((sq / f.len() as f64).sqrt())
    }
}
