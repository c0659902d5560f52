use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use smartcore::linalg::basic::arrays::Array2;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::builder::SpectralBasisBuilder;
use crate::core::{SpectralBasis, SpectralParams};
use crate::encoder::SpectralShapeEncoder;

pub fn basis(params: SpectralParams) -> Arc<SpectralBasis> {
    Arc::new(SpectralBasisBuilder::new().with_params(params).build().unwrap())
}

pub fn encoder(params: SpectralParams) -> SpectralShapeEncoder {
    SpectralShapeEncoder::new(basis(params))
}

/// `n x n` grid with `f(x, y)` at entry `(row, col)`, `x = col / (n - 1)`, `y = row / (n - 1)`.
pub fn grid_from_fn(n: usize, f: impl Fn(f64, f64) -> f64) -> DenseMatrix<f64> {
    let step = 1.0 / (n - 1) as f64;
    DenseMatrix::from_iterator(
        (0..n).flat_map(|r| (0..n).map(move |c| (c as f64 * step, r as f64 * step))).map(|(x, y)| f(x, y)),
        n,
        n,
        0,
    )
}

pub fn matrix(rows: Vec<Vec<f64>>) -> DenseMatrix<f64> {
    DenseMatrix::from_2d_vec(&rows).unwrap()
}

pub fn random_vec(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| StandardNormal.sample(&mut rng)).collect()
}
