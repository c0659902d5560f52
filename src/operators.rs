//! Dense linear-algebra helpers over `DenseMatrix<f64>` and slices.
//!
//! - Norms and dot products without allocation
//! - Matrix-vector and matrix-matrix products, row-parallel with rayon
//! - Rayleigh quotient and eigen-residual for checking eigenpairs

use rayon::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Computes the Euclidean norm (L2) without allocating.
#[inline]
pub fn norm(a: &[f64]) -> f64 {
    a.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "dot: length mismatch");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Copy of row `i`.
pub fn row(m: &DenseMatrix<f64>, i: usize) -> Vec<f64> {
    let (_, cols) = m.shape();
    (0..cols).map(|j| *m.get((i, j))).collect()
}

/// Copy of column `j`.
pub fn column(m: &DenseMatrix<f64>, j: usize) -> Vec<f64> {
    let (rows, _) = m.shape();
    (0..rows).map(|i| *m.get((i, j))).collect()
}

/// `m * v`
pub fn mat_vec(m: &DenseMatrix<f64>, v: &[f64]) -> Vec<f64> {
    let (rows, cols) = m.shape();
    assert_eq!(cols, v.len(), "mat_vec: {} columns vs vector of {}", cols, v.len());
    (0..rows)
        .into_par_iter()
        .map(|i| (0..cols).map(|j| m.get((i, j)) * v[j]).sum::<f64>())
        .collect()
}

/// `a^T * b` without materialising the transpose.
pub fn transpose_mul(a: &DenseMatrix<f64>, b: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    let (n, k) = a.shape();
    let (n2, m) = b.shape();
    assert_eq!(n, n2, "transpose_mul: row counts {} and {} differ", n, n2);

    let flat: Vec<f64> = (0..k)
        .into_par_iter()
        .flat_map_iter(|i| {
            (0..m).map(move |j| (0..n).map(|l| a.get((l, i)) * b.get((l, j))).sum::<f64>())
        })
        .collect();
    DenseMatrix::from_iterator(flat.into_iter(), k, m, 0)
}

/// `a * b^T` without materialising the transpose.
pub fn mul_transpose(a: &DenseMatrix<f64>, b: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    let (n, k) = a.shape();
    let (m, k2) = b.shape();
    assert_eq!(k, k2, "mul_transpose: column counts {} and {} differ", k, k2);

    let flat: Vec<f64> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            (0..m).map(move |j| (0..k).map(|l| a.get((i, l)) * b.get((j, l))).sum::<f64>())
        })
        .collect();
    DenseMatrix::from_iterator(flat.into_iter(), n, m, 0)
}

/// Rayleigh quotient x^T L x / x^T x for a dense symmetric L.
pub fn rayleigh_quotient(l: &DenseMatrix<f64>, x: &[f64]) -> f64 {
    assert!(!x.is_empty(), "vector cannot be empty");
    let den: f64 = x.iter().map(|&xi| xi * xi).sum();
    if den <= 0.0 {
        return 0.0;
    }
    dot(x, &mat_vec(l, x)) / den
}

/// `|L v - lambda v|`
pub fn eigen_residual(l: &DenseMatrix<f64>, v: &[f64], lambda: f64) -> f64 {
    let lv = mat_vec(l, v);
    lv.iter()
        .zip(v.iter())
        .map(|(a, b)| (a - lambda * b).powi(2))
        .sum::<f64>()
        .sqrt()
}
