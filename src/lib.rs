//! # shapespace
//!
//! Numerical preprocessing for field prediction over 2D geometries:
//!
//! - **Spectral shape encoding**: a signed distance field sampled on an `n x n`
//!   grid is compressed into `k` coefficients of a graph-spectral basis built
//!   once over a regular mesh ([`builder::SpectralBasisBuilder`],
//!   [`encoder::SpectralShapeEncoder`]).
//! - **Grid interpolation**: smooth (C1), differentiable sampling of a
//!   `(channels, rows, cols)` feature grid at continuous coordinates
//!   ([`interpolation::GridInterpolator`]).
//!
//! Supporting modules rasterise polygonal shapes into SDF grids ([`sdf`]) and
//! turn raw per-geometry arrays into model-ready records ([`dataset`]).
//!
//! ```
//! use std::sync::Arc;
//! use shapespace::builder::SpectralBasisBuilder;
//! use shapespace::encoder::SpectralShapeEncoder;
//! use shapespace::sdf::{rasterise, Boundary, Point, Shape};
//!
//! let square = Shape::new(vec![Boundary::new(
//!     vec![
//!         Point::new(0.25, 0.25),
//!         Point::new(0.75, 0.25),
//!         Point::new(0.75, 0.75),
//!         Point::new(0.25, 0.75),
//!     ],
//!     false,
//! )]);
//! let sdf = rasterise(&square, 0.0, 1.0, 32).unwrap();
//!
//! let basis = SpectralBasisBuilder::new()
//!     .with_grid_size(32)
//!     .with_resolution(8)
//!     .with_eigenvectors(10)
//!     .build()
//!     .unwrap();
//! let encoder = SpectralShapeEncoder::new(Arc::new(basis));
//! let code = encoder.encode(&sdf).unwrap();
//! assert_eq!(code.len(), 10);
//! ```

pub mod builder;
pub mod core;
pub mod dataset;
pub mod eigenmaps;
pub mod encoder;
pub mod errors;
pub mod graph;
pub mod interpolation;
pub mod laplacian;
pub mod operators;
pub mod reduction;
pub mod sampling;
pub mod sdf;

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
