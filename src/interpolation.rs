//! # Smooth, differentiable interpolation of 2D feature grids
//!
//! A [`FeatureGrid`] has shape `(channels, rows, cols)` and covers the unit
//! square: column index `0..cols` spans `x in [0, 1]`, row index `0..rows`
//! spans `y in [0, 1]`. A query point `(x, y)` is
//!
//! 1. clamped to `[eps, 1 - eps]` per component,
//! 2. scaled by `cols - 1` / `rows - 1` and split into an integer cell and a
//!    fractional offset `(xf, yf)`,
//! 3. blended from the four cell corners with a cubic Hermite ease curve
//!    `smoothstep(a0, a1, w) = (a1 - a0)(3 - 2w)w^2 + a0`, once row-then-column
//!    and once column-then-row, averaging the two passes.
//!
//! The ease curve has zero slope at `w = 0` and `w = 1`, so the interpolant is
//! C1 across cell boundaries, and it never leaves `[a0, a1]`.
//!
//! ## Gradients
//!
//! The interpolant sits inside a trainable pipeline, so both derivatives are
//! available in closed form:
//!
//! - [`GridInterpolator::interpolate_with_gradient`]: `d value / d x` and
//!   `d value / d y` for every point and channel. The clamp passes the
//!   gradient through on the closed interval `[eps, 1 - eps]` and blocks it
//!   outside.
//! - [`GridInterpolator::grid_gradient`]: the vector-Jacobian product with
//!   respect to the grid values, given upstream gradients of the outputs.
//!
//! Points are processed as a batch with rayon; there is no per-point
//! allocation beyond the output row.

use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::{Result, ShapeSpaceError};

pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Cubic Hermite blend between `a0` (at `w = 0`) and `a1` (at `w = 1`).
#[inline]
pub fn smoothstep(a0: f64, a1: f64, w: f64) -> f64 {
    (a1 - a0) * (3.0 - w * 2.0) * w * w + a0
}

/// Linear blend between `a0` (at `w = 0`) and `a1` (at `w = 1`).
#[inline]
pub fn linstep(a0: f64, a1: f64, w: f64) -> f64 {
    (a1 - a0) * w + a0
}

/// Blend curve used between neighbouring grid values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Blend {
    #[default]
    Smooth,
    Linear,
}

impl Blend {
    #[inline]
    pub fn apply(self, a0: f64, a1: f64, w: f64) -> f64 {
        match self {
            Blend::Smooth => smoothstep(a0, a1, w),
            Blend::Linear => linstep(a0, a1, w),
        }
    }

    /// Share of `a1` in the blend at `w`.
    #[inline]
    pub fn weight(self, w: f64) -> f64 {
        match self {
            Blend::Smooth => (3.0 - 2.0 * w) * w * w,
            Blend::Linear => w,
        }
    }

    /// Derivative of [`Blend::weight`] with respect to `w`.
    #[inline]
    pub fn slope(self, w: f64) -> f64 {
        match self {
            Blend::Smooth => 6.0 * w * (1.0 - w),
            Blend::Linear => 1.0,
        }
    }
}

/// Dense `(channels, rows, cols)` grid, channel-major then row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureGrid {
    channels: usize,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Every channel needs at least one row and one column, and the buffer must
/// hold exactly `channels * rows * cols` values.
fn check_dims(channels: usize, rows: usize, cols: usize, found: usize) -> Result<()> {
    let expected = channels * rows * cols;
    if found != expected || (channels > 0 && (rows == 0 || cols == 0)) {
        return Err(ShapeSpaceError::GridData { channels, rows, cols, expected, found });
    }
    Ok(())
}

impl FeatureGrid {
    pub fn new(channels: usize, rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        check_dims(channels, rows, cols, data.len())?;
        Ok(Self { channels, rows, cols, data })
    }

    pub fn zeros(channels: usize, rows: usize, cols: usize) -> Result<Self> {
        Self::new(channels, rows, cols, vec![0.0; channels * rows * cols])
    }

    /// A channel-less 2D grid becomes a single-channel grid.
    pub fn from_matrix(matrix: &DenseMatrix<f64>) -> Result<Self> {
        let (rows, cols) = matrix.shape();
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(*matrix.get((r, c)));
            }
        }
        Self::new(1, rows, cols, data)
    }

    /// Stack equally shaped matrices as channels.
    pub fn from_channels(channels: &[DenseMatrix<f64>]) -> Result<Self> {
        let (rows, cols) = channels.first().map(|m| m.shape()).unwrap_or((0, 0));
        let mut data = Vec::with_capacity(channels.len() * rows * cols);
        for m in channels {
            if m.shape() != (rows, cols) {
                return Err(ShapeSpaceError::shape_mismatch(
                    format!("{}x{} channel", rows, cols),
                    format!("{}x{} channel", m.shape().0, m.shape().1),
                ));
            }
            data.extend(Self::from_matrix(m)?.data);
        }
        Self::new(channels.len(), rows, cols, data)
    }

    /// `(channels, rows, cols)`
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.channels, self.rows, self.cols)
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    fn offset(&self, channel: usize, row: usize, col: usize) -> usize {
        (channel * self.rows + row) * self.cols + col
    }

    #[inline]
    pub fn get(&self, channel: usize, row: usize, col: usize) -> f64 {
        self.data[self.offset(channel, row, col)]
    }

    pub fn set(&mut self, channel: usize, row: usize, col: usize, value: f64) {
        let i = self.offset(channel, row, col);
        self.data[i] = value;
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// One channel as a `rows x cols` matrix.
    pub fn channel(&self, channel: usize) -> DenseMatrix<f64> {
        let start = self.offset(channel, 0, 0);
        let end = start + self.rows * self.cols;
        DenseMatrix::from_iterator(self.data[start..end].iter().copied(), self.rows, self.cols, 0)
    }
}

/// Cell address of a clamped query point.
#[derive(Clone, Copy, Debug)]
struct Cell {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
    xf: f64,
    yf: f64,
    // d(cell coordinate) / d(query coordinate), zero where clamped
    dx: f64,
    dy: f64,
    clamped: bool,
}

#[inline]
fn clamp_unit(p: f64, epsilon: f64) -> (f64, bool) {
    let c = p.max(epsilon).min(1.0 - epsilon);
    (c, !(p >= epsilon && p <= 1.0 - epsilon))
}

#[inline]
fn split(c: f64, len: usize) -> (usize, usize, f64, f64) {
    let last = len.saturating_sub(1);
    let scale = last as f64;
    let x = c * scale;
    let i0 = (x.floor() as usize).min(last);
    let i1 = (i0 + 1).min(last);
    (i0, i1, x - i0 as f64, scale)
}

fn locate(point: &[f64; 2], rows: usize, cols: usize, epsilon: f64) -> Cell {
    let (cx, clamped_x) = clamp_unit(point[0], epsilon);
    let (cy, clamped_y) = clamp_unit(point[1], epsilon);
    let (x0, x1, xf, sx) = split(cx, cols);
    let (y0, y1, yf, sy) = split(cy, rows);
    Cell {
        x0,
        x1,
        y0,
        y1,
        xf,
        yf,
        dx: if clamped_x { 0.0 } else { sx },
        dy: if clamped_y { 0.0 } else { sy },
        clamped: clamped_x || clamped_y,
    }
}

/// Per-point, per-channel values with their coordinate derivatives.
#[derive(Clone, Debug)]
pub struct InterpolationOutput {
    /// `n_points x channels`
    pub values: DenseMatrix<f64>,
    /// `d value / d x`, `n_points x channels`
    pub d_dx: DenseMatrix<f64>,
    /// `d value / d y`, `n_points x channels`
    pub d_dy: DenseMatrix<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridInterpolator {
    pub epsilon: f64,
    pub blend: Blend,
}

impl Default for GridInterpolator {
    fn default() -> Self {
        Self { epsilon: DEFAULT_EPSILON, blend: Blend::Smooth }
    }
}

impl GridInterpolator {
    /// Smoothstep interpolator with the given clamping tolerance, kept in `[0, 0.5]`.
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon: epsilon.clamp(0.0, 0.5), blend: Blend::Smooth }
    }

    pub fn with_blend(mut self, blend: Blend) -> Self {
        self.blend = blend;
        self
    }

    fn cells(&self, grid: &FeatureGrid, points: &[[f64; 2]]) -> Vec<Cell> {
        let (_, rows, cols) = grid.shape();
        let cells: Vec<Cell> = points
            .par_iter()
            .map(|p| locate(p, rows, cols, self.epsilon))
            .collect();
        if log::log_enabled!(log::Level::Trace) {
            let clamped = cells.iter().filter(|c| c.clamped).count();
            trace!("{} of {} query points clamped into [eps, 1 - eps]", clamped, cells.len());
        }
        cells
    }

    /// Two-pass blend of the four corners of `cell` in `channel`.
    #[inline]
    fn blend_cell(&self, grid: &FeatureGrid, channel: usize, cell: &Cell) -> f64 {
        let v00 = grid.get(channel, cell.y0, cell.x0);
        let v10 = grid.get(channel, cell.y0, cell.x1);
        let v01 = grid.get(channel, cell.y1, cell.x0);
        let v11 = grid.get(channel, cell.y1, cell.x1);
        let b = self.blend;

        let bottom = b.apply(v00, v10, cell.xf);
        let top = b.apply(v01, v11, cell.xf);
        let left = b.apply(v00, v01, cell.yf);
        let right = b.apply(v10, v11, cell.yf);

        0.5 * b.apply(left, right, cell.xf) + 0.5 * b.apply(bottom, top, cell.yf)
    }

    /// Values at every point: an `n_points x channels` matrix.
    pub fn interpolate(&self, grid: &FeatureGrid, points: &[[f64; 2]]) -> DenseMatrix<f64> {
        debug!(
            "Interpolating {:?} grid at {} points ({:?} blend)",
            grid.shape(),
            points.len(),
            self.blend
        );
        let channels = grid.channels();
        let cells = self.cells(grid, points);
        let flat: Vec<f64> = cells
            .par_iter()
            .flat_map_iter(|cell| (0..channels).map(move |c| self.blend_cell(grid, c, cell)))
            .collect();
        DenseMatrix::from_iterator(flat.into_iter(), points.len(), channels, 0)
    }

    /// Values plus their derivatives with respect to the query coordinates.
    pub fn interpolate_with_gradient(
        &self,
        grid: &FeatureGrid,
        points: &[[f64; 2]],
    ) -> InterpolationOutput {
        let channels = grid.channels();
        let n = points.len();
        let cells = self.cells(grid, points);
        let b = self.blend;

        let triples: Vec<(f64, f64, f64)> = cells
            .par_iter()
            .flat_map_iter(|cell| {
                (0..channels).map(move |c| {
                    let v00 = grid.get(c, cell.y0, cell.x0);
                    let v10 = grid.get(c, cell.y0, cell.x1);
                    let v01 = grid.get(c, cell.y1, cell.x0);
                    let v11 = grid.get(c, cell.y1, cell.x1);
                    let (hx, hy) = (b.weight(cell.xf), b.weight(cell.yf));
                    let (sx, sy) = (b.slope(cell.xf), b.slope(cell.yf));

                    let value = self.blend_cell(grid, c, cell);
                    let d_xf = sx * ((1.0 - hy) * (v10 - v00) + hy * (v11 - v01));
                    let d_yf = sy * ((1.0 - hx) * (v01 - v00) + hx * (v11 - v10));
                    (value, d_xf * cell.dx, d_yf * cell.dy)
                })
            })
            .collect();

        InterpolationOutput {
            values: DenseMatrix::from_iterator(triples.iter().map(|t| t.0), n, channels, 0),
            d_dx: DenseMatrix::from_iterator(triples.iter().map(|t| t.1), n, channels, 0),
            d_dy: DenseMatrix::from_iterator(triples.iter().map(|t| t.2), n, channels, 0),
        }
    }

    /// Vector-Jacobian product with respect to the grid values.
    ///
    /// `upstream` holds `d loss / d value` for every point and channel
    /// (`n_points x channels`); the result has the shape of `grid`.
    pub fn grid_gradient(
        &self,
        grid: &FeatureGrid,
        points: &[[f64; 2]],
        upstream: &DenseMatrix<f64>,
    ) -> Result<FeatureGrid> {
        let (channels, rows, cols) = grid.shape();
        if upstream.shape() != (points.len(), channels) {
            return Err(ShapeSpaceError::shape_mismatch(
                format!("{}x{} upstream gradient", points.len(), channels),
                format!("{}x{} upstream gradient", upstream.shape().0, upstream.shape().1),
            ));
        }

        let cells = self.cells(grid, points);
        let len = channels * rows * cols;
        let b = self.blend;

        let data = cells
            .par_iter()
            .enumerate()
            .fold(
                || vec![0.0; len],
                |mut acc, (i, cell)| {
                    let (hx, hy) = (b.weight(cell.xf), b.weight(cell.yf));
                    let corners = [
                        (cell.y0, cell.x0, (1.0 - hx) * (1.0 - hy)),
                        (cell.y0, cell.x1, hx * (1.0 - hy)),
                        (cell.y1, cell.x0, (1.0 - hx) * hy),
                        (cell.y1, cell.x1, hx * hy),
                    ];
                    for c in 0..channels {
                        let g = *upstream.get((i, c));
                        for &(r, col, w) in &corners {
                            acc[(c * rows + r) * cols + col] += g * w;
                        }
                    }
                    acc
                },
            )
            .reduce(
                || vec![0.0; len],
                |mut lhs, rhs| {
                    lhs.iter_mut().zip(rhs).for_each(|(x, y)| *x += y);
                    lhs
                },
            );

        FeatureGrid::new(channels, rows, cols, data)
    }
}

/// Interpolate `grid` at `points` with the default smoothstep blend.
pub fn interpolate(grid: &FeatureGrid, points: &[[f64; 2]], epsilon: f64) -> DenseMatrix<f64> {
    GridInterpolator::new(epsilon).interpolate(grid, points)
}
