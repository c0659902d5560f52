//! Regular unit mesh and the index map that subsamples a native-resolution
//! grid down to the mesh.
//!
//! Node ordering is row-major: node `i = row * res + col` sits at
//! `(x, y) = (t[col], t[row])` with `t = linspace(0, 1, res)`. A native grid is
//! sampled as `grid[(idx[row], idx[col])]`, so flattened samples line up with
//! the node ordering used to build the Laplacian. Both axes share the same
//! coordinates and bounds, hence a single index vector serves both.

use log::{debug, trace};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::{Result, ShapeSpaceError};

/// `res` evenly spaced values covering `[0, 1]` inclusive.
pub fn linspace(res: usize) -> Vec<f64> {
    match res {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let step = 1.0 / (res - 1) as f64;
            (0..res).map(|j| j as f64 * step).collect()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitMesh {
    pub res: usize,
    pub coords: Vec<f64>,
}

impl UnitMesh {
    pub fn new(res: usize) -> Self {
        trace!("Generating {}x{} unit mesh", res, res);
        Self { res, coords: linspace(res) }
    }

    #[inline]
    pub fn nnodes(&self) -> usize {
        self.res * self.res
    }

    /// Coordinates of node `i` in the unit square.
    #[inline]
    pub fn node(&self, i: usize) -> [f64; 2] {
        let (row, col) = (i / self.res, i % self.res);
        [self.coords[col], self.coords[row]]
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        (0..self.nnodes()).map(|i| self.node(i)).collect()
    }
}

/// Maps each mesh coordinate to its index in an `n`-point native grid:
/// `idx[j] = round((t_j - lb) / (ub - lb) * (n - 1))`.
#[derive(Clone, Debug, PartialEq)]
pub struct GridIndexMap {
    pub n: usize,
    pub indices: Vec<usize>,
}

impl GridIndexMap {
    pub fn new(coords: &[f64], n: usize, lb: f64, ub: f64) -> Result<Self> {
        if !(lb.is_finite() && ub.is_finite()) || ub <= lb {
            return Err(ShapeSpaceError::InvalidBounds { lb, ub });
        }
        let span = ub - lb;
        let last = n.saturating_sub(1) as f64;

        let indices = coords
            .iter()
            .map(|&t| {
                let index = ((t - lb) / span * last).round() as i64;
                if index < 0 || index as usize >= n {
                    Err(ShapeSpaceError::MeshOutsideBounds { coord: t, index, n })
                } else {
                    Ok(index as usize)
                }
            })
            .collect::<Result<Vec<usize>>>()?;

        debug!("Index map into {}-point grid: {:?}", n, indices);
        Ok(Self { n, indices })
    }

    /// Number of mesh points per axis.
    #[inline]
    pub fn res(&self) -> usize {
        self.indices.len()
    }

    /// Subsample an `n x n` grid at the mapped indices, flattened in node order.
    pub fn sample(&self, grid: &DenseMatrix<f64>) -> Result<Vec<f64>> {
        let (rows, cols) = grid.shape();
        if rows != self.n || cols != self.n {
            return Err(ShapeSpaceError::shape_mismatch(
                format!("{}x{} grid", self.n, self.n),
                format!("{}x{} grid", rows, cols),
            ));
        }

        let mut out = Vec::with_capacity(self.res() * self.res());
        for &r in &self.indices {
            for &c in &self.indices {
                out.push(*grid.get((r, c)));
            }
        }
        Ok(out)
    }
}
