//! Per-geometry records and the one-shot encoding pass over a dataset.
//!
//! A [`GeometryRecord`] holds the raw arrays of one geometry and is never
//! mutated. Encoding produces a new [`EncodedGeometry`] that carries the shape
//! code (computed exactly once per geometry), the scaled field and the
//! two-channel grid input expected by the convolutional encoder.
//!
//! Train/validation splits take the random generator as an argument so that
//! repeated or parallel splits are reproducible without process-wide seeding.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::encoder::{ShapeCode, SpectralShapeEncoder};
use crate::errors::{Result, ShapeSpaceError};
use crate::interpolation::FeatureGrid;

/// Multiplier applied to SDF values fed to the models.
pub const SDF_SCALE: f64 = 10.0;
/// Default divisor applied to the target field.
pub const FIELD_SCALE: f64 = 10000.0;

/// Raw arrays of one geometry.
#[derive(Clone, Debug)]
pub struct GeometryRecord {
    /// Node coordinates
    pub coords: Vec<[f64; 2]>,
    /// Signed distance at each node
    pub node_sdf: Vec<f64>,
    /// Target scalar field at each node
    pub field: Vec<f64>,
    /// `n x n` SDF grid over the domain
    pub sdf: DenseMatrix<f64>,
}

/// Model-ready arrays of one geometry.
#[derive(Clone, Debug)]
pub struct EncodedGeometry {
    pub coords: Vec<[f64; 2]>,
    /// `node_sdf * SDF_SCALE`
    pub node_sdf: Vec<f64>,
    /// `field / field_scale`
    pub field: Vec<f64>,
    pub shape_code: ShapeCode,
    /// Channel 0: `sdf * SDF_SCALE`, channel 1: geometry mask `sdf > 0`
    pub grid: FeatureGrid,
}

impl GeometryRecord {
    pub fn new(
        coords: Vec<[f64; 2]>,
        node_sdf: Vec<f64>,
        field: Vec<f64>,
        sdf: DenseMatrix<f64>,
    ) -> Result<Self> {
        if node_sdf.len() != coords.len() || field.len() != coords.len() {
            return Err(ShapeSpaceError::shape_mismatch(
                format!("{} values per node array", coords.len()),
                format!("{} SDF values and {} field values", node_sdf.len(), field.len()),
            ));
        }
        Ok(Self { coords, node_sdf, field, sdf })
    }

    #[inline]
    pub fn nnodes(&self) -> usize {
        self.coords.len()
    }

    /// Two-channel grid input: scaled SDF and the inside mask.
    pub fn grid_input(&self) -> Result<FeatureGrid> {
        let (rows, cols) = self.sdf.shape();
        let mut grid = FeatureGrid::zeros(2, rows, cols)?;
        for r in 0..rows {
            for c in 0..cols {
                let d = *self.sdf.get((r, c));
                grid.set(0, r, c, d * SDF_SCALE);
                grid.set(1, r, c, if d > 0.0 { 1.0 } else { 0.0 });
            }
        }
        Ok(grid)
    }

    /// Build the encoded counterpart; the shape code is computed here and only here.
    pub fn encode(&self, encoder: &SpectralShapeEncoder, field_scale: f64) -> Result<EncodedGeometry> {
        let shape_code = encoder.encode(&self.sdf)?;
        Ok(EncodedGeometry {
            coords: self.coords.clone(),
            node_sdf: self.node_sdf.iter().map(|d| d * SDF_SCALE).collect(),
            field: self.field.iter().map(|v| v / field_scale).collect(),
            shape_code,
            grid: self.grid_input()?,
        })
    }
}

impl EncodedGeometry {
    #[inline]
    pub fn nnodes(&self) -> usize {
        self.coords.len()
    }

    /// Shape code repeated per node, `nnodes x k`.
    pub fn conditioning(&self) -> DenseMatrix<f64> {
        self.shape_code.tile(self.nnodes())
    }

    /// Node coordinates followed by the scaled node SDF, `nnodes x 3`.
    pub fn node_features(&self) -> DenseMatrix<f64> {
        DenseMatrix::from_iterator(
            self.coords
                .iter()
                .zip(self.node_sdf.iter())
                .flat_map(|(p, &d)| [p[0], p[1], d]),
            self.nnodes(),
            3,
            0,
        )
    }
}

/// Encode every record once, in parallel.
pub fn encode_dataset(
    records: &[GeometryRecord],
    encoder: &SpectralShapeEncoder,
    field_scale: f64,
) -> Result<Vec<EncodedGeometry>> {
    info!("Encoding {} geometries with k={}", records.len(), encoder.k());
    let encoded: Vec<EncodedGeometry> = records
        .par_iter()
        .map(|r| r.encode(encoder, field_scale))
        .collect::<Result<_>>()?;
    debug!("Dataset encoded");
    Ok(encoded)
}

/// Map physical coordinates in `[lb, ub]^2` to the unit square.
pub fn normalise_points(coords: &[[f64; 2]], lb: f64, ub: f64) -> Result<Vec<[f64; 2]>> {
    if !(lb.is_finite() && ub.is_finite()) || ub <= lb {
        return Err(ShapeSpaceError::InvalidBounds { lb, ub });
    }
    let span = ub - lb;
    Ok(coords
        .iter()
        .map(|p| [(p[0] - lb) / span, (p[1] - lb) / span])
        .collect())
}

/// Shuffle `0..len` with `rng` and split it at `floor(train_fraction * len)`.
pub fn split_indices<R: Rng + ?Sized>(
    len: usize,
    train_fraction: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(ShapeSpaceError::InvalidSplit(train_fraction));
    }
    let mut idxs: Vec<usize> = (0..len).collect();
    idxs.shuffle(rng);
    let cut = (train_fraction * len as f64).floor() as usize;
    let val = idxs.split_off(cut);
    debug!("Split {} items into {} train / {} validation", len, idxs.len(), val.len());
    Ok((idxs, val))
}
