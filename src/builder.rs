use std::sync::Arc;

use crate::core::{SpectralBasis, SpectralParams};
use crate::eigenmaps::{DenseSymmetricSolver, EigenSolver};
use crate::encoder::SpectralShapeEncoder;
use crate::errors::Result;

// Add logging
use log::{debug, info};

pub struct SpectralBasisBuilder {
    params: SpectralParams,
    solver: Box<dyn EigenSolver>,
}

impl Default for SpectralBasisBuilder {
    fn default() -> Self {
        debug!("Creating SpectralBasisBuilder with default parameters");
        Self {
            // n=64, res=16, k=25 over [0, 1] with sigma=1
            params: SpectralParams::default(),
            solver: Box::new(DenseSymmetricSolver),
        }
    }
}

impl SpectralBasisBuilder {
    pub fn new() -> Self {
        info!("Initializing new SpectralBasisBuilder");
        Self::default()
    }

    /// Resolution `n` of the square SDF grids that will be encoded.
    pub fn with_grid_size(mut self, n: usize) -> Self {
        self.params.n = n;
        self
    }

    /// Mesh points per axis; the graph has `res^2` nodes and the
    /// eigendecomposition costs `O(res^6)`.
    pub fn with_resolution(mut self, res: usize) -> Self {
        self.params.res = res;
        self
    }

    /// Number of eigenvectors kept, i.e. the length of every shape code.
    pub fn with_eigenvectors(mut self, k: usize) -> Self {
        self.params.k = k;
        self
    }

    /// Domain coordinates of the first and last grid row/column.
    pub fn with_bounds(mut self, lb: f64, ub: f64) -> Self {
        info!("Setting domain bounds: [{}, {}]", lb, ub);
        self.params.lb = lb;
        self.params.ub = ub;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.params.sigma = sigma;
        self
    }

    pub fn with_params(mut self, params: SpectralParams) -> Self {
        self.params = params;
        self
    }

    /// Swap the dense solver for another implementation of the same contract.
    pub fn with_solver(mut self, solver: Box<dyn EigenSolver>) -> Self {
        info!("Using {} eigensolver", solver.name());
        self.solver = solver;
        self
    }

    pub fn params(&self) -> &SpectralParams {
        &self.params
    }

    /// Validate the configuration and compute the basis. This is the only
    /// expensive step; build once and share the result.
    pub fn build(self) -> Result<SpectralBasis> {
        debug!("Build configuration: {:?}", self.params);
        SpectralBasis::new(self.params, self.solver.as_ref())
    }

    /// Build the basis and wrap it in an encoder.
    pub fn build_encoder(self) -> Result<SpectralShapeEncoder> {
        Ok(SpectralShapeEncoder::new(Arc::new(self.build()?)))
    }
}
