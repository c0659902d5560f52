use std::fmt;

use crate::errors::{Result, ShapeSpaceError};
use crate::sampling::UnitMesh;

use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Parameters of the Gaussian kernel graph over mesh nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GraphParams {
    /// Kernel bandwidth: `w_ij = exp(-|p_i - p_j|^2 / sigma^2)`
    pub sigma: f64,
    /// Keep the `i == j` pair (weight 1) in the adjacency and the degree
    pub self_loops: bool,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self { sigma: 1.0, self_loops: true }
    }
}

// Custom PartialEq implementation using approximate equality for floats
impl PartialEq for GraphParams {
    fn eq(&self, other: &Self) -> bool {
        approx::relative_eq!(self.sigma, other.sigma) && self.self_loops == other.self_loops
    }
}

impl GraphParams {
    pub fn validate(&self) -> Result<()> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(ShapeSpaceError::InvalidBandwidth(self.sigma));
        }
        Ok(())
    }
}

/// Graph Laplacian
#[derive(Debug, Clone)]
pub struct GraphLaplacian {
    // dense normalised symmetric Laplacian L = I - D^-1/2 W D^-1/2
    pub matrix: DenseMatrix<f64>,
    pub nnodes: usize,
    pub graph_params: GraphParams,
}

impl GraphLaplacian {
    /// Largest absolute asymmetry `|L_ij - L_ji|`.
    pub fn asymmetry(&self) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..self.nnodes {
            for j in (i + 1)..self.nnodes {
                let d = (self.matrix.get((i, j)) - self.matrix.get((j, i))).abs();
                worst = worst.max(d);
            }
        }
        worst
    }
}

impl fmt::Display for GraphLaplacian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, c) = self.matrix.shape();
        write!(
            f,
            "GraphLaplacian({}x{}, nodes={}, sigma={}, self_loops={})",
            r, c, self.nnodes, self.graph_params.sigma, self.graph_params.self_loops
        )
    }
}

/// Graph factory: the only graph the basis needs is the kernel graph over a
/// regular mesh. The graph itself is never kept; only its Laplacian is.
pub struct GraphFactory;

impl GraphFactory {
    /// Build the normalised symmetric Laplacian of the Gaussian kernel graph
    /// over every node of `mesh`.
    pub fn build_mesh_laplacian(mesh: &UnitMesh, params: &GraphParams) -> Result<GraphLaplacian> {
        params.validate()?;
        info!("Building mesh Laplacian for {}x{} mesh", mesh.res, mesh.res);
        debug!("Graph parameters: {:?}", params);

        let gl = crate::laplacian::build_normalised_laplacian(&mesh.points(), params);

        info!("Laplacian built: {}", gl);
        Ok(gl)
    }
}
