use serde::{Deserialize, Serialize};

/// Numerical settings for model construction and particle generation.
///
/// Passed explicitly to whatever component needs it; there is no global
/// configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Random seed for deterministic particle realizations
    pub seed: u64,
    /// Number of points in the log-spaced radial grid
    pub num_points: usize,
    /// Number of energy grid points for the tabulated distribution function
    pub df_grid_size: usize,
    /// Per-particle rejection-sampling budget before giving up
    pub max_rejections: usize,
    /// Relative tolerance for adaptive quadrature
    pub quad_tol: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_points: 1000,
            df_grid_size: 1000,
            max_rejections: 10_000,
            quad_tol: 1.0e-8,
        }
    }
}
