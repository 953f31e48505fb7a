//! Relative-potential grid: the change of variable from radius to
//! Psi(r) = -Phi(r) needed by the Eddington inversion.

use crate::numeric;
use cluster_core::{ClusterError, ClusterResult};

/// Tabulated Psi(r) with its inverse r(Psi).
///
/// Psi is positive and strictly decreasing in radius for any bound
/// spherical system, which makes the inverse well defined.
#[derive(Debug, Clone)]
pub struct EnergyGrid {
    radius: Vec<f64>,
    psi: Vec<f64>,
}

impl EnergyGrid {
    /// Build from a radius grid and the (negative) potential on it.
    pub fn new(radius: &[f64], potential: &[f64]) -> ClusterResult<Self> {
        if radius.len() != potential.len() || radius.len() < 3 {
            return Err(ClusterError::Profile(
                "potential grid needs at least 3 matching points".to_string(),
            ));
        }
        let psi: Vec<f64> = potential.iter().map(|&p| -p).collect();
        if psi.iter().any(|&p| !(p > 0.0) || !p.is_finite()) {
            return Err(ClusterError::Profile(
                "relative potential must be positive and finite".to_string(),
            ));
        }
        if !psi.windows(2).all(|w| w[0] > w[1]) {
            return Err(ClusterError::Profile(
                "relative potential must be strictly decreasing in radius".to_string(),
            ));
        }
        Ok(Self {
            radius: radius.to_vec(),
            psi,
        })
    }

    /// Psi at radius `r`, clamped to the grid.
    pub fn psi(&self, r: f64) -> f64 {
        numeric::interp(r, &self.radius, &self.psi)
    }

    /// Radius at which Psi takes the given value, clamped to the grid.
    pub fn radius_of_psi(&self, psi: f64) -> f64 {
        // psi decreases with r; interp wants ascending abscissae
        let rev_psi: Vec<f64> = self.psi.iter().rev().copied().collect();
        let rev_r: Vec<f64> = self.radius.iter().rev().copied().collect();
        numeric::interp(psi, &rev_psi, &rev_r)
    }

    /// Largest tabulated Psi (at the innermost radius).
    pub fn psi_max(&self) -> f64 {
        self.psi[0]
    }

    /// Smallest tabulated Psi (at the outermost radius).
    pub fn psi_min(&self) -> f64 {
        self.psi[self.psi.len() - 1]
    }

    pub fn radius_grid(&self) -> &[f64] {
        &self.radius
    }

    pub fn psi_grid(&self) -> &[f64] {
        &self.psi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_mass_grid() -> EnergyGrid {
        let rr = numeric::log_grid(1.0, 1000.0, 200);
        let phi: Vec<f64> = rr.iter().map(|&r| -1.0 / r).collect();
        EnergyGrid::new(&rr, &phi).unwrap()
    }

    #[test]
    fn test_psi_inverse_roundtrip() {
        let grid = point_mass_grid();
        for &r in &[1.5, 10.0, 250.0, 900.0] {
            let psi = grid.psi(r);
            let back = grid.radius_of_psi(psi);
            assert!((back - r).abs() / r < 1e-3, "r = {r}, back = {back}");
        }
    }

    #[test]
    fn test_psi_bounds() {
        let grid = point_mass_grid();
        assert!(grid.psi_max() > grid.psi_min());
        assert!((grid.psi_max() - 1.0).abs() < 1e-12);
        assert!((grid.psi_min() - 1.0e-3).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_positive_potential() {
        let rr = numeric::log_grid(1.0, 100.0, 50);
        let phi: Vec<f64> = rr.iter().map(|&r| 1.0 / r).collect();
        assert!(matches!(
            EnergyGrid::new(&rr, &phi),
            Err(ClusterError::Profile(_))
        ));
    }

    #[test]
    fn test_rejects_non_monotonic() {
        let rr = numeric::log_grid(1.0, 100.0, 50);
        let phi: Vec<f64> = rr.iter().map(|&r| -((r - 50.0).abs() + 1.0)).collect();
        assert!(matches!(
            EnergyGrid::new(&rr, &phi),
            Err(ClusterError::Profile(_))
        ));
    }
}
