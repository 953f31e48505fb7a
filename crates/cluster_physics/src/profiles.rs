//! The profile interface consumed by the model builder and the samplers.
//!
//! Density, mass, and potential profiles enter as callables of radius;
//! the catalog of analytic formulas lives with the caller.

use crate::numeric;
use cluster_core::{ClusterError, ClusterResult};

/// A real-valued function of radius in kpc.
pub trait RadialProfile {
    fn evaluate(&self, r: f64) -> f64;
}

impl<F: Fn(f64) -> f64> RadialProfile for F {
    fn evaluate(&self, r: f64) -> f64 {
        self(r)
    }
}

/// A profile backed by a sampled table, linearly interpolated and clamped
/// outside its radius range.
#[derive(Debug, Clone)]
pub struct InterpolatedProfile {
    radius: Vec<f64>,
    value: Vec<f64>,
}

impl InterpolatedProfile {
    pub fn new(radius: Vec<f64>, value: Vec<f64>) -> ClusterResult<Self> {
        if radius.len() != value.len() || radius.len() < 2 {
            return Err(ClusterError::Profile(format!(
                "tabulated profile needs matching arrays of at least 2 points, \
                 got {} and {}",
                radius.len(),
                value.len()
            )));
        }
        if !radius.windows(2).all(|w| w[0] < w[1]) {
            return Err(ClusterError::Profile(
                "tabulated profile radii must be strictly increasing".to_string(),
            ));
        }
        if radius[0] <= 0.0 {
            return Err(ClusterError::Profile(
                "tabulated profile radii must be positive".to_string(),
            ));
        }
        Ok(Self { radius, value })
    }

    pub fn from_fn(profile: &dyn RadialProfile, radius: Vec<f64>) -> ClusterResult<Self> {
        let value = radius.iter().map(|&r| profile.evaluate(r)).collect();
        Self::new(radius, value)
    }
}

impl RadialProfile for InterpolatedProfile {
    fn evaluate(&self, r: f64) -> f64 {
        numeric::interp(r, &self.radius, &self.value)
    }
}

/// Cumulative mass of a density profile at each grid radius:
/// M(r) = 4π ∫₀^r ρ(r') r'² dr'.
///
/// The density may diverge at the origin (Hernquist/NFW cusps); for any
/// profile with finite mass ρr² tends to zero there, so the r = 0
/// endpoint of the first panel takes its limit instead of an
/// evaluation.
pub fn integrate_mass(density: &dyn RadialProfile, rr: &[f64], tol: f64) -> Vec<f64> {
    let integrand = |r: f64| {
        if r == 0.0 {
            return 0.0;
        }
        density.evaluate(r) * r * r
    };
    let mut mass = Vec::with_capacity(rr.len());
    let mut acc = 4.0 * std::f64::consts::PI * numeric::quad(&integrand, 0.0, rr[0], tol);
    mass.push(acc);
    for i in 1..rr.len() {
        acc += 4.0 * std::f64::consts::PI * numeric::quad(&integrand, rr[i - 1], rr[i], tol);
        mass.push(acc);
    }
    mass
}

/// Check that a cumulative mass array is finite and strictly
/// increasing; anything else means the density went non-positive, the
/// integration hit a pole, or the table is corrupt. NaN compares false
/// against everything, so finiteness is checked first.
pub fn check_mass_monotonic(mass: &[f64]) -> ClusterResult<()> {
    if let Some(i) = mass.iter().position(|m| !m.is_finite()) {
        return Err(ClusterError::Profile(format!(
            "cumulative mass is not finite at index {i}"
        )));
    }
    if let Some(i) = mass.windows(2).position(|w| w[1] <= w[0]) {
        return Err(ClusterError::Profile(format!(
            "cumulative mass is not strictly increasing at index {i} \
             ({} -> {})",
            mass[i],
            mass[i + 1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_uniform_sphere_mass() {
        let rho0 = 2.5;
        let big_r = 10.0;
        let density = move |r: f64| if r <= big_r { rho0 } else { 0.0 };
        let rr = numeric::log_grid(0.1, big_r, 100);
        let mass = integrate_mass(&density, &rr, 1e-10);
        for (i, &r) in rr.iter().enumerate() {
            let expected = 4.0 / 3.0 * PI * r.powi(3) * rho0;
            assert!(
                (mass[i] - expected).abs() / expected < 1e-6,
                "r = {r}: {} vs {expected}",
                mass[i]
            );
        }
        check_mass_monotonic(&mass).unwrap();
    }

    #[test]
    fn test_cuspy_density_mass_is_finite() {
        // Hernquist rho diverges as 1/r at the origin but encloses
        // finite mass M r^2/(r+a)^2.
        let (m, a) = (1.0e14, 600.0);
        let density = move |r: f64| m * a / (2.0 * PI * r * (r + a).powi(3));
        let rr = numeric::log_grid(1.0, 10_000.0, 100);
        let mass = integrate_mass(&density, &rr, 1e-9);
        check_mass_monotonic(&mass).unwrap();
        for (i, &r) in rr.iter().enumerate() {
            let expected = m * r * r / ((r + a) * (r + a));
            assert!(mass[i].is_finite());
            assert!(
                (mass[i] - expected).abs() / expected < 1e-4,
                "r = {r}: {} vs {expected}",
                mass[i]
            );
        }
    }

    #[test]
    fn test_monotonic_check_rejects_non_finite() {
        assert!(matches!(
            check_mass_monotonic(&[1.0, f64::NAN, 3.0]),
            Err(ClusterError::Profile(_))
        ));
        assert!(matches!(
            check_mass_monotonic(&[1.0, f64::INFINITY]),
            Err(ClusterError::Profile(_))
        ));
    }

    #[test]
    fn test_monotonic_check_rejects_flat() {
        let mass = [1.0, 2.0, 2.0, 3.0];
        assert!(matches!(
            check_mass_monotonic(&mass),
            Err(ClusterError::Profile(_))
        ));
    }

    #[test]
    fn test_interpolated_profile_rejects_unsorted() {
        assert!(InterpolatedProfile::new(vec![1.0, 0.5, 2.0], vec![0.0; 3]).is_err());
        assert!(InterpolatedProfile::new(vec![0.0, 1.0], vec![0.0; 2]).is_err());
    }

    #[test]
    fn test_interpolated_profile_roundtrip() {
        let rr = numeric::log_grid(0.1, 100.0, 200);
        let f = |r: f64| 1.0 / (r * (1.0 + r) * (1.0 + r));
        let p = InterpolatedProfile::from_fn(&f, rr.clone()).unwrap();
        for &r in &rr {
            assert!((p.evaluate(r) - f(r)).abs() < 1e-12);
        }
    }
}
