//! Samplers: inverse-transform sampling of radii from a cumulative mass
//! profile, and acceptance-rejection sampling of speeds from f(E).

use crate::df::DistributionFunction;
use crate::numeric;
use crate::profiles;
use cluster_core::{ClusterError, ClusterResult};
use rand::Rng;
use std::f64::consts::TAU;

/// Draw `num` particle radii from the cumulative mass profile `mass`
/// tabulated on `radius`, optionally truncated at `r_max`. Returns the
/// radii and the total mass actually sampled; per-particle mass is the
/// caller's `mtot/num`, exactly.
pub fn sample_radii(
    radius: &[f64],
    mass: &[f64],
    num: usize,
    r_max: Option<f64>,
    rng: &mut impl Rng,
) -> ClusterResult<(Vec<f64>, f64)> {
    if radius.len() != mass.len() || radius.len() < 2 {
        return Err(ClusterError::Profile(
            "mass profile needs matching arrays of at least 2 points".to_string(),
        ));
    }
    profiles::check_mass_monotonic(mass)?;

    let ridx = match r_max {
        Some(r) => radius.partition_point(|&x| x <= r),
        None => radius.len(),
    };
    if ridx < 2 {
        return Err(ClusterError::Profile(format!(
            "r_max = {:?} lies below the tabulated radius grid",
            r_max
        )));
    }
    let mtot = mass[ridx - 1];

    // Cumulative distribution anchored at (0, 0) so the innermost bin is
    // sampled too.
    let mut cdf = Vec::with_capacity(ridx + 1);
    let mut rr = Vec::with_capacity(ridx + 1);
    cdf.push(0.0);
    rr.push(0.0);
    for i in 0..ridx {
        cdf.push(mass[i] / mtot);
        rr.push(radius[i]);
    }

    let radii = (0..num)
        .map(|_| numeric::interp(rng.gen_range(0.0..1.0), &cdf, &rr))
        .collect();
    Ok((radii, mtot))
}

/// Draw one speed at a radius where the relative potential is `psi`,
/// by acceptance-rejection on the speed density v^2 f(psi - v^2/2).
///
/// The proposal is uniform on [0, v_esc] with the envelope
/// v_esc^2 * sup f; the expected acceptance rate is well away from zero
/// for any equilibrium profile, but a retry budget guards against
/// pathological input.
pub fn sample_speed(
    psi: f64,
    radius: f64,
    df: &DistributionFunction,
    max_rejections: usize,
    rng: &mut impl Rng,
) -> ClusterResult<f64> {
    let v_esc = (2.0 * psi).sqrt();
    let bound = v_esc * v_esc * df.max_below(psi);
    if !(bound > 0.0) {
        return Err(ClusterError::Validity(format!(
            "distribution function vanishes below E = {psi:.6e}"
        )));
    }
    for _ in 0..max_rejections {
        let v = rng.gen_range(0.0..v_esc);
        let e = psi - 0.5 * v * v;
        if rng.gen_range(0.0..bound) <= v * v * df.eval_clamped(e) {
            return Ok(v);
        }
    }
    Err(ClusterError::SamplingTimeout {
        radius,
        budget: max_rejections,
    })
}

/// A uniformly random unit vector from cos(theta) in [-1, 1] and
/// phi in [0, 2 pi).
pub fn isotropic_direction(rng: &mut impl Rng) -> [f64; 3] {
    let cos_t: f64 = rng.gen_range(-1.0..1.0);
    let phi: f64 = rng.gen_range(0.0..TAU);
    let sin_t = (1.0 - cos_t * cos_t).sqrt();
    [sin_t * phi.cos(), sin_t * phi.sin(), cos_t]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyGrid;
    use cluster_core::GeneratorConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    fn uniform_sphere_table(big_r: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
        let radius: Vec<f64> = (1..=n).map(|i| big_r * i as f64 / n as f64).collect();
        let mass: Vec<f64> = radius.iter().map(|&r| r.powi(3)).collect();
        (radius, mass)
    }

    #[test]
    fn test_inverse_map_roundtrip() {
        // The tabulated inverse is the exact inverse of the tabulated
        // forward map, so M(r(u)) == u * M_tot up to float noise.
        let (radius, mass) = uniform_sphere_table(1.0, 100);
        let mtot = mass[mass.len() - 1];
        let mut cdf = vec![0.0];
        let mut rr = vec![0.0];
        for (m, r) in mass.iter().zip(&radius) {
            cdf.push(m / mtot);
            rr.push(*r);
        }
        for i in 0..=1000 {
            let u = i as f64 / 1000.0;
            let r = numeric::interp(u, &cdf, &rr);
            let back = numeric::interp(r, &rr, &cdf);
            assert!((back - u).abs() < 1e-12, "u = {u}, back = {back}");
        }
    }

    #[test]
    fn test_uniform_sphere_ks() {
        // Radii of a constant-density sphere follow u = (r/R)^3.
        let big_r = 1.0;
        let (radius, mass) = uniform_sphere_table(big_r, 1000);
        let mut rng = ChaCha8Rng::seed_from_u64(25);
        let n = 10_000;
        let (mut radii, mtot) = sample_radii(&radius, &mass, n, None, &mut rng).unwrap();
        assert!((mtot - 1.0).abs() < 1e-12);
        radii.sort_by(f64::total_cmp);
        let mut dmax = 0.0f64;
        for (i, &r) in radii.iter().enumerate() {
            let analytic = (r / big_r).powi(3);
            let empirical = (i + 1) as f64 / n as f64;
            dmax = dmax.max((empirical - analytic).abs());
        }
        // KS critical value at alpha = 0.1% for n = 1e4 is ~0.0195
        assert!(dmax < 0.025, "KS statistic {dmax}");
        assert!(radii.iter().all(|&r| (0.0..=big_r).contains(&r)));
    }

    #[test]
    fn test_sample_radii_respects_r_max() {
        let (radius, mass) = uniform_sphere_table(2.0, 200);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (radii, mtot) = sample_radii(&radius, &mass, 500, Some(1.0), &mut rng).unwrap();
        assert!(radii.iter().all(|&r| r <= 1.0 + 1e-12));
        assert!((mtot - 1.0).abs() < 1e-6, "mtot = {mtot}");
    }

    #[test]
    fn test_non_monotonic_mass_fails() {
        let radius = vec![1.0, 2.0, 3.0, 4.0];
        let mass = vec![1.0, 2.0, 2.0, 3.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            sample_radii(&radius, &mass, 10, None, &mut rng),
            Err(ClusterError::Profile(_))
        ));
    }

    fn plummer_df() -> (EnergyGrid, DistributionFunction) {
        let rr = numeric::log_grid(0.05, 100.0, 200);
        let phi: Vec<f64> = rr.iter().map(|&r| -1.0 / (r * r + 1.0).sqrt()).collect();
        let rho: Vec<f64> = rr
            .iter()
            .map(|&r| 3.0 / (4.0 * PI) * (1.0 + r * r).powf(-2.5))
            .collect();
        let grid = EnergyGrid::new(&rr, &phi).unwrap();
        let config = GeneratorConfig {
            df_grid_size: 200,
            quad_tol: 1e-8,
            ..GeneratorConfig::default()
        };
        let df = DistributionFunction::eddington(&grid, &rho, &config).unwrap();
        (grid, df)
    }

    #[test]
    fn test_speeds_are_bound() {
        let (grid, df) = plummer_df();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for &r in &[0.1, 0.5, 1.0, 5.0, 20.0] {
            let psi = grid.psi(r);
            let v_esc = (2.0 * psi).sqrt();
            for _ in 0..50 {
                let v = sample_speed(psi, r, &df, 10_000, &mut rng).unwrap();
                assert!(v >= 0.0 && v <= v_esc);
            }
        }
    }

    #[test]
    fn test_zero_budget_times_out() {
        let (grid, df) = plummer_df();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let psi = grid.psi(1.0);
        assert!(matches!(
            sample_speed(psi, 1.0, &df, 0, &mut rng),
            Err(ClusterError::SamplingTimeout { budget: 0, .. })
        ));
    }

    #[test]
    fn test_isotropic_direction_is_unit() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut mean = [0.0f64; 3];
        let n = 20_000;
        for _ in 0..n {
            let d = isotropic_direction(&mut rng);
            let norm = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
            for k in 0..3 {
                mean[k] += d[k];
            }
        }
        for k in 0..3 {
            assert!((mean[k] / n as f64).abs() < 0.02);
        }
    }
}
