//! Eddington inversion: recover the isotropic distribution function
//! f(E) from a density-potential pair, and integrate it back to density
//! as a self-consistency check.

use crate::energy::EnergyGrid;
use crate::numeric;
use cluster_core::{ClusterError, ClusterResult, GeneratorConfig};
use log::info;
use std::f64::consts::PI;

/// Result of the virial self-consistency check, aligned to the model's
/// radius grid.
#[derive(Debug, Clone)]
pub struct VirialCheck {
    /// Density reconstructed by integrating f(E) over velocity space
    pub reconstructed: Vec<f64>,
    /// (reconstructed - input)/input per grid point
    pub relative: Vec<f64>,
}

/// The isotropic distribution function f(E), tabulated once over the full
/// range of relative energies and interpolated for queries.
///
/// The table is immutable; a changed density or potential profile means
/// building a new `DistributionFunction`.
#[derive(Debug, Clone)]
pub struct DistributionFunction {
    energy: Vec<f64>,
    f: Vec<f64>,
}

impl DistributionFunction {
    /// Invert the Eddington integral
    ///
    ///   f(E) = 1/(sqrt(8) pi^2) [ int_0^E rho''(Psi) dPsi/sqrt(E - Psi)
    ///                             + rho'(Psi)|_0 / sqrt(E) ]
    ///
    /// for a species with density `density` tabulated on the radius grid
    /// of `grid`. The substitution t^2 = E - Psi removes the integrable
    /// singularity at the upper limit; rho''(Psi) comes from central
    /// differences of the tabulated rho(Psi).
    pub fn eddington(
        grid: &EnergyGrid,
        density: &[f64],
        config: &GeneratorConfig,
    ) -> ClusterResult<Self> {
        let psi = grid.psi_grid();
        if density.len() != psi.len() {
            return Err(ClusterError::Profile(format!(
                "density has {} points, potential grid has {}",
                density.len(),
                psi.len()
            )));
        }

        // Reverse to ascending Psi; rho becomes a function of Psi.
        let ee_native: Vec<f64> = psi.iter().rev().copied().collect();
        let rho_native: Vec<f64> = density.iter().rev().copied().collect();
        // A density that falls with Psi (rises with radius) makes the
        // inversion integrand negative regardless of how the truncated
        // grid resolves it, so reject it up front.
        if let Some(i) = rho_native.windows(2).position(|w| w[1] < w[0]) {
            return Err(ClusterError::Validity(format!(
                "density decreases with the relative potential near Psi = {:.6e}; \
                 no nonnegative distribution function reproduces it",
                ee_native[i]
            )));
        }
        let d2rho = numeric::second_derivative(&ee_native, &rho_native);
        // rho'(Psi) as Psi -> 0, approximated at the smallest tabulated Psi
        let slope0 = (rho_native[1] - rho_native[0]) / (ee_native[1] - ee_native[0]);

        info!("Computing the distribution function on {} energies.", config.df_grid_size);
        let energy: Vec<f64> = if config.df_grid_size == ee_native.len() {
            ee_native.clone()
        } else {
            numeric::log_grid(grid.psi_min(), grid.psi_max(), config.df_grid_size)
        };

        let d2_of_psi = |p: f64| numeric::interp(p, &ee_native, &d2rho);
        let norm = 1.0 / (8.0f64.sqrt() * PI * PI);
        let mut f = Vec::with_capacity(energy.len());
        for &e in &energy {
            let integrand = |t: f64| 2.0 * d2_of_psi(e - t * t);
            let integral = numeric::quad(&integrand, 0.0, e.sqrt(), config.quad_tol);
            f.push(norm * (integral + slope0 / e.sqrt()));
        }

        if f.iter().any(|v| !v.is_finite()) {
            return Err(ClusterError::Validity(
                "distribution function is not finite".to_string(),
            ));
        }
        if let Some(i) = f.iter().position(|&v| v < 0.0) {
            return Err(ClusterError::Validity(format!(
                "distribution function is negative at E = {:.6e}; \
                 the density profile is not monotonic in the potential",
                energy[i]
            )));
        }

        Ok(Self { energy, f })
    }

    /// f at relative energy `e`; energies outside the tabulated range are
    /// a domain error.
    pub fn evaluate(&self, e: f64) -> ClusterResult<f64> {
        let (min, max) = (self.energy[0], self.energy[self.energy.len() - 1]);
        if e < min || e > max {
            return Err(ClusterError::Domain {
                value: e,
                min,
                max,
            });
        }
        Ok(numeric::interp(e, &self.energy, &self.f))
    }

    /// f clamped to the table; used inside integrals where E may dip
    /// below the tabulated minimum by construction.
    pub(crate) fn eval_clamped(&self, e: f64) -> f64 {
        numeric::interp(e, &self.energy, &self.f)
    }

    /// Supremum of the tabulated f over [0, e_max].
    pub fn max_below(&self, e_max: f64) -> f64 {
        let cut = self.energy.partition_point(|&e| e <= e_max);
        let mut sup = self.eval_clamped(e_max);
        for &v in &self.f[..cut] {
            sup = sup.max(v);
        }
        sup
    }

    pub fn energies(&self) -> &[f64] {
        &self.energy
    }

    /// Integrate f back to a density profile,
    ///
    ///   rho_chk(r) = 4 pi int_0^sqrt(2 Psi) f(Psi - t^2/2) t^2 dt,
    ///
    /// and compare with the input density. Agreement degrades toward
    /// r_max where the tabulated energy range is truncated; that is
    /// expected, not a failure.
    pub fn check_virial(
        &self,
        grid: &EnergyGrid,
        density: &[f64],
        config: &GeneratorConfig,
    ) -> VirialCheck {
        let psi = grid.psi_grid();
        let mut reconstructed = Vec::with_capacity(psi.len());
        let mut relative = Vec::with_capacity(psi.len());
        for (i, &p) in psi.iter().enumerate() {
            let integrand = |t: f64| self.eval_clamped(p - 0.5 * t * t) * t * t;
            let rho = 4.0 * PI * numeric::quad(&integrand, 0.0, (2.0 * p).sqrt(), config.quad_tol);
            reconstructed.push(rho);
            relative.push((rho - density[i]) / density[i]);
        }
        VirialCheck {
            reconstructed,
            relative,
        }
    }
}
