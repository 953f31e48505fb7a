//! Equilibrium cluster model: per-species density/mass profiles and the
//! gravitational potential, tabulated on a log-spaced radius grid.

use crate::numeric;
use crate::profiles::{self, RadialProfile};
use cluster_core::constants::{G, KEV, MP, MU, PRESSURE_TO_CGS};
use cluster_core::{ClusterError, ClusterResult, GeneratorConfig, Species};
use log::{info, warn};
use std::f64::consts::PI;

/// Density and cumulative mass arrays for one collisionless species.
#[derive(Debug, Clone)]
pub struct SpeciesProfiles {
    /// Msun/kpc^3
    pub density: Vec<f64>,
    /// Msun, enclosed within each grid radius
    pub mass: Vec<f64>,
}

/// Gas profiles, with the thermodynamic state from hydrostatic
/// equilibrium.
#[derive(Debug, Clone)]
pub struct GasProfiles {
    /// Msun/kpc^3
    pub density: Vec<f64>,
    /// Msun
    pub mass: Vec<f64>,
    /// Msun/(kpc*Myr^2)
    pub pressure: Vec<f64>,
    /// kT in keV
    pub temperature: Vec<f64>,
    /// Specific thermal energy 1.5 P/rho, kpc^2/Myr^2
    pub thermal_energy: Vec<f64>,
    /// gauss, present once `set_magnetic_field_from_beta` has run
    pub magnetic_field: Option<Vec<f64>>,
}

/// A spherically symmetric equilibrium model of a galaxy cluster.
///
/// Built once from profile callables; all arrays share the radius grid.
#[derive(Debug, Clone)]
pub struct ClusterModel {
    /// kpc, log-spaced, strictly increasing, radius[0] > 0
    pub radius: Vec<f64>,
    /// Msun/kpc^3
    pub total_density: Vec<f64>,
    /// Msun
    pub total_mass: Vec<f64>,
    /// Gravitational potential, kpc^2/Myr^2 (negative)
    pub potential: Vec<f64>,
    pub gas: Option<GasProfiles>,
    pub dm: SpeciesProfiles,
    pub star: Option<SpeciesProfiles>,
}

impl ClusterModel {
    /// Build a model from a gas density profile and a total density
    /// profile, deriving the gas pressure from hydrostatic equilibrium.
    pub fn from_dens_and_tden(
        rmin: f64,
        rmax: f64,
        gas_density: &dyn RadialProfile,
        total_density: &dyn RadialProfile,
        stellar_density: Option<&dyn RadialProfile>,
        config: &GeneratorConfig,
    ) -> ClusterResult<Self> {
        Self::from_scratch(
            rmin,
            rmax,
            Some(gas_density),
            total_density,
            stellar_density,
            config,
        )
    }

    /// Build a model from gas density and temperature profiles, with the
    /// total mass recovered from hydrostatic equilibrium:
    /// M(r) = -r^2 (dP/dr) / (G rho_g).
    ///
    /// The temperature profile is kT in keV.
    pub fn from_dens_and_temp(
        rmin: f64,
        rmax: f64,
        gas_density: &dyn RadialProfile,
        temperature: &dyn RadialProfile,
        stellar_density: Option<&dyn RadialProfile>,
        config: &GeneratorConfig,
    ) -> ClusterResult<Self> {
        if !(rmin > 0.0 && rmax > rmin) {
            return Err(ClusterError::Profile(format!(
                "radius domain must satisfy 0 < rmin < rmax, got [{rmin}, {rmax}]"
            )));
        }
        let rr = numeric::log_grid(rmin, rmax, config.num_points);

        let density: Vec<f64> = rr.iter().map(|&r| gas_density.evaluate(r)).collect();
        let temp: Vec<f64> = rr.iter().map(|&r| temperature.evaluate(r)).collect();
        if temp.iter().any(|&t| !(t > 0.0)) {
            return Err(ClusterError::Validity(
                "gas temperature is not positive everywhere".to_string(),
            ));
        }

        info!("Computing the total mass profile from hydrostatic equilibrium.");
        let pressure: Vec<f64> = density
            .iter()
            .zip(&temp)
            .map(|(&d, &t)| d * t * KEV / (MU * MP))
            .collect();
        let dpdr = numeric::derivative(&rr, &pressure);
        let tmass: Vec<f64> = (0..rr.len())
            .map(|i| -rr[i] * rr[i] * dpdr[i] / (G * density[i]))
            .collect();
        profiles::check_mass_monotonic(&tmass)?;
        let dmdr = numeric::derivative(&rr, &tmass);
        let tdens: Vec<f64> = rr
            .iter()
            .zip(&dmdr)
            .map(|(&r, &dm)| dm / (4.0 * PI * r * r))
            .collect();

        let potential = Self::potential_profile(&rr, &tdens, &tmass);

        info!("Integrating gas mass profile.");
        let mass = profiles::integrate_mass(gas_density, &rr, config.quad_tol);
        let thermal_energy: Vec<f64> = pressure
            .iter()
            .zip(&density)
            .map(|(&p, &d)| 1.5 * p / d)
            .collect();
        let gas = Some(GasProfiles {
            density,
            mass,
            pressure,
            temperature: temp,
            thermal_energy,
            magnetic_field: None,
        });

        let star = Self::stellar_profiles(&rr, stellar_density, config);
        let dm = Self::dm_residual(&rr, &tdens, &tmass, gas.as_ref(), star.as_ref())?;

        Ok(Self {
            radius: rr,
            total_density: tdens,
            total_mass: tmass,
            potential,
            gas,
            dm,
            star,
        })
    }

    /// Build a gas-free model from a total density profile.
    pub fn no_gas(
        rmin: f64,
        rmax: f64,
        total_density: &dyn RadialProfile,
        stellar_density: Option<&dyn RadialProfile>,
        config: &GeneratorConfig,
    ) -> ClusterResult<Self> {
        Self::from_scratch(rmin, rmax, None, total_density, stellar_density, config)
    }

    fn from_scratch(
        rmin: f64,
        rmax: f64,
        gas_density: Option<&dyn RadialProfile>,
        total_density: &dyn RadialProfile,
        stellar_density: Option<&dyn RadialProfile>,
        config: &GeneratorConfig,
    ) -> ClusterResult<Self> {
        if !(rmin > 0.0 && rmax > rmin) {
            return Err(ClusterError::Profile(format!(
                "radius domain must satisfy 0 < rmin < rmax, got [{rmin}, {rmax}]"
            )));
        }
        let rr = numeric::log_grid(rmin, rmax, config.num_points);

        info!("Integrating total mass profile.");
        let tdens: Vec<f64> = rr.iter().map(|&r| total_density.evaluate(r)).collect();
        let tmass = profiles::integrate_mass(total_density, &rr, config.quad_tol);
        profiles::check_mass_monotonic(&tmass)?;

        info!("Integrating gravitational potential profile.");
        let potential = Self::potential_profile(&rr, &tdens, &tmass);

        let gas = match gas_density {
            Some(profile) => Some(Self::gas_profiles(&rr, profile, &tmass, config)?),
            None => None,
        };
        let star = Self::stellar_profiles(&rr, stellar_density, config);
        let dm = Self::dm_residual(&rr, &tdens, &tmass, gas.as_ref(), star.as_ref())?;

        Ok(Self {
            radius: rr,
            total_density: tdens,
            total_mass: tmass,
            potential,
            gas,
            dm,
            star,
        })
    }

    // Phi(r) = -G [ M(r)/r + 4 pi int_r^rmax rho_t(r') r' dr' ]
    fn potential_profile(rr: &[f64], tdens: &[f64], tmass: &[f64]) -> Vec<f64> {
        let rho_r: Vec<f64> = rr.iter().zip(tdens).map(|(&r, &d)| d * r).collect();
        let outer = numeric::reverse_cumtrapz(rr, &rho_r);
        (0..rr.len())
            .map(|i| -G * (tmass[i] / rr[i] + 4.0 * PI * outer[i]))
            .collect()
    }

    fn stellar_profiles(
        rr: &[f64],
        stellar_density: Option<&dyn RadialProfile>,
        config: &GeneratorConfig,
    ) -> Option<SpeciesProfiles> {
        stellar_density.map(|profile| {
            info!("Integrating stellar mass profile.");
            let density: Vec<f64> = rr.iter().map(|&r| profile.evaluate(r)).collect();
            let mass = profiles::integrate_mass(profile, rr, config.quad_tol);
            SpeciesProfiles { density, mass }
        })
    }

    /// Dark matter is the residual of total minus gas and stars.
    fn dm_residual(
        rr: &[f64],
        tdens: &[f64],
        tmass: &[f64],
        gas: Option<&GasProfiles>,
        star: Option<&SpeciesProfiles>,
    ) -> ClusterResult<SpeciesProfiles> {
        let mut ddm = tdens.to_vec();
        let mut mdm = tmass.to_vec();
        if let Some(g) = gas {
            for i in 0..rr.len() {
                ddm[i] -= g.density[i];
                mdm[i] -= g.mass[i];
            }
        }
        if let Some(s) = star {
            for i in 0..rr.len() {
                ddm[i] -= s.density[i];
                mdm[i] -= s.mass[i];
            }
        }
        let mut clipped = 0usize;
        let mut running_max = 0.0f64;
        for i in 0..rr.len() {
            if ddm[i] < 0.0 {
                ddm[i] = 0.0;
                mdm[i] = running_max;
                clipped += 1;
            }
            running_max = running_max.max(mdm[i]);
        }
        if clipped > 0 {
            warn!("Clipped {clipped} grid points with negative dark matter density.");
        }
        if mdm[rr.len() - 1] <= 0.0 {
            return Err(ClusterError::Validity(
                "total dark matter mass is zero or negative".to_string(),
            ));
        }
        Ok(SpeciesProfiles {
            density: ddm,
            mass: mdm,
        })
    }

    fn gas_profiles(
        rr: &[f64],
        profile: &dyn RadialProfile,
        total_mass: &[f64],
        config: &GeneratorConfig,
    ) -> ClusterResult<GasProfiles> {
        info!("Integrating gas mass profile.");
        let density: Vec<f64> = rr.iter().map(|&r| profile.evaluate(r)).collect();
        let mass = profiles::integrate_mass(profile, rr, config.quad_tol);

        info!("Integrating pressure profile.");
        let n = rr.len();
        let grav: Vec<f64> = (0..n).map(|i| -G * total_mass[i] / (rr[i] * rr[i])).collect();
        // dP/dr = rho_g * g, so P(r) = -int_r^rmax rho_g g dr' plus the
        // contribution beyond the grid assuming g falls off as r^-2.
        let dpdr: Vec<f64> = density.iter().zip(&grav).map(|(&d, &g)| d * g).collect();
        let inner = numeric::reverse_cumtrapz(rr, &dpdr);
        let r_n = rr[n - 1];
        let g_n = grav[n - 1];
        // int_rmax^inf rho(r) g_n (r_n/r)^2 dr with u = r_n/r
        let tail = |u: f64| profile.evaluate(r_n / u);
        let outer = -g_n * r_n * numeric::quad(&tail, 1.0e-6, 1.0, config.quad_tol);
        let pressure: Vec<f64> = inner.iter().map(|&p| -p + outer).collect();
        if pressure.iter().any(|&p| !(p > 0.0)) {
            return Err(ClusterError::Validity(
                "hydrostatic pressure is not positive everywhere".to_string(),
            ));
        }

        let temperature: Vec<f64> = pressure
            .iter()
            .zip(&density)
            .map(|(&p, &d)| p * MU * MP / (d * KEV))
            .collect();
        let thermal_energy: Vec<f64> = pressure
            .iter()
            .zip(&density)
            .map(|(&p, &d)| 1.5 * p / d)
            .collect();

        Ok(GasProfiles {
            density,
            mass,
            pressure,
            temperature,
            thermal_energy,
            magnetic_field: None,
        })
    }

    pub fn rmin(&self) -> f64 {
        self.radius[0]
    }

    pub fn rmax(&self) -> f64 {
        self.radius[self.radius.len() - 1]
    }

    /// Cumulative mass array for a species.
    pub fn mass_profile(&self, species: Species) -> ClusterResult<&[f64]> {
        match species {
            Species::Gas => self
                .gas
                .as_ref()
                .map(|g| g.mass.as_slice())
                .ok_or(ClusterError::EmptySpecies(Species::Gas)),
            Species::Dm => Ok(&self.dm.mass),
            Species::Star => self
                .star
                .as_ref()
                .map(|s| s.mass.as_slice())
                .ok_or(ClusterError::EmptySpecies(Species::Star)),
            Species::Bh => Err(ClusterError::EmptySpecies(Species::Bh)),
        }
    }

    /// Density array for a species.
    pub fn density_profile(&self, species: Species) -> ClusterResult<&[f64]> {
        match species {
            Species::Gas => self
                .gas
                .as_ref()
                .map(|g| g.density.as_slice())
                .ok_or(ClusterError::EmptySpecies(Species::Gas)),
            Species::Dm => Ok(&self.dm.density),
            Species::Star => self
                .star
                .as_ref()
                .map(|s| s.density.as_slice())
                .ok_or(ClusterError::EmptySpecies(Species::Star)),
            Species::Bh => Err(ClusterError::EmptySpecies(Species::Bh)),
        }
    }

    /// Set a magnetic field profile from a plasma beta, beta = p_th/p_B.
    /// `gaussian` selects p_B = B^2/8pi instead of Lorentz-Heaviside
    /// p_B = B^2/2.
    pub fn set_magnetic_field_from_beta(
        &mut self,
        beta: f64,
        gaussian: bool,
    ) -> ClusterResult<()> {
        let gas = self
            .gas
            .as_mut()
            .ok_or(ClusterError::EmptySpecies(Species::Gas))?;
        let factor = if gaussian { 8.0 * PI } else { 2.0 };
        let field: Vec<f64> = gas
            .pressure
            .iter()
            .map(|&p| (factor * p * PRESSURE_TO_CGS / beta).sqrt())
            .collect();
        gas.magnetic_field = Some(field);
        Ok(())
    }

    /// Relative deviation of the gas from hydrostatic equilibrium,
    /// (dP/dr - rho g)/(rho g), per grid point.
    pub fn check_hydrostatic(&self) -> ClusterResult<Vec<f64>> {
        let gas = self
            .gas
            .as_ref()
            .ok_or(ClusterError::EmptySpecies(Species::Gas))?;
        let dpdr = numeric::derivative(&self.radius, &gas.pressure);
        let chk: Vec<f64> = (0..self.radius.len())
            .map(|i| {
                let r = self.radius[i];
                let rho_g = gas.density[i] * (-G * self.total_mass[i] / (r * r));
                (dpdr[i] - rho_g) / rho_g
            })
            .collect();
        let max_dev = chk.iter().fold(0.0f64, |m, &x| m.max(x.abs()));
        info!("Maximum relative deviation from hydrostatic equilibrium: {max_dev:.3e}");
        Ok(chk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hernquist_density(m: f64, a: f64) -> impl Fn(f64) -> f64 {
        move |r: f64| m * a / (2.0 * PI * r * (r + a).powi(3))
    }

    fn test_config() -> GeneratorConfig {
        GeneratorConfig {
            num_points: 300,
            quad_tol: 1e-9,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_total_mass_matches_hernquist() {
        let (m, a) = (1.0e14, 600.0);
        let model = ClusterModel::no_gas(1.0, 20_000.0, &hernquist_density(m, a), None, &test_config())
            .unwrap();
        for (i, &r) in model.radius.iter().enumerate().step_by(40) {
            let expected = m * r * r / ((r + a) * (r + a));
            let rel = (model.total_mass[i] - expected).abs() / expected;
            assert!(rel < 1e-3, "r = {r}: rel = {rel}");
        }
    }

    #[test]
    fn test_potential_matches_hernquist() {
        let (m, a) = (1.0e14, 600.0);
        let model = ClusterModel::no_gas(1.0, 60_000.0, &hernquist_density(m, a), None, &test_config())
            .unwrap();
        for (i, &r) in model.radius.iter().enumerate().step_by(40) {
            if r > model.rmax() / 4.0 {
                continue; // truncation affects the outermost decades
            }
            let expected = -G * m / (r + a);
            let rel = (model.potential[i] - expected).abs() / expected.abs();
            assert!(rel < 0.02, "r = {r}: rel = {rel}");
        }
        // Potential is negative and increases outward
        assert!(model.potential.iter().all(|&p| p < 0.0));
        assert!(model.potential.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_gas_model_in_hydrostatic_equilibrium() {
        let (m, a) = (1.0e14, 600.0);
        let gas = hernquist_density(0.1 * m, 2.0 * a);
        let total = hernquist_density(m, a);
        let model =
            ClusterModel::from_dens_and_tden(1.0, 20_000.0, &gas, &total, None, &test_config())
                .unwrap();
        let g = model.gas.as_ref().unwrap();
        assert!(g.pressure.iter().all(|&p| p > 0.0));
        assert!(g.pressure.windows(2).all(|w| w[0] >= w[1]));
        let chk = model.check_hydrostatic().unwrap();
        let interior = &chk[5..chk.len() - 5];
        assert!(interior.iter().all(|d| d.abs() < 0.05));
    }

    #[test]
    fn test_dm_residual_and_magnetic_field() {
        let (m, a) = (1.0e14, 600.0);
        let gas = hernquist_density(0.1 * m, 2.0 * a);
        let total = hernquist_density(m, a);
        let mut model =
            ClusterModel::from_dens_and_tden(1.0, 20_000.0, &gas, &total, None, &test_config())
                .unwrap();
        let n = model.radius.len();
        assert!(model.dm.mass[n - 1] > 0.0);
        assert!(model.dm.mass[n - 1] < model.total_mass[n - 1]);

        model.set_magnetic_field_from_beta(100.0, true).unwrap();
        let b = model.gas.as_ref().unwrap().magnetic_field.as_ref().unwrap();
        // Cluster-scale fields are microgauss-ish
        assert!(b[0] > 1.0e-9 && b[0] < 1.0e-3, "B0 = {}", b[0]);
    }

    #[test]
    fn test_temperature_round_trip_recovers_total_mass() {
        let (m, a) = (1.0e14, 600.0);
        let gas = hernquist_density(0.1 * m, 2.0 * a);
        let total = hernquist_density(m, a);
        let reference =
            ClusterModel::from_dens_and_tden(1.0, 20_000.0, &gas, &total, None, &test_config())
                .unwrap();
        let tk = &reference.gas.as_ref().unwrap().temperature;
        // Cluster gas runs a few keV
        assert!(tk.iter().all(|&t| t > 0.05 && t < 50.0), "T0 = {}", tk[0]);

        let temp_profile =
            crate::profiles::InterpolatedProfile::new(reference.radius.clone(), tk.clone())
                .unwrap();
        let model = ClusterModel::from_dens_and_temp(
            1.0,
            20_000.0,
            &gas,
            &temp_profile,
            None,
            &test_config(),
        )
        .unwrap();
        // The recovered mass should match the one the temperatures came
        // from away from the grid edges, where the finite differences
        // lose accuracy.
        for (i, &r) in model.radius.iter().enumerate().step_by(40) {
            if r < 5.0 || r > model.rmax() / 4.0 {
                continue;
            }
            let rel = (model.total_mass[i] - reference.total_mass[i]).abs()
                / reference.total_mass[i];
            assert!(rel < 0.05, "r = {r}: rel = {rel}");
        }
        assert!(model.dm.mass.last().unwrap() > &0.0);
    }

    #[test]
    fn test_negative_temperature_rejected() {
        let gas = hernquist_density(1.0e13, 1200.0);
        let cold = |_r: f64| -1.0;
        assert!(matches!(
            ClusterModel::from_dens_and_temp(1.0, 20_000.0, &gas, &cold, None, &test_config()),
            Err(ClusterError::Validity(_))
        ));
    }

    #[test]
    fn test_bad_domain_rejected() {
        let total = hernquist_density(1.0e14, 600.0);
        assert!(matches!(
            ClusterModel::no_gas(0.0, 100.0, &total, None, &test_config()),
            Err(ClusterError::Profile(_))
        ));
    }
}
