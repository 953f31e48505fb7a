//! Turn a `ClusterModel` into particle realizations, species by species.

use crate::df::DistributionFunction;
use crate::energy::EnergyGrid;
use crate::model::ClusterModel;
use crate::numeric;
use crate::sampling;
use cluster_core::{
    ClusterError, ClusterResult, ClusterParticles, Field, GeneratorConfig, Species, Unit,
};
use log::info;
use rand::Rng;

fn scatter_positions(radii: &[f64], rng: &mut impl Rng) -> Vec<[f64; 3]> {
    radii
        .iter()
        .map(|&r| {
            let d = sampling::isotropic_direction(rng);
            [r * d[0], r * d[1], r * d[2]]
        })
        .collect()
}

/// Generate dark matter particles with virial-equilibrium velocities.
pub fn generate_dm_particles(
    model: &ClusterModel,
    num: usize,
    r_max: Option<f64>,
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> ClusterResult<ClusterParticles> {
    generate_collisionless(model, Species::Dm, num, r_max, config, rng)
}

/// Generate star particles with virial-equilibrium velocities.
pub fn generate_star_particles(
    model: &ClusterModel,
    num: usize,
    r_max: Option<f64>,
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> ClusterResult<ClusterParticles> {
    generate_collisionless(model, Species::Star, num, r_max, config, rng)
}

fn generate_collisionless(
    model: &ClusterModel,
    species: Species,
    num: usize,
    r_max: Option<f64>,
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> ClusterResult<ClusterParticles> {
    info!("Assigning {num} {species} particle positions.");
    let mass_profile = model.mass_profile(species)?;
    let density = model.density_profile(species)?;
    let (radii, mtot) = sampling::sample_radii(&model.radius, mass_profile, num, r_max, rng)?;

    info!("Computing the distribution function for {species}.");
    let grid = EnergyGrid::new(&model.radius, &model.potential)?;
    let df = DistributionFunction::eddington(&grid, density, config)?;

    info!("Assigning {species} particle velocities.");
    let mut velocity = Vec::with_capacity(num);
    let mut potential = Vec::with_capacity(num);
    for &r in &radii {
        let psi = grid.psi(r);
        let v = sampling::sample_speed(psi, r, &df, config.max_rejections, rng)?;
        let d = sampling::isotropic_direction(rng);
        velocity.push([v * d[0], v * d[1], v * d[2]]);
        potential.push(-psi);
    }

    let position = scatter_positions(&radii, rng);
    let pmass = mtot / num as f64;
    ClusterParticles::from_fields([
        (
            species,
            "particle_position",
            Field::vector(position, Unit::Kpc),
        ),
        (
            species,
            "particle_velocity",
            Field::vector(velocity, Unit::KpcPerMyr),
        ),
        (
            species,
            "particle_mass",
            Field::scalar(vec![pmass; num], Unit::Msun),
        ),
        (
            species,
            "particle_potential",
            Field::scalar(potential, Unit::Kpc2PerMyr2),
        ),
    ])
}

/// Generate gas particles in hydrostatic equilibrium: positions follow the
/// gas mass profile, velocities are zero, and the thermodynamic state is
/// interpolated from the model.
pub fn generate_gas_particles(
    model: &ClusterModel,
    num: usize,
    r_max: Option<f64>,
    _config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> ClusterResult<ClusterParticles> {
    let gas = model
        .gas
        .as_ref()
        .ok_or(ClusterError::EmptySpecies(Species::Gas))?;

    info!("Assigning {num} gas particle positions.");
    let (radii, mtot) = sampling::sample_radii(&model.radius, &gas.mass, num, r_max, rng)?;
    let position = scatter_positions(&radii, rng);

    info!("Computing gas particle thermal energies, densities, and masses.");
    let density: Vec<f64> = radii
        .iter()
        .map(|&r| numeric::interp(r, &model.radius, &gas.density))
        .collect();
    let thermal_energy: Vec<f64> = radii
        .iter()
        .map(|&r| numeric::interp(r, &model.radius, &gas.thermal_energy))
        .collect();
    let pmass = mtot / num as f64;

    let mut fields = vec![
        (
            Species::Gas,
            "particle_position",
            Field::vector(position, Unit::Kpc),
        ),
        (
            Species::Gas,
            "particle_velocity",
            Field::vector(vec![[0.0; 3]; num], Unit::KpcPerMyr),
        ),
        (
            Species::Gas,
            "particle_mass",
            Field::scalar(vec![pmass; num], Unit::Msun),
        ),
        (
            Species::Gas,
            "particle_density",
            Field::scalar(density, Unit::MsunPerKpc3),
        ),
        (
            Species::Gas,
            "particle_thermal_energy",
            Field::scalar(thermal_energy, Unit::Kpc2PerMyr2),
        ),
    ];
    if let Some(b_field) = &gas.magnetic_field {
        let b: Vec<f64> = radii
            .iter()
            .map(|&r| numeric::interp(r, &model.radius, b_field))
            .collect();
        fields.push((
            Species::Gas,
            "particle_magnetic_field",
            Field::scalar(b, Unit::Gauss),
        ));
    }
    ClusterParticles::from_fields(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    fn hernquist_density(m: f64, a: f64) -> impl Fn(f64) -> f64 {
        move |r: f64| m * a / (2.0 * PI * r * (r + a).powi(3))
    }

    fn test_config() -> GeneratorConfig {
        GeneratorConfig {
            num_points: 200,
            df_grid_size: 200,
            quad_tol: 1e-8,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_dm_particles_equal_mass_and_bound() {
        let config = test_config();
        let total = hernquist_density(1.0e14, 600.0);
        let model = ClusterModel::no_gas(1.0, 20_000.0, &total, None, &config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let parts = generate_dm_particles(&model, 2000, None, &config, &mut rng).unwrap();

        assert_eq!(parts.num_particles(Species::Dm), 2000);
        let mass = parts
            .field(Species::Dm, "particle_mass")
            .unwrap()
            .as_scalar()
            .unwrap();
        let expected = model.dm.mass[model.radius.len() - 1] / 2000.0;
        assert!(mass.iter().all(|&m| m == expected));

        let grid = EnergyGrid::new(&model.radius, &model.potential).unwrap();
        let pos = parts
            .field(Species::Dm, "particle_position")
            .unwrap()
            .as_vector()
            .unwrap();
        let vel = parts
            .field(Species::Dm, "particle_velocity")
            .unwrap()
            .as_vector()
            .unwrap();
        for (p, v) in pos.iter().zip(vel) {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!(r <= model.rmax() + 1e-9);
            let speed = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            let v_esc = (2.0 * grid.psi(r)).sqrt();
            assert!(speed <= v_esc + 1e-12, "r = {r}: {speed} > {v_esc}");
        }

        let pot = parts
            .field(Species::Dm, "particle_potential")
            .unwrap()
            .as_scalar()
            .unwrap();
        assert!(pot.iter().all(|&p| p < 0.0));
    }

    #[test]
    fn test_gas_particles_carry_thermodynamics() {
        let config = test_config();
        let gas = hernquist_density(1.0e13, 1200.0);
        let total = hernquist_density(1.0e14, 600.0);
        let mut model =
            ClusterModel::from_dens_and_tden(1.0, 20_000.0, &gas, &total, None, &config).unwrap();
        model.set_magnetic_field_from_beta(100.0, true).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let parts = generate_gas_particles(&model, 1000, None, &config, &mut rng).unwrap();

        let vel = parts
            .field(Species::Gas, "particle_velocity")
            .unwrap()
            .as_vector()
            .unwrap();
        assert!(vel.iter().all(|v| *v == [0.0; 3]));
        let density = parts
            .field(Species::Gas, "particle_density")
            .unwrap()
            .as_scalar()
            .unwrap();
        let energy = parts
            .field(Species::Gas, "particle_thermal_energy")
            .unwrap()
            .as_scalar()
            .unwrap();
        assert!(density.iter().all(|&d| d > 0.0));
        assert!(energy.iter().all(|&e| e > 0.0));
        assert!(parts.field(Species::Gas, "particle_magnetic_field").is_some());
    }

    #[test]
    fn test_star_particles_need_stellar_profile() {
        let config = test_config();
        let total = hernquist_density(1.0e14, 600.0);
        let model = ClusterModel::no_gas(1.0, 20_000.0, &total, None, &config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            generate_star_particles(&model, 100, None, &config, &mut rng),
            Err(ClusterError::EmptySpecies(Species::Star))
        ));
    }

    #[test]
    fn test_gas_particles_need_gas_profile() {
        let config = test_config();
        let total = hernquist_density(1.0e14, 600.0);
        let model = ClusterModel::no_gas(1.0, 20_000.0, &total, None, &config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            generate_gas_particles(&model, 100, None, &config, &mut rng),
            Err(ClusterError::EmptySpecies(Species::Gas))
        ));
    }
}
