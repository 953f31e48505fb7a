//! Build a single hydrostatic cluster and write its particle realization
//! as a snapshot and as Gadget-flavored initial conditions.

use cluster_core::{BhPlacement, ClusterResult, GeneratorConfig};
use cluster_physics::{generate_dm_particles, generate_gas_particles, ClusterModel};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use std::path::Path;

// Fiducial cluster: 1e14 Msun total in a Hernquist halo with a gas
// fraction of about 12 percent.
const M_TOTAL: f64 = 1.0e14;
const A_TOTAL: f64 = 600.0;
const M_GAS: f64 = 1.2e13;
const A_GAS: f64 = 1200.0;
const R_MIN: f64 = 1.0;
const R_MAX: f64 = 20_000.0;
const BOX_SIZE: f64 = 20_000.0;

fn hernquist(m: f64, a: f64) -> impl Fn(f64) -> f64 {
    move |r: f64| m * a / (2.0 * PI * r * (r + a).powi(3))
}

fn run() -> ClusterResult<()> {
    let config = GeneratorConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    info!("Building the hydrostatic cluster model.");
    let gas_density = hernquist(M_GAS, A_GAS);
    let total_density = hernquist(M_TOTAL, A_TOTAL);
    let mut model = ClusterModel::from_dens_and_tden(
        R_MIN,
        R_MAX,
        &gas_density,
        &total_density,
        None,
        &config,
    )?;
    model.set_magnetic_field_from_beta(100.0, true)?;

    model.check_hydrostatic()?;

    let dm = generate_dm_particles(&model, 100_000, None, &config, &mut rng)?;
    let gas = generate_gas_particles(&model, 50_000, None, &config, &mut rng)?;
    let mut parts = dm.combine(&gas)?;
    parts.add_black_hole(3.0e9, BhPlacement::PotentialMinimum)?;

    // Center the cluster in the IC box.
    let half = BOX_SIZE / 2.0;
    parts.add_offsets([half, half, half], [0.0, 0.0, 0.0])?;

    let snapshot = Path::new("cluster_particles.bin");
    cluster_storage::save_particles(&parts, snapshot, true)?;
    info!("Saved particle snapshot to {}.", snapshot.display());

    let ics = Path::new("cluster_gadget_ics.bin");
    cluster_storage::gadget::write_gadget_ics(&parts, ics, BOX_SIZE, true)?;
    info!("Saved initial conditions to {}.", ics.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        log::error!("cluster generation failed: {err}");
        std::process::exit(1);
    }
}
