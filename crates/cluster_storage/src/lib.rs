use cluster_core::{ClusterError, ClusterParticles, ClusterResult, Species};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub mod gadget;

const SNAPSHOT_MAGIC: [u8; 4] = *b"CLPT";
const SNAPSHOT_VERSION: u32 = 1;

/// On-disk particle snapshot: a version tag plus the full container,
/// units included, serialized as bincode.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    magic: [u8; 4],
    version: u32,
    particles: ClusterParticles,
}

/// Save a particle container to disk. Refuses to replace an existing
/// file unless `overwrite` is set.
pub fn save_particles(
    particles: &ClusterParticles,
    path: &Path,
    overwrite: bool,
) -> ClusterResult<()> {
    if path.exists() && !overwrite {
        return Err(ClusterError::Exists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let snapshot = Snapshot {
        magic: SNAPSHOT_MAGIC,
        version: SNAPSHOT_VERSION,
        particles: particles.clone(),
    };
    let data = bincode::serialize(&snapshot)?;
    fs::write(path, data)?;
    Ok(())
}

/// Load a particle container from disk. When `ptypes` is given, only the
/// listed species are kept; asking for a species the file does not hold
/// is an error.
pub fn load_particles(
    path: &Path,
    ptypes: Option<&[Species]>,
) -> ClusterResult<ClusterParticles> {
    let data = fs::read(path)?;
    let snapshot: Snapshot = bincode::deserialize(&data)?;
    if snapshot.magic != SNAPSHOT_MAGIC || snapshot.version != SNAPSHOT_VERSION {
        return Err(ClusterError::Serialize(
            bincode::ErrorKind::Custom(format!(
                "{} is not a version {SNAPSHOT_VERSION} particle snapshot",
                path.display()
            ))
            .into(),
        ));
    }
    let mut particles = snapshot.particles;
    if let Some(wanted) = ptypes {
        for &species in wanted {
            if !particles.has_species(species) {
                return Err(ClusterError::EmptySpecies(species));
            }
        }
        for species in Species::ALL {
            if !wanted.contains(&species) {
                particles.drop_species(species);
            }
        }
    }
    Ok(particles)
}
