//! Fixed-schema initial-conditions export in the Gadget flavor: species map
//! to the PartType0/1/4/5 groups, fields carry Gadget names and units, and
//! particle IDs run sequentially from 1 across all groups.

use cluster_core::{ClusterError, ClusterParticles, ClusterResult, Field, Species, Unit};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Gadget particle type index of each species.
pub fn part_type(species: Species) -> u32 {
    match species {
        Species::Gas => 0,
        Species::Dm => 1,
        Species::Star => 4,
        Species::Bh => 5,
    }
}

fn group_name(species: Species) -> String {
    format!("PartType{}", part_type(species))
}

fn group_species(name: &str) -> Option<Species> {
    match name {
        "PartType0" => Some(Species::Gas),
        "PartType1" => Some(Species::Dm),
        "PartType4" => Some(Species::Star),
        "PartType5" => Some(Species::Bh),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GadgetHeader {
    /// Particle counts indexed by Gadget type.
    pub num_part_this_file: [u32; 6],
    pub num_part_total: [u32; 6],
    /// Per-type uniform mass in 1e10 Msun, zero when masses are per-particle.
    pub mass_table: [f64; 6],
    pub time: f64,
    pub redshift: f64,
    pub box_size: f64,
    pub omega0: f64,
    pub omega_lambda: f64,
    pub hubble_param: f64,
    pub num_files_per_snapshot: u32,
    pub flag_sfr: u32,
    pub flag_cooling: u32,
    pub flag_feedback: u32,
    pub flag_double_precision: u32,
}

/// One PartType group. Vector blocks are flattened xyz triplets in
/// single precision; thermodynamic blocks only appear for gas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GadgetGroup {
    pub coordinates: Vec<f32>,
    pub velocities: Vec<f32>,
    pub masses: Vec<f32>,
    pub particle_ids: Vec<u32>,
    pub internal_energy: Option<Vec<f32>>,
    pub density: Option<Vec<f32>>,
    pub magnetic_field: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GadgetIcs {
    pub header: GadgetHeader,
    pub groups: BTreeMap<String, GadgetGroup>,
}

fn required_vector(
    particles: &ClusterParticles,
    species: Species,
    name: &str,
    target: Unit,
) -> ClusterResult<Vec<[f64; 3]>> {
    let field = particles
        .field(species, name)
        .ok_or_else(|| ClusterError::Validity(format!("{species} particles lack {name}")))?
        .in_units(name, target)?;
    field
        .as_vector()
        .map(<[_]>::to_vec)
        .ok_or_else(|| ClusterError::Validity(format!("{name} must be a vector field")))
}

fn required_scalar(
    particles: &ClusterParticles,
    species: Species,
    name: &str,
    target: Unit,
) -> ClusterResult<Vec<f64>> {
    let field = particles
        .field(species, name)
        .ok_or_else(|| ClusterError::Validity(format!("{species} particles lack {name}")))?
        .in_units(name, target)?;
    field
        .as_scalar()
        .map(<[_]>::to_vec)
        .ok_or_else(|| ClusterError::Validity(format!("{name} must be a scalar field")))
}

fn masked_triplets(data: &[[f64; 3]], mask: &[bool]) -> Vec<f32> {
    let kept: Vec<[f32; 3]> = data
        .iter()
        .zip(mask)
        .filter(|&(_, &keep)| keep)
        .map(|(v, _)| [v[0] as f32, v[1] as f32, v[2] as f32])
        .collect();
    bytemuck::cast_slice(&kept).to_vec()
}

fn masked_scalars(data: &[f64], mask: &[bool]) -> Vec<f32> {
    data.iter()
        .zip(mask)
        .filter(|&(_, &keep)| keep)
        .map(|(v, _)| *v as f32)
        .collect()
}

/// Write a particle container as Gadget-flavored initial conditions.
///
/// Particles outside the `[0, box_size]^3` cube are dropped, so offsets
/// should be applied so the cluster sits inside the box before writing.
pub fn write_gadget_ics(
    particles: &ClusterParticles,
    path: &Path,
    box_size: f64,
    overwrite: bool,
) -> ClusterResult<()> {
    if path.exists() && !overwrite {
        return Err(ClusterError::Exists(path.to_path_buf()));
    }

    let mut groups = BTreeMap::new();
    let mut num_part = [0u32; 6];
    let mut mass_table = [0.0f64; 6];
    let mut npart_before = 0u32;
    for species in particles.species() {
        let pos = required_vector(particles, species, "particle_position", Unit::Kpc)?;
        let vel = required_vector(particles, species, "particle_velocity", Unit::KmPerS)?;
        let mass = required_scalar(particles, species, "particle_mass", Unit::E10Msun)?;

        let mask: Vec<bool> = pos
            .iter()
            .map(|p| p.iter().all(|&x| (0.0..=box_size).contains(&x)))
            .collect();
        let kept = mask.iter().filter(|&&m| m).count() as u32;
        if kept < pos.len() as u32 {
            info!(
                "Clipping {} {species} particles outside the box.",
                pos.len() as u32 - kept
            );
        }

        let mut group = GadgetGroup {
            coordinates: masked_triplets(&pos, &mask),
            velocities: masked_triplets(&vel, &mask),
            masses: masked_scalars(&mass, &mask),
            particle_ids: (npart_before + 1..=npart_before + kept).collect(),
            ..GadgetGroup::default()
        };
        if species == Species::Gas {
            group.internal_energy = Some(masked_scalars(
                &required_scalar(particles, species, "particle_thermal_energy", Unit::Km2PerS2)?,
                &mask,
            ));
            group.density = Some(masked_scalars(
                &required_scalar(particles, species, "particle_density", Unit::E10MsunPerKpc3)?,
                &mask,
            ));
            if particles.field(species, "particle_magnetic_field").is_some() {
                group.magnetic_field = Some(masked_scalars(
                    &required_scalar(particles, species, "particle_magnetic_field", Unit::Gauss)?,
                    &mask,
                ));
            }
        } else if let Some((&first, rest)) = group.masses.split_first() {
            // The table entry stands for every particle of the type, so
            // it is only valid when the masses are actually uniform.
            if rest.iter().all(|&m| m == first) {
                mass_table[part_type(species) as usize] = f64::from(first);
            }
        }

        num_part[part_type(species) as usize] = kept;
        npart_before += kept;
        groups.insert(group_name(species), group);
    }

    let ics = GadgetIcs {
        header: GadgetHeader {
            num_part_this_file: num_part,
            num_part_total: num_part,
            mass_table,
            time: 0.0,
            redshift: 0.0,
            box_size,
            omega0: 0.0,
            omega_lambda: 0.0,
            hubble_param: 1.0,
            num_files_per_snapshot: 1,
            flag_sfr: 0,
            flag_cooling: 0,
            flag_feedback: 0,
            flag_double_precision: 0,
        },
        groups,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bincode::serialize(&ics)?)?;
    info!(
        "Wrote {npart_before} particles to {} (box size {box_size} kpc).",
        path.display()
    );
    Ok(())
}

fn triplets_from_flat(flat: &[f32], name: &str) -> ClusterResult<Vec<[f64; 3]>> {
    if flat.len() % 3 != 0 {
        return Err(ClusterError::FieldLength {
            field: name.to_string(),
            expected: flat.len() / 3 * 3,
            got: flat.len(),
        });
    }
    let triplets: &[[f32; 3]] = bytemuck::cast_slice(flat);
    Ok(triplets
        .iter()
        .map(|v| [f64::from(v[0]), f64::from(v[1]), f64::from(v[2])])
        .collect())
}

fn scalars_from_flat(flat: &[f32]) -> Vec<f64> {
    flat.iter().map(|&v| f64::from(v)).collect()
}

/// Read Gadget-flavored initial conditions back into a container with
/// all fields converted to galactic units. `ptypes` restricts the read
/// to the listed species.
pub fn read_gadget_ics(
    path: &Path,
    ptypes: Option<&[Species]>,
) -> ClusterResult<ClusterParticles> {
    let ics: GadgetIcs = bincode::deserialize(&fs::read(path)?)?;
    let mut fields: Vec<(Species, &str, Field)> = Vec::new();
    for (name, group) in &ics.groups {
        let species = group_species(name).ok_or_else(|| {
            ClusterError::Validity(format!("unrecognized particle group {name}"))
        })?;
        if let Some(wanted) = ptypes {
            if !wanted.contains(&species) {
                continue;
            }
        }
        fields.push((
            species,
            "particle_position",
            Field::vector(triplets_from_flat(&group.coordinates, "Coordinates")?, Unit::Kpc),
        ));
        fields.push((
            species,
            "particle_velocity",
            Field::vector(triplets_from_flat(&group.velocities, "Velocities")?, Unit::KmPerS)
                .in_units("particle_velocity", Unit::KpcPerMyr)?,
        ));
        fields.push((
            species,
            "particle_mass",
            Field::scalar(scalars_from_flat(&group.masses), Unit::E10Msun)
                .in_units("particle_mass", Unit::Msun)?,
        ));
        if let Some(energy) = &group.internal_energy {
            fields.push((
                species,
                "particle_thermal_energy",
                Field::scalar(scalars_from_flat(energy), Unit::Km2PerS2)
                    .in_units("particle_thermal_energy", Unit::Kpc2PerMyr2)?,
            ));
        }
        if let Some(density) = &group.density {
            fields.push((
                species,
                "particle_density",
                Field::scalar(scalars_from_flat(density), Unit::E10MsunPerKpc3)
                    .in_units("particle_density", Unit::MsunPerKpc3)?,
            ));
        }
        if let Some(b) = &group.magnetic_field {
            fields.push((
                species,
                "particle_magnetic_field",
                Field::scalar(scalars_from_flat(b), Unit::Gauss),
            ));
        }
    }
    ClusterParticles::from_fields(fields)
}
