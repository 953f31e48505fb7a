use crate::error::{ClusterError, ClusterResult};
use crate::units::Unit;
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Particle species a cluster realization can contain.
///
/// The declaration order fixes the species ordering of the IC export
/// (gas, dm, star, bh).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Species {
    Gas,
    Dm,
    Star,
    Bh,
}

impl Species {
    pub const ALL: [Species; 4] = [Species::Gas, Species::Dm, Species::Star, Species::Bh];

    pub fn name(self) -> &'static str {
        match self {
            Species::Gas => "gas",
            Species::Dm => "dm",
            Species::Star => "star",
            Species::Bh => "bh",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Raw storage for one field: either one value per particle or one
/// 3-vector per particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldData {
    Scalar(Vec<f64>),
    Vector(Vec<[f64; 3]>),
}

impl FieldData {
    pub fn len(&self) -> usize {
        match self {
            FieldData::Scalar(v) => v.len(),
            FieldData::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scaled(&self, factor: f64) -> FieldData {
        match self {
            FieldData::Scalar(v) => FieldData::Scalar(v.iter().map(|x| x * factor).collect()),
            FieldData::Vector(v) => FieldData::Vector(
                v.iter()
                    .map(|x| [x[0] * factor, x[1] * factor, x[2] * factor])
                    .collect(),
            ),
        }
    }

    /// Concatenate two arrays of the same kind into a fresh array.
    fn concat(&self, other: &FieldData) -> Option<FieldData> {
        match (self, other) {
            (FieldData::Scalar(a), FieldData::Scalar(b)) => {
                let mut out = a.clone();
                out.extend_from_slice(b);
                Some(FieldData::Scalar(out))
            }
            (FieldData::Vector(a), FieldData::Vector(b)) => {
                let mut out = a.clone();
                out.extend_from_slice(b);
                Some(FieldData::Vector(out))
            }
            _ => None,
        }
    }

    fn add_assign(&mut self, other: &FieldData) -> bool {
        match (self, other) {
            (FieldData::Scalar(a), FieldData::Scalar(b)) => {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                true
            }
            (FieldData::Vector(a), FieldData::Vector(b)) => {
                for (x, y) in a.iter_mut().zip(b) {
                    x[0] += y[0];
                    x[1] += y[1];
                    x[2] += y[2];
                }
                true
            }
            _ => false,
        }
    }

    /// Copy the values at `idxs` into a fresh array, in index order.
    fn gather(&self, idxs: &[usize]) -> FieldData {
        match self {
            FieldData::Scalar(v) => FieldData::Scalar(idxs.iter().map(|&i| v[i]).collect()),
            FieldData::Vector(v) => FieldData::Vector(idxs.iter().map(|&i| v[i]).collect()),
        }
    }

    fn retain_mask(&mut self, mask: &[bool]) {
        match self {
            FieldData::Scalar(v) => {
                let mut it = mask.iter();
                v.retain(|_| *it.next().unwrap());
            }
            FieldData::Vector(v) => {
                let mut it = mask.iter();
                v.retain(|_| *it.next().unwrap());
            }
        }
    }
}

/// A particle field: values plus the unit they are expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub data: FieldData,
    pub units: Unit,
}

impl Field {
    pub fn scalar(data: Vec<f64>, units: Unit) -> Self {
        Self {
            data: FieldData::Scalar(data),
            units,
        }
    }

    pub fn vector(data: Vec<[f64; 3]>, units: Unit) -> Self {
        Self {
            data: FieldData::Vector(data),
            units,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_scalar(&self) -> Option<&[f64]> {
        match &self.data {
            FieldData::Scalar(v) => Some(v),
            FieldData::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[[f64; 3]]> {
        match &self.data {
            FieldData::Vector(v) => Some(v),
            FieldData::Scalar(_) => None,
        }
    }

    /// Return a copy of this field expressed in `target` units.
    pub fn in_units(&self, name: &str, target: Unit) -> ClusterResult<Field> {
        let factor =
            self.units
                .conversion(target)
                .ok_or_else(|| ClusterError::IncompatibleUnits {
                    field: name.to_string(),
                    left: self.units,
                    right: target,
                })?;
        Ok(Field {
            data: self.data.scaled(factor),
            units: target,
        })
    }
}

/// Whether `set_field` replaces an existing field or adds to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetFieldPolicy {
    /// Replace any existing field of the same name (logs a warning,
    /// since this is a common but occasionally accidental workflow).
    Overwrite,
    /// Add element-wise to the existing field, converting units.
    Accumulate,
}

/// Where to place an appended black hole particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BhPlacement {
    /// Explicit phase-space coordinates (kpc, kpc/Myr).
    At {
        position: [f64; 3],
        velocity: [f64; 3],
    },
    /// The position and velocity of the dm particle with the deepest
    /// potential. Requires dm particles carrying `particle_potential`.
    PotentialMinimum,
}

const POSITION: &str = "particle_position";
const VELOCITY: &str = "particle_velocity";
const MASS: &str = "particle_mass";
const POTENTIAL: &str = "particle_potential";

/// A set of particle arrays keyed by species and field name.
///
/// All arrays of one species share the same length. In-place operations
/// take `&mut self`; combination builds an entirely fresh container so
/// two containers never share backing storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterParticles {
    fields: BTreeMap<Species, BTreeMap<String, Field>>,
}

impl ClusterParticles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from (species, name, field) triples, checking
    /// that every species has consistent array lengths.
    pub fn from_fields<I, S>(fields: I) -> ClusterResult<Self>
    where
        I: IntoIterator<Item = (Species, S, Field)>,
        S: Into<String>,
    {
        let mut out = Self::new();
        for (species, name, field) in fields {
            out.fields
                .entry(species)
                .or_default()
                .insert(name.into(), field);
        }
        out.validate()?;
        Ok(out)
    }

    fn validate(&self) -> ClusterResult<()> {
        for (species, rec) in &self.fields {
            let mut expected = None;
            for (name, field) in rec {
                let n = field.len();
                match expected {
                    None => expected = Some(n),
                    Some(e) if e != n => {
                        return Err(ClusterError::FieldLength {
                            field: format!("({species}, {name})"),
                            expected: e,
                            got: n,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    pub fn species(&self) -> Vec<Species> {
        self.fields.keys().copied().collect()
    }

    pub fn has_species(&self, species: Species) -> bool {
        self.fields.contains_key(&species)
    }

    /// Number of particles of a species; zero when the species is absent.
    pub fn num_particles(&self, species: Species) -> usize {
        self.fields
            .get(&species)
            .and_then(|rec| rec.values().next())
            .map_or(0, Field::len)
    }

    pub fn field(&self, species: Species, name: &str) -> Option<&Field> {
        self.fields.get(&species)?.get(name)
    }

    pub fn field_names(&self, species: Species) -> Vec<&str> {
        self.fields
            .get(&species)
            .map_or_else(Vec::new, |rec| rec.keys().map(String::as_str).collect())
    }

    pub fn iter_fields(&self) -> impl Iterator<Item = (Species, &str, &Field)> {
        self.fields.iter().flat_map(|(species, rec)| {
            rec.iter().map(|(name, field)| (*species, name.as_str(), field))
        })
    }

    /// Assign or accumulate a named field for a species already present.
    pub fn set_field(
        &mut self,
        species: Species,
        name: &str,
        field: Field,
        policy: SetFieldPolicy,
    ) -> ClusterResult<()> {
        let n = self.num_particles(species);
        let rec = self
            .fields
            .get_mut(&species)
            .ok_or(ClusterError::EmptySpecies(species))?;
        if field.len() != n {
            return Err(ClusterError::FieldLength {
                field: format!("({species}, {name})"),
                expected: n,
                got: field.len(),
            });
        }
        match policy {
            SetFieldPolicy::Overwrite => {
                if rec.contains_key(name) {
                    warn!("overwriting field ({species}, {name})");
                }
                rec.insert(name.to_string(), field);
            }
            SetFieldPolicy::Accumulate => match rec.get_mut(name) {
                Some(existing) => {
                    let incoming = field.in_units(name, existing.units)?;
                    if !existing.data.add_assign(&incoming.data) {
                        return Err(ClusterError::Validity(format!(
                            "cannot accumulate into field ({species}, {name}): \
                             scalar/vector mismatch"
                        )));
                    }
                }
                None => {
                    rec.insert(name.to_string(), field);
                }
            },
        }
        Ok(())
    }

    /// Combine two containers into a fresh one. Shared species are
    /// concatenated field by field (the right operand converted into the
    /// left operand's units); disjoint species are unioned.
    pub fn combine(&self, other: &ClusterParticles) -> ClusterResult<ClusterParticles> {
        let mut out = self.clone();
        for (species, rec) in &other.fields {
            match out.fields.get_mut(species) {
                None => {
                    out.fields.insert(*species, rec.clone());
                }
                Some(mine) => {
                    if mine.len() != rec.len() || !rec.keys().all(|k| mine.contains_key(k)) {
                        return Err(ClusterError::Validity(format!(
                            "cannot combine species {species}: field sets differ"
                        )));
                    }
                    for (name, theirs) in rec {
                        let left = mine.get_mut(name).unwrap();
                        let converted = theirs.in_units(name, left.units)?;
                        let data = left.data.concat(&converted.data).ok_or_else(|| {
                            ClusterError::Validity(format!(
                                "cannot combine field ({species}, {name}): \
                                 scalar/vector mismatch"
                            ))
                        })?;
                        left.data = data;
                    }
                }
            }
        }
        out.validate()?;
        Ok(out)
    }

    /// Remove all fields of a species. Dropping an absent species is a
    /// no-op, so the operation is idempotent.
    pub fn drop_species(&mut self, species: Species) {
        self.fields.remove(&species);
    }

    /// Translate all particle positions and velocities in place. Calling
    /// twice with the same deltas shifts twice.
    pub fn add_offsets(&mut self, r_ctr: [f64; 3], v_ctr: [f64; 3]) -> ClusterResult<()> {
        for (species, rec) in &mut self.fields {
            for (name, delta, delta_units) in [
                (POSITION, r_ctr, Unit::Kpc),
                (VELOCITY, v_ctr, Unit::KpcPerMyr),
            ] {
                let Some(field) = rec.get_mut(name) else {
                    continue;
                };
                let factor = delta_units.conversion(field.units).ok_or_else(|| {
                    ClusterError::IncompatibleUnits {
                        field: format!("({species}, {name})"),
                        left: delta_units,
                        right: field.units,
                    }
                })?;
                if let FieldData::Vector(v) = &mut field.data {
                    for x in v.iter_mut() {
                        x[0] += delta[0] * factor;
                        x[1] += delta[1] * factor;
                        x[2] += delta[2] * factor;
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove particles farther than `r_max` kpc from `center` (origin by
    /// default), for one species or for all present species. Truncates in
    /// place; survivor order is preserved.
    pub fn radial_cut(
        &mut self,
        r_max: f64,
        center: Option<[f64; 3]>,
        species: Option<Species>,
    ) -> ClusterResult<()> {
        let ctr = center.unwrap_or([0.0; 3]);
        let targets: Vec<Species> = match species {
            Some(s) => {
                if !self.has_species(s) {
                    return Err(ClusterError::EmptySpecies(s));
                }
                vec![s]
            }
            None => self.species(),
        };
        for s in targets {
            let rec = self.fields.get_mut(&s).unwrap();
            let pos = rec
                .get(POSITION)
                .and_then(Field::as_vector)
                .ok_or_else(|| {
                    ClusterError::Validity(format!("species {s} has no position field"))
                })?;
            let mask: Vec<bool> = pos
                .iter()
                .map(|p| {
                    let dx = p[0] - ctr[0];
                    let dy = p[1] - ctr[1];
                    let dz = p[2] - ctr[2];
                    (dx * dx + dy * dy + dz * dz).sqrt() <= r_max
                })
                .collect();
            for field in rec.values_mut() {
                field.data.retain_mask(&mask);
            }
        }
        Ok(())
    }

    /// Tag `nstars` randomly chosen dm particles as stars, copying their
    /// phase-space coordinates into the star species. The dm particles
    /// themselves are left in place.
    pub fn swap_dm_for_stars(
        &mut self,
        nstars: usize,
        rng: &mut impl Rng,
    ) -> ClusterResult<()> {
        let ndm = self.num_particles(Species::Dm);
        if ndm == 0 {
            return Err(ClusterError::EmptySpecies(Species::Dm));
        }
        if nstars > ndm {
            return Err(ClusterError::Validity(format!(
                "cannot tag {nstars} star particles out of {ndm} dm particles"
            )));
        }
        let idxs: Vec<usize> = (0..nstars).map(|_| rng.gen_range(0..ndm)).collect();
        let dm = &self.fields[&Species::Dm];
        let star: BTreeMap<String, Field> = dm
            .iter()
            .map(|(name, field)| {
                let field = Field {
                    data: field.data.gather(&idxs),
                    units: field.units,
                };
                (name.clone(), field)
            })
            .collect();
        if self.fields.insert(Species::Star, star).is_some() {
            warn!("replacing existing star particles");
        }
        self.validate()
    }

    /// Append a single black hole particle to the bh species.
    pub fn add_black_hole(&mut self, mass: f64, placement: BhPlacement) -> ClusterResult<()> {
        let (pos, vel) = match placement {
            BhPlacement::At { position, velocity } => (position, velocity),
            BhPlacement::PotentialMinimum => {
                let dm = self
                    .fields
                    .get(&Species::Dm)
                    .ok_or(ClusterError::EmptySpecies(Species::Dm))?;
                let pot = dm.get(POTENTIAL).and_then(Field::as_scalar).ok_or_else(|| {
                    ClusterError::Validity(
                        "dm particles carry no particle_potential field".to_string(),
                    )
                })?;
                let idx = pot
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .ok_or(ClusterError::EmptySpecies(Species::Dm))?;
                let pos = dm
                    .get(POSITION)
                    .and_then(Field::as_vector)
                    .ok_or_else(|| {
                        ClusterError::Validity("dm particles have no position field".to_string())
                    })?[idx];
                let vel = dm
                    .get(VELOCITY)
                    .and_then(Field::as_vector)
                    .ok_or_else(|| {
                        ClusterError::Validity("dm particles have no velocity field".to_string())
                    })?[idx];
                (pos, vel)
            }
        };

        let rec = self.fields.entry(Species::Bh).or_default();
        if !rec.is_empty()
            && !rec.keys().all(|k| k == POSITION || k == VELOCITY || k == MASS)
        {
            return Err(ClusterError::Validity(
                "bh species carries fields beyond position/velocity/mass".to_string(),
            ));
        }
        for (name, field) in [
            (POSITION, Field::vector(vec![pos], Unit::Kpc)),
            (VELOCITY, Field::vector(vec![vel], Unit::KpcPerMyr)),
            (MASS, Field::scalar(vec![mass], Unit::Msun)),
        ] {
            match rec.get_mut(name) {
                Some(existing) => {
                    let converted = field.in_units(name, existing.units)?;
                    let data = existing.data.concat(&converted.data).ok_or_else(|| {
                        ClusterError::Validity(format!(
                            "cannot append to bh field {name}: scalar/vector mismatch"
                        ))
                    })?;
                    existing.data = data;
                }
                None => {
                    rec.insert(name.to_string(), field);
                }
            }
        }
        self.validate()
    }
}
