use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical dimension of a unit. Conversion is only defined between units
/// sharing a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Length,
    Velocity,
    Mass,
    MassDensity,
    SpecificEnergy,
    MagneticField,
    Dimensionless,
}

/// The units a particle or model field can carry.
///
/// Base ("galactic") units are kpc, Msun, Myr; the Gadget-flavored units
/// (km/s, 1e10 Msun, ...) exist for the IC export path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Kpc,
    KpcPerMyr,
    KmPerS,
    Msun,
    E10Msun,
    MsunPerKpc3,
    E10MsunPerKpc3,
    Kpc2PerMyr2,
    Km2PerS2,
    Gauss,
    Dimensionless,
}

use crate::constants::KM_S_TO_KPC_MYR;

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Kpc => Dimension::Length,
            Unit::KpcPerMyr | Unit::KmPerS => Dimension::Velocity,
            Unit::Msun | Unit::E10Msun => Dimension::Mass,
            Unit::MsunPerKpc3 | Unit::E10MsunPerKpc3 => Dimension::MassDensity,
            Unit::Kpc2PerMyr2 | Unit::Km2PerS2 => Dimension::SpecificEnergy,
            Unit::Gauss => Dimension::MagneticField,
            Unit::Dimensionless => Dimension::Dimensionless,
        }
    }

    /// Factor converting a value in this unit to the galactic base unit of
    /// its dimension.
    fn to_base(self) -> f64 {
        match self {
            Unit::Kpc => 1.0,
            Unit::KpcPerMyr => 1.0,
            Unit::KmPerS => KM_S_TO_KPC_MYR,
            Unit::Msun => 1.0,
            Unit::E10Msun => 1.0e10,
            Unit::MsunPerKpc3 => 1.0,
            Unit::E10MsunPerKpc3 => 1.0e10,
            Unit::Kpc2PerMyr2 => 1.0,
            Unit::Km2PerS2 => KM_S_TO_KPC_MYR * KM_S_TO_KPC_MYR,
            Unit::Gauss => 1.0,
            Unit::Dimensionless => 1.0,
        }
    }

    /// Multiplicative factor taking a value in `self` to a value in
    /// `target`, or `None` when the dimensions differ.
    pub fn conversion(self, target: Unit) -> Option<f64> {
        if self.dimension() != target.dimension() {
            return None;
        }
        Some(self.to_base() / target.to_base())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Kpc => "kpc",
            Unit::KpcPerMyr => "kpc/Myr",
            Unit::KmPerS => "km/s",
            Unit::Msun => "Msun",
            Unit::E10Msun => "1e10*Msun",
            Unit::MsunPerKpc3 => "Msun/kpc**3",
            Unit::E10MsunPerKpc3 => "1e10*Msun/kpc**3",
            Unit::Kpc2PerMyr2 => "kpc**2/Myr**2",
            Unit::Km2PerS2 => "km**2/s**2",
            Unit::Gauss => "gauss",
            Unit::Dimensionless => "dimensionless",
        };
        write!(f, "{s}")
    }
}
