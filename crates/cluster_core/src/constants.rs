// Physical constants in "galactic" units:
// - Distance: kpc
// - Mass: solar masses (Msun)
// - Time: Myr
// Velocities come out in kpc/Myr (1 kpc/Myr ~ 978 km/s), which keeps
// cluster-scale numbers in comfortable f64 ranges.

/// Gravitational constant in kpc^3/(Msun * Myr^2)
pub const G: f64 = 4.498502151e-12;

/// 1 km/s expressed in kpc/Myr
pub const KM_S_TO_KPC_MYR: f64 = 1.022712165e-3;

/// Proton mass in Msun
pub const MP: f64 = 8.4097e-58;

/// Hydrogen mass fraction
pub const X_H: f64 = 0.76;

/// Mean molecular weight of a fully ionized H/He plasma
pub const MU: f64 = 1.0 / (2.0 * X_H + 0.75 * (1.0 - X_H));

/// 1 keV in Msun*kpc^2/Myr^2, for temperatures quoted as kT
pub const KEV: f64 = 8.4256e-59;

/// 1 Msun/(kpc*Myr^2) (galactic pressure unit) in erg/cm^3
pub const PRESSURE_TO_CGS: f64 = 6.4722e-16;
