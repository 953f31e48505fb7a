pub mod df;
pub mod energy;
pub mod generate;
pub mod model;
pub mod numeric;
pub mod profiles;
pub mod sampling;

pub use df::{DistributionFunction, VirialCheck};
pub use energy::EnergyGrid;
pub use generate::{generate_dm_particles, generate_gas_particles, generate_star_particles};
pub use model::ClusterModel;
pub use profiles::{InterpolatedProfile, RadialProfile};
