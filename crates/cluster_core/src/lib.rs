pub mod config;
pub mod constants;
pub mod error;
pub mod particles;
pub mod units;

pub use config::GeneratorConfig;
pub use constants::*;
pub use error::{ClusterError, ClusterResult};
pub use particles::*;
pub use units::{Dimension, Unit};
