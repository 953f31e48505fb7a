use crate::particles::Species;
use crate::units::Unit;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    /// An input profile violated monotonicity or another structural
    /// requirement; indicates a malformed model, never retried.
    #[error("profile error: {0}")]
    Profile(String),

    #[error("query {value} outside tabulated domain [{min}, {max}]")]
    Domain { value: f64, min: f64, max: f64 },

    /// A physically inconsistent result, e.g. a negative distribution
    /// function from a density that is not monotonic in the potential.
    #[error("validity error: {0}")]
    Validity(String),

    #[error("incompatible units for field {field}: {left} vs {right}")]
    IncompatibleUnits {
        field: String,
        left: Unit,
        right: Unit,
    },

    #[error("species {0} not present in container")]
    EmptySpecies(Species),

    #[error("rejection sampling exhausted {budget} draws at r = {radius:.4} kpc")]
    SamplingTimeout { radius: f64, budget: usize },

    #[error("field {field} has {got} elements, expected {expected}")]
    FieldLength {
        field: String,
        expected: usize,
        got: usize,
    },

    #[error("cannot create {0}: it exists and overwrite is false")]
    Exists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] bincode::Error),
}

pub type ClusterResult<T> = Result<T, ClusterError>;
