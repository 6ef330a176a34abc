use thiserror::Error;

mod ids;

pub use ids::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid entity key: {key:?} - {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid entity id: {0}")]
    InvalidId(String),
}
