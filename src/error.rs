// Error taxonomy of the simulation engine.

use thiserror::Error;

use crate::types::{Seed, TeamId};

// All errors indicate programmer or configuration mistakes. They are raised
// synchronously and are never retried internally.
#[derive(Debug, Error)]
#[derive(Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("team #{team} is not in {group}")]
    TeamNotFound { team: TeamId, group: String },

    #[error("{seed} is not a valid seeding in {group}")]
    SeedOutOfRange { seed: Seed, group: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
