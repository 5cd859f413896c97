//! Error taxonomy for configuration and decoding failures.
//!
//! Solver instability and degenerate geometry are deliberately absent:
//! both are folded into the fitness value instead of surfacing as errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrussError {
    #[error("configuration file {path} could not be read: {source}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration ended before {field} was read")]
    MissingValue { field: &'static str },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("invalid genotype: {0}")]
    InvalidGenotype(String),

    #[error("genotype has {found} bits but the configuration expects {expected}")]
    GenotypeLength { expected: usize, found: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrussError {
    /// Whether the error comes from malformed configuration input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TrussError::ConfigNotFound { .. }
                | TrussError::MissingValue { .. }
                | TrussError::InvalidValue { .. }
                | TrussError::InvalidTopology(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TrussError>;
