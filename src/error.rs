//! Error types for FurrowNav

use thiserror::Error;

/// FurrowNav error type.
///
/// Sensor readings are never errors: a zero range sample means "no return"
/// and degenerate tunings (epsilon of zero, empty sweeps) produce empty
/// results. Errors only arise from the plumbing around the core.
#[derive(Error, Debug)]
pub enum FurrowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for FurrowError {
    fn from(e: toml::de::Error) -> Self {
        FurrowError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FurrowError>;
