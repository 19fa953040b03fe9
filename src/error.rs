//! Error types for the island simulation.

use thiserror::Error;

/// Errors raised at the boundary operations of the simulation.
///
/// Probabilistic outcomes (an animal not giving birth, not migrating, a failed
/// kill) are normal results and never surface here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    /// Structurally malformed input: map shape, population records, neighbour lists.
    #[error("validation error: {0}")]
    Validation(String),
    /// Well-formed but semantically invalid: animals in the sea, unknown parameter keys.
    #[error("domain error: {0}")]
    Domain(String),
    /// Reference to a coordinate that is not part of the island.
    #[error("lookup error: {0}")]
    Lookup(String),
}

impl SimError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors from loading or saving a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] SimError),
}

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::validation("rows differ in length");
        assert_eq!(err.to_string(), "validation error: rows differ in length");

        let err = SimError::lookup("(99, 99)");
        assert!(matches!(err, SimError::Lookup(_)));
    }

    #[test]
    fn test_config_error_wraps_sim_error() {
        let err: ConfigError = SimError::domain("unknown key 'foo'").into();
        assert!(err.to_string().contains("unknown key"));
    }

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::VersionMismatch {
            expected: 1,
            found: 7,
        };
        assert_eq!(err.to_string(), "Version mismatch: expected 1, found 7");
    }
}
