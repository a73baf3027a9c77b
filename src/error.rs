use std::io;
use thiserror::Error;

pub type WorkshopResult<T> = Result<T, WorkshopError>;

/// Errors raised while loading inputs or configuration.
///
/// Collecting an observation and evaluating it never fails; only the
/// surfaces that read files can.
#[derive(Error, Debug)]
pub enum WorkshopError {
    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot or report JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot is well-formed JSON but carries impossible values
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Scenario name not recognised
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

impl WorkshopError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        WorkshopError::InvalidConfig(msg.into())
    }

    /// Create a new invalid snapshot error
    pub fn invalid_snapshot<S: Into<String>>(msg: S) -> Self {
        WorkshopError::InvalidSnapshot(msg.into())
    }

    /// Create a new unknown scenario error
    pub fn unknown_scenario<S: Into<String>>(name: S) -> Self {
        WorkshopError::UnknownScenario(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WorkshopError::invalid_config("memory percent above 100");
        assert_eq!(err.to_string(), "Invalid configuration: memory percent above 100");

        let err = WorkshopError::unknown_scenario("cache-stampede");
        assert_eq!(err.to_string(), "Unknown scenario: cache-stampede");
    }

    #[test]
    fn test_io_error_conversion() {
        let err = WorkshopError::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(matches!(err, WorkshopError::Io(_)));
        assert_eq!(err.to_string(), "IO error: missing");
    }
}
