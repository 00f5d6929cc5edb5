use thiserror::Error;

use crate::models::InstanceId;

/// Main playback error type
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Instance {0} has no source factory (destroyed or never initialized)")]
    Detached(InstanceId),
}

impl PlaybackError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::Source(err) => err.user_message(),
            PlaybackError::Detached(id) => {
                format!("Sound instance {} was released and cannot play until it is acquired again", id)
            }
        }
    }

    /// Check if retrying the same call could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlaybackError::Source(err) => err.is_recoverable(),
            PlaybackError::Detached(_) => false, // Needs a fresh acquire from the pool
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlaybackError::Source(SourceError::Unavailable(_)) => ErrorSeverity::Warning,
            PlaybackError::Source(_) => ErrorSeverity::Error,
            PlaybackError::Detached(_) => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Errors raised by a source factory while minting a source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid source duration: {seconds}s")]
    InvalidDuration { seconds: f64 },

    #[error("Audio backend error: {0}")]
    Backend(String),
}

impl SourceError {
    pub fn user_message(&self) -> String {
        match self {
            SourceError::Unavailable(msg) => format!("The sound could not be prepared: {}", msg),
            SourceError::InvalidDuration { seconds } => {
                format!("The sound reports an unusable length of {:.2}s", seconds)
            }
            SourceError::Backend(msg) => format!("The audio backend failed: {}", msg),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => "Could not locate the home configuration directory".to_string(),
            ConfigError::IoError(err) => format!("Could not read or write the configuration file: {}", err),
            ConfigError::SerializationError(_) => "Could not save configuration".to_string(),
            ConfigError::DeserializationError(_) => "Configuration file is invalid - using defaults".to_string(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        // Defaults are always usable
        true
    }
}
