//! Error types for registry operations.

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The device already exists, or a twin update carried a stale ETag.
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message.
        message: String,
    },

    /// The device (or its twin) is not registered.
    #[error("Device not found: {device_id}")]
    NotFound {
        /// Device identifier.
        device_id: String,
    },

    /// Network failure or unexpected response from the registry service.
    #[error("Transport error: {message}")]
    Transport {
        /// HTTP status code, when a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// A connection string could not be parsed.
    #[error("Parse error: {message}")]
    Parse {
        /// Error message.
        message: String,
    },

    /// Shared access signature could not be produced.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    Json {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid client configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl RegistryError {
    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given device.
    #[must_use]
    pub fn not_found(device_id: impl Into<String>) -> Self {
        Self::NotFound {
            device_id: device_id.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Returns true for duplicate adds and stale ETags.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns true when the device is not registered.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Transport {
                status: None,
                message: format!(
                    "Failed to connect to {}: {err}",
                    err.url()
                        .map_or_else(|| "unknown".to_string(), ToString::to_string)
                ),
            }
        } else {
            Self::Transport {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json { source: err }
    }
}
