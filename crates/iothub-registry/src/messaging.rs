//! Hand-off to a device messaging collaborator.
//!
//! The registry sample provisions a device and passes its connection string
//! to something that talks to the hub *as that device*. The collaborator is
//! abstract here; callers plug in their own.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::connection_string::DeviceConnectionString;

/// Transport a device client should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceTransport {
    /// AMQP over TCP.
    #[default]
    Amqp,
    /// AMQP over WebSocket.
    AmqpWebSocket,
    /// MQTT over TCP.
    Mqtt,
    /// MQTT over WebSocket.
    MqttWebSocket,
    /// HTTPS.
    Http,
}

impl DeviceTransport {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Amqp => "amqp",
            Self::AmqpWebSocket => "amqp-ws",
            Self::Mqtt => "mqtt",
            Self::MqttWebSocket => "mqtt-ws",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for DeviceTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceTransport {
    type Err = MessagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "amqp" => Ok(Self::Amqp),
            "amqp-ws" | "amqp_websocket_only" => Ok(Self::AmqpWebSocket),
            "mqtt" => Ok(Self::Mqtt),
            "mqtt-ws" | "mqtt_websocket_only" => Ok(Self::MqttWebSocket),
            "http" | "http1" | "https" => Ok(Self::Http),
            _ => Err(MessagingError::UnsupportedTransport {
                transport: s.to_string(),
            }),
        }
    }
}

/// Errors raised by a messaging collaborator.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The collaborator failed while running.
    #[error("Messaging sample failed: {message}")]
    Failed {
        /// Error message.
        message: String,
    },

    /// The transport name is unknown or unsupported.
    #[error("Unsupported device transport: {transport}")]
    UnsupportedTransport {
        /// Transport name.
        transport: String,
    },
}

impl MessagingError {
    /// Creates a generic failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Something that runs device-side messaging with a device connection string.
#[async_trait]
pub trait MessagingSample: Send + Sync {
    /// Runs the collaborator to completion.
    async fn run(
        &self,
        connection: &DeviceConnectionString,
        transport: DeviceTransport,
    ) -> Result<(), MessagingError>;
}
