//! Messaging collaborators for driving the sample in tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use iothub_registry::{DeviceConnectionString, DeviceTransport, MessagingError, MessagingSample};

/// Records every hand-off and succeeds.
#[derive(Debug, Default)]
pub struct RecordingMessaging {
    runs: Mutex<Vec<(DeviceConnectionString, DeviceTransport)>>,
}

impl RecordingMessaging {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded hand-offs in order.
    #[must_use]
    pub fn runs(&self) -> Vec<(DeviceConnectionString, DeviceTransport)> {
        self.runs.lock().clone()
    }

    /// Returns the most recent connection string.
    #[must_use]
    pub fn last_connection(&self) -> Option<DeviceConnectionString> {
        self.runs.lock().last().map(|(connection, _)| connection.clone())
    }
}

#[async_trait]
impl MessagingSample for RecordingMessaging {
    async fn run(
        &self,
        connection: &DeviceConnectionString,
        transport: DeviceTransport,
    ) -> Result<(), MessagingError> {
        self.runs.lock().push((connection.clone(), transport));
        Ok(())
    }
}

/// Always fails with the configured message.
#[derive(Debug, Clone)]
pub struct FailingMessaging {
    message: String,
}

impl FailingMessaging {
    /// Creates a collaborator failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl MessagingSample for FailingMessaging {
    async fn run(
        &self,
        connection: &DeviceConnectionString,
        _transport: DeviceTransport,
    ) -> Result<(), MessagingError> {
        tracing::debug!(device_id = %connection.device_id, "Injected messaging failure");
        Err(MessagingError::failed(self.message.clone()))
    }
}
