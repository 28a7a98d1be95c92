//! Fixture builders for devices, twins and connection strings.
//!
//! # Examples
//!
//! ```rust
//! use iothub_test::{hub_connection_string, MockDevice};
//!
//! let (device, twin) = MockDevice::new("thermostat-1")
//!     .connected()
//!     .with_desired("targetTemperature", 21)
//!     .build();
//!
//! assert_eq!(device.device_id, twin.device_id);
//! assert!(hub_connection_string().starts_with("HostName="));
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;

use iothub_registry::{AuthenticationMechanism, ConnectionState, Device, SymmetricKey, Twin};

/// Host name used by [`hub_connection_string`].
pub const TEST_HOST: &str = "test-hub.azure-devices.net";

/// Policy name used by [`hub_connection_string`].
pub const TEST_POLICY: &str = "iothubowner";

/// Base64 key used by [`hub_connection_string`] and [`MockDevice`].
pub const TEST_KEY: &str = "dGVzdC1zaGFyZWQtYWNjZXNzLWtleQ==";

/// Returns a well-formed hub connection string for [`TEST_HOST`].
#[must_use]
pub fn hub_connection_string() -> String {
    format!("HostName={TEST_HOST};SharedAccessKeyName={TEST_POLICY};SharedAccessKey={TEST_KEY}")
}

/// Builder for a device and its twin, for seeding registries.
#[derive(Debug, Clone)]
pub struct MockDevice {
    device_id: String,
    etag: String,
    connection_state: ConnectionState,
    last_activity_time: Option<DateTime<Utc>>,
    desired: serde_json::Map<String, Value>,
    authentication: AuthenticationMechanism,
}

impl MockDevice {
    /// Creates a disconnected, never seen device with a symmetric key.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        let mut authentication = AuthenticationMechanism::sas();
        authentication.symmetric_key = Some(SymmetricKey {
            primary_key: Some(TEST_KEY.to_string()),
            secondary_key: Some(TEST_KEY.to_string()),
        });
        Self {
            device_id: device_id.into(),
            etag: "AAAAAAAAAAE=".to_string(),
            connection_state: ConnectionState::Disconnected,
            last_activity_time: None,
            desired: serde_json::Map::new(),
            authentication,
        }
    }

    /// Marks the device connected and seen now.
    #[must_use]
    pub fn connected(mut self) -> Self {
        self.connection_state = ConnectionState::Connected;
        self.last_activity_time = Some(Utc::now());
        self
    }

    /// Sets the last activity time.
    #[must_use]
    pub const fn last_seen(mut self, at: DateTime<Utc>) -> Self {
        self.last_activity_time = Some(at);
        self
    }

    /// Sets the twin ETag.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = etag.into();
        self
    }

    /// Adds a desired property.
    #[must_use]
    pub fn with_desired(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.desired.insert(key.into(), value.into());
        self
    }

    /// Replaces the authentication mechanism.
    #[must_use]
    pub fn with_authentication(mut self, authentication: AuthenticationMechanism) -> Self {
        self.authentication = authentication;
        self
    }

    /// Builds the device and its twin.
    #[must_use]
    pub fn build(self) -> (Device, Twin) {
        let mut device = Device::new(&self.device_id).with_authentication(self.authentication);
        device.connection_state = self.connection_state;
        device.last_activity_time = self.last_activity_time;
        device.etag = Some(self.etag.clone());

        let mut twin = Twin::new(&self.device_id, self.etag);
        twin.version = Some(1);
        twin.connection_state = self.connection_state;
        twin.last_activity_time = self.last_activity_time;
        twin.properties.desired = Value::Object(self.desired);

        (device, twin)
    }
}
