//! Device identity types.
//!
//! These mirror the registry service's JSON representation of a device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a device authenticates against the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthenticationType {
    /// Shared symmetric keys.
    #[default]
    Sas,
    /// Self-signed X.509 certificate identified by thumbprint.
    SelfSigned,
    /// X.509 certificate chained to a trusted certificate authority.
    CertificateAuthority,
    /// No authentication configured.
    None,
}

impl std::fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sas => "sas",
            Self::SelfSigned => "selfSigned",
            Self::CertificateAuthority => "certificateAuthority",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// Primary and secondary symmetric keys.
///
/// Leaving both keys empty asks the service to generate them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetricKey {
    /// Primary key (base64).
    pub primary_key: Option<String>,
    /// Secondary key (base64).
    pub secondary_key: Option<String>,
}

/// Primary and secondary X.509 certificate thumbprints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Thumbprint {
    /// Primary thumbprint.
    pub primary_thumbprint: Option<String>,
    /// Secondary thumbprint.
    pub secondary_thumbprint: Option<String>,
}

impl X509Thumbprint {
    fn is_empty(&self) -> bool {
        self.primary_thumbprint.is_none() && self.secondary_thumbprint.is_none()
    }
}

/// Authentication descriptor of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationMechanism {
    /// Authentication type.
    #[serde(rename = "type", default)]
    pub auth_type: AuthenticationType,

    /// Symmetric keys, for [`AuthenticationType::Sas`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric_key: Option<SymmetricKey>,

    /// Thumbprints, for [`AuthenticationType::SelfSigned`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509_thumbprint: Option<X509Thumbprint>,
}

impl AuthenticationMechanism {
    /// Symmetric key authentication with service-generated keys.
    #[must_use]
    pub fn sas() -> Self {
        Self {
            auth_type: AuthenticationType::Sas,
            symmetric_key: Some(SymmetricKey::default()),
            x509_thumbprint: None,
        }
    }

    /// Self-signed certificate authentication with the given thumbprints.
    #[must_use]
    pub fn self_signed(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            auth_type: AuthenticationType::SelfSigned,
            symmetric_key: None,
            x509_thumbprint: Some(X509Thumbprint {
                primary_thumbprint: Some(primary.into()),
                secondary_thumbprint: Some(secondary.into()),
            }),
        }
    }

    /// Certificate authority authentication; no thumbprint is stored.
    #[must_use]
    pub const fn certificate_authority() -> Self {
        Self {
            auth_type: AuthenticationType::CertificateAuthority,
            symmetric_key: None,
            x509_thumbprint: None,
        }
    }

    /// Returns the thumbprints, ignoring an all-null placeholder.
    #[must_use]
    pub fn thumbprint(&self) -> Option<&X509Thumbprint> {
        self.x509_thumbprint.as_ref().filter(|t| !t.is_empty())
    }

    /// Returns the primary symmetric key if one was assigned.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.symmetric_key
            .as_ref()
            .and_then(|k| k.primary_key.as_deref())
            .filter(|k| !k.is_empty())
    }
}

/// Whether the device may connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceStatus {
    /// Device may connect.
    #[default]
    Enabled,
    /// Device is blocked.
    Disabled,
}

/// Last observed connection state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No active connection.
    #[default]
    Disconnected,
    /// Device is connected.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connected => f.write_str("Connected"),
        }
    }
}

/// A device registered in the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique device identifier.
    pub device_id: String,

    /// Service-assigned generation, distinguishes re-created devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<String>,

    /// Version tag of the device identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Whether the device may connect.
    #[serde(default)]
    pub status: DeviceStatus,

    /// Last known connection state.
    #[serde(default)]
    pub connection_state: ConnectionState,

    /// Time of the last activity seen by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_time: Option<DateTime<Utc>>,

    /// Authentication descriptor.
    #[serde(default)]
    pub authentication: AuthenticationMechanism,
}

impl Device {
    /// Creates a device with default symmetric key authentication.
    ///
    /// # Examples
    ///
    /// ```
    /// use iothub_registry::{AuthenticationType, Device};
    ///
    /// let device = Device::new("thermostat-1");
    /// assert_eq!(device.authentication.auth_type, AuthenticationType::Sas);
    /// ```
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            generation_id: None,
            etag: None,
            status: DeviceStatus::Enabled,
            connection_state: ConnectionState::Disconnected,
            last_activity_time: None,
            authentication: AuthenticationMechanism::sas(),
        }
    }

    /// Replaces the authentication descriptor.
    #[must_use]
    pub fn with_authentication(mut self, authentication: AuthenticationMechanism) -> Self {
        self.authentication = authentication;
        self
    }
}
