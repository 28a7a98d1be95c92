//! Connection string parsing.
//!
//! IoT Hub connection strings are semicolon-delimited `Key=Value` pairs, for
//! example `HostName=contoso.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=...`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

const HOST_NAME: &str = "HostName";
const SHARED_ACCESS_KEY_NAME: &str = "SharedAccessKeyName";
const SHARED_ACCESS_KEY: &str = "SharedAccessKey";
const DEVICE_ID: &str = "DeviceId";

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    values: BTreeMap<String, String>,
}

impl ConnectionString {
    /// Parses a connection string.
    ///
    /// Only the first `=` of each segment separates key from value, so
    /// base64 padding in keys survives. Empty segments are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] if a segment has no `=` or an empty key.
    ///
    /// # Examples
    ///
    /// ```
    /// use iothub_registry::ConnectionString;
    ///
    /// let cs = ConnectionString::parse("HostName=hub.azure-devices.net;SharedAccessKey=a2V5==")?;
    /// assert_eq!(cs.host_name(), Some("hub.azure-devices.net"));
    /// assert_eq!(cs.shared_access_key(), Some("a2V5=="));
    /// # Ok::<(), iothub_registry::RegistryError>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let mut values = BTreeMap::new();

        for segment in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                RegistryError::parse(format!("segment '{segment}' is not a Key=Value pair"))
            })?;
            if key.is_empty() {
                return Err(RegistryError::parse(format!(
                    "segment '{segment}' has an empty key"
                )));
            }
            values.insert(key.to_string(), value.to_string());
        }

        Ok(Self { values })
    }

    /// Returns the value for an arbitrary key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the `HostName` value.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.get(HOST_NAME)
    }

    /// Returns the `SharedAccessKeyName` value.
    #[must_use]
    pub fn shared_access_key_name(&self) -> Option<&str> {
        self.get(SHARED_ACCESS_KEY_NAME)
    }

    /// Returns the `SharedAccessKey` value.
    #[must_use]
    pub fn shared_access_key(&self) -> Option<&str> {
        self.get(SHARED_ACCESS_KEY)
    }

    /// Returns the `DeviceId` value.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.get(DEVICE_ID)
    }

    /// Returns the value for `key`, or a parse error naming the missing key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] if the key is absent.
    pub fn require(&self, key: &str) -> Result<&str, RegistryError> {
        self.get(key)
            .ok_or_else(|| RegistryError::parse(format!("connection string is missing '{key}'")))
    }
}

impl FromStr for ConnectionString {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Extracts the hub host name from a connection string.
///
/// Returns the first non-empty run of characters up to the next `;` that
/// follows a `HostName=` marker. The rest of the string is not validated.
///
/// # Errors
///
/// Returns [`RegistryError::Parse`] if no `HostName=` value is present.
///
/// # Examples
///
/// ```
/// use iothub_registry::extract_host_name;
///
/// let host = extract_host_name("HostName=foo.azure-devices.net;SharedAccessKey=x")?;
/// assert_eq!(host, "foo.azure-devices.net");
/// assert!(extract_host_name("NoHostNameHere").is_err());
/// # Ok::<(), iothub_registry::RegistryError>(())
/// ```
pub fn extract_host_name(connection_string: &str) -> Result<String, RegistryError> {
    const MARKER: &str = "HostName=";

    connection_string
        .match_indices(MARKER)
        .map(|(idx, _)| {
            let rest = &connection_string[idx + MARKER.len()..];
            rest.split(';').next().unwrap_or_default()
        })
        .find(|host| !host.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| RegistryError::parse("no HostName value in connection string"))
}

/// Connection string scoped to a single device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConnectionString {
    /// Hub host name.
    pub host_name: String,
    /// Device identifier.
    pub device_id: String,
    /// Device symmetric key (base64).
    pub shared_access_key: String,
}

impl DeviceConnectionString {
    /// Creates a device-scoped connection string.
    #[must_use]
    pub fn new(
        host_name: impl Into<String>,
        device_id: impl Into<String>,
        shared_access_key: impl Into<String>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            device_id: device_id.into(),
            shared_access_key: shared_access_key.into(),
        }
    }
}

impl fmt::Display for DeviceConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{HOST_NAME}={};{DEVICE_ID}={};{SHARED_ACCESS_KEY}={}",
            self.host_name, self.device_id, self.shared_access_key
        )
    }
}
