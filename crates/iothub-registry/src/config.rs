//! Configuration types for the registry client.

use std::time::Duration;

use crate::connection_string::ConnectionString;
use crate::error::RegistryError;

/// REST API version sent with every registry request.
pub const DEFAULT_API_VERSION: &str = "2021-04-12";

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub host name (e.g., "contoso.azure-devices.net").
    pub host_name: String,

    /// Base URL for requests. Defaults to `https://{host_name}`.
    pub endpoint: String,

    /// Shared access policy used to sign requests.
    pub policy: SharedAccessPolicy,

    /// REST API version.
    pub api_version: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Lifetime of each generated SAS token.
    pub token_ttl: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl HubConfig {
    /// Creates a configuration for the given hub and access policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use iothub_registry::{HubConfig, SharedAccessPolicy};
    ///
    /// let config = HubConfig::new(
    ///     "contoso.azure-devices.net",
    ///     SharedAccessPolicy::new("iothubowner", "c2VjcmV0"),
    /// );
    /// assert_eq!(config.endpoint, "https://contoso.azure-devices.net");
    /// ```
    #[must_use]
    pub fn new(host_name: impl Into<String>, policy: SharedAccessPolicy) -> Self {
        let host_name = host_name.into();
        Self {
            endpoint: format!("https://{host_name}"),
            host_name,
            policy,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
            token_ttl: Duration::from_secs(3600),
            user_agent: format!("iothub-registry/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Builds a configuration from a hub connection string.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] if the string is malformed or lacks
    /// `HostName`, `SharedAccessKeyName` or `SharedAccessKey`.
    ///
    /// # Examples
    ///
    /// ```
    /// use iothub_registry::HubConfig;
    ///
    /// let config = HubConfig::from_connection_string(
    ///     "HostName=contoso.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0",
    /// )?;
    /// assert_eq!(config.host_name, "contoso.azure-devices.net");
    /// assert_eq!(config.policy.name, "iothubowner");
    /// # Ok::<(), iothub_registry::RegistryError>(())
    /// ```
    pub fn from_connection_string(connection_string: &str) -> Result<Self, RegistryError> {
        let cs = ConnectionString::parse(connection_string)?;
        let host_name = cs.require("HostName")?;
        let policy = SharedAccessPolicy::new(
            cs.require("SharedAccessKeyName")?,
            cs.require("SharedAccessKey")?,
        );
        Ok(Self::new(host_name, policy))
    }

    /// Overrides the base URL (e.g., a local test endpoint).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the REST API version.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the lifetime of generated SAS tokens.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

/// A named shared access policy and its key.
#[derive(Clone)]
pub struct SharedAccessPolicy {
    /// Policy name (e.g., "iothubowner", "registryReadWrite").
    pub name: String,

    /// Base64 policy key.
    pub key: String,
}

impl SharedAccessPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Debug for SharedAccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedAccessPolicy")
            .field("name", &self.name)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Certificate thumbprints used when registering self-signed devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateThumbprints {
    /// Primary thumbprint.
    pub primary: String,

    /// Secondary thumbprint.
    pub secondary: String,
}

impl CertificateThumbprints {
    /// Creates a thumbprint pair.
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONN: &str =
        "HostName=hub.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0";

    #[test]
    fn test_config_defaults() {
        let config = HubConfig::from_connection_string(CONN).unwrap();
        assert_eq!(config.host_name, "hub.azure-devices.net");
        assert_eq!(config.endpoint, "https://hub.azure-devices.net");
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_config_missing_policy_key() {
        let err = HubConfig::from_connection_string("HostName=hub;SharedAccessKeyName=owner")
            .unwrap_err();
        assert!(err.to_string().contains("SharedAccessKey"));
    }

    #[test]
    fn test_with_endpoint_trims_slash() {
        let config = HubConfig::from_connection_string(CONN)
            .unwrap()
            .with_endpoint("http://127.0.0.1:8080/");
        assert_eq!(config.endpoint, "http://127.0.0.1:8080");
        assert_eq!(config.host_name, "hub.azure-devices.net");
    }

    #[test]
    fn test_policy_debug_redacts_key() {
        let policy = SharedAccessPolicy::new("owner", "c2VjcmV0");
        let debug = format!("{policy:?}");
        assert!(debug.contains("owner"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}
