//! Shared access signature tokens.
//!
//! Requests to the registry service are authorized with a token signed by a
//! shared access policy key:
//!
//! ```text
//! SharedAccessSignature sr={resource}&sig={signature}&se={expiry}&skn={policy}
//! ```
//!
//! The signature is `base64(HMAC-SHA256(key, "{resource}\n{expiry}"))` where
//! the resource is the URL-encoded, lowercased resource URI.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::RegistryError;

type HmacSha256 = Hmac<Sha256>;

/// A signed shared access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedAccessSignature {
    resource: String,
    signature: String,
    expiry: i64,
    policy_name: Option<String>,
}

impl SharedAccessSignature {
    /// Signs a token for `resource_uri` that expires at `expiry`.
    ///
    /// `key` is the base64-encoded policy (or device) key. `policy_name` is
    /// required for hub-level policies and omitted for device keys.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Authentication`] if the key is not valid base64.
    pub fn generate(
        resource_uri: &str,
        key: &str,
        policy_name: Option<&str>,
        expiry: DateTime<Utc>,
    ) -> Result<Self, RegistryError> {
        let key_bytes = STANDARD
            .decode(key)
            .map_err(|e| RegistryError::Authentication {
                message: format!("shared access key is not valid base64: {e}"),
            })?;

        let resource = url_encode(&resource_uri.to_lowercase());
        let expiry = expiry.timestamp();

        let mut mac =
            HmacSha256::new_from_slice(&key_bytes).map_err(|e| RegistryError::Authentication {
                message: format!("invalid signing key: {e}"),
            })?;
        mac.update(format!("{resource}\n{expiry}").as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(Self {
            resource,
            signature,
            expiry,
            policy_name: policy_name.map(ToString::to_string),
        })
    }

    /// Returns the expiry as unix seconds.
    #[must_use]
    pub const fn expiry(&self) -> i64 {
        self.expiry
    }

    /// Returns the base64 signature (not URL-encoded).
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl fmt::Display for SharedAccessSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SharedAccessSignature sr={}&sig={}&se={}",
            self.resource,
            url_encode(&self.signature),
            self.expiry
        )?;
        if let Some(ref policy) = self.policy_name {
            write!(f, "&skn={}", url_encode(policy))?;
        }
        Ok(())
    }
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn expiry() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_token_layout() {
        let token = SharedAccessSignature::generate(
            "Hub.Azure-Devices.net",
            "c2VjcmV0",
            Some("iothubowner"),
            expiry(),
        )
        .unwrap()
        .to_string();

        assert!(token.starts_with("SharedAccessSignature sr=hub.azure-devices.net&sig="));
        assert!(token.contains("&se=1700000000"));
        assert!(token.ends_with("&skn=iothubowner"));
    }

    #[test]
    fn test_device_token_has_no_policy() {
        let token = SharedAccessSignature::generate(
            "hub.azure-devices.net/devices/dev-1",
            "c2VjcmV0",
            None,
            expiry(),
        )
        .unwrap()
        .to_string();

        assert!(token.contains("sr=hub.azure-devices.net%2Fdevices%2Fdev-1"));
        assert!(!token.contains("skn="));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = SharedAccessSignature::generate("hub", "c2VjcmV0", None, expiry()).unwrap();
        let b = SharedAccessSignature::generate("hub", "c2VjcmV0", None, expiry()).unwrap();
        let c = SharedAccessSignature::generate("hub", "b3RoZXI=", None, expiry()).unwrap();

        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
        // HMAC-SHA256 output is 32 bytes, 44 chars in padded base64
        assert_eq!(a.signature().len(), 44);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let err = SharedAccessSignature::generate("hub", "not base64!", None, expiry()).unwrap_err();
        assert!(matches!(err, RegistryError::Authentication { .. }));
    }
}
