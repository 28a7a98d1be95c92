//! HTTP client for the registry service.
//!
//! This module implements [`DeviceRegistry`] against the hub's REST API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, IF_MATCH};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::HubConfig;
use crate::device::Device;
use crate::error::RegistryError;
use crate::registry::DeviceRegistry;
use crate::sas::SharedAccessSignature;
use crate::twin::{Twin, TwinPage};

/// Request header carrying the query page size.
pub const MAX_ITEM_COUNT_HEADER: &str = "x-ms-max-item-count";

/// Request/response header carrying the query continuation token.
pub const CONTINUATION_HEADER: &str = "x-ms-continuation";

#[derive(Serialize)]
struct QuerySpecification<'a> {
    query: &'a str,
}

/// Client for a hub's device registry.
#[derive(Debug)]
pub struct RegistryClient {
    config: HubConfig,
    http: reqwest::Client,
}

impl RegistryClient {
    /// Creates a new registry client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use iothub_registry::{HubConfig, RegistryClient};
    ///
    /// let config = HubConfig::from_connection_string(
    ///     "HostName=contoso.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0",
    /// )?;
    /// let client = RegistryClient::new(config)?;
    /// # Ok::<(), iothub_registry::RegistryError>(())
    /// ```
    pub fn new(config: HubConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| RegistryError::InvalidConfig {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    /// Creates a client from a hub connection string.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, RegistryError> {
        Self::new(HubConfig::from_connection_string(connection_string)?)
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Builds `{endpoint}/{segments..}?api-version=..`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = Url::parse(&self.config.endpoint).map_err(|e| RegistryError::InvalidConfig {
            message: format!("invalid endpoint '{}': {e}", self.config.endpoint),
        })?;
        url.path_segments_mut()
            .map_err(|()| RegistryError::InvalidConfig {
                message: format!("endpoint '{}' cannot be a base URL", self.config.endpoint),
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, RegistryError> {
        Ok(self
            .http
            .request(method, self.url(segments)?)
            .headers(self.auth_headers()?))
    }

    /// Creates the authorization header with a freshly signed token.
    fn auth_headers(&self) -> Result<HeaderMap, RegistryError> {
        let ttl = chrono::Duration::from_std(self.config.token_ttl).map_err(|e| {
            RegistryError::InvalidConfig {
                message: format!("token lifetime out of range: {e}"),
            }
        })?;
        let token = SharedAccessSignature::generate(
            &self.config.host_name,
            &self.config.policy.key,
            Some(&self.config.policy.name),
            Utc::now() + ttl,
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&token.to_string()).map_err(|_| {
                RegistryError::Authentication {
                    message: "Invalid token".to_string(),
                }
            })?,
        );
        Ok(headers)
    }

    /// Maps a non-success response onto a registry error.
    async fn error_for(response: Response, device_id: &str) -> RegistryError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => RegistryError::not_found(device_id),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                RegistryError::conflict(format!("device '{device_id}': {status} {body}"))
            }
            _ => RegistryError::Transport {
                status: Some(status.as_u16()),
                message: format!("{status}: {body}"),
            },
        }
    }
}

#[async_trait]
impl DeviceRegistry for RegistryClient {
    async fn add_device(&self, device: Device) -> Result<Device, RegistryError> {
        let device_id = device.device_id.clone();
        tracing::debug!(device_id = %device_id, auth = %device.authentication.auth_type, "PUT device");

        let response = self
            .request(Method::PUT, &["devices", device_id.as_str()])?
            .json(&device)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &device_id).await);
        }

        let created: Device = response.json().await?;
        tracing::info!(device_id = %created.device_id, "Added device");
        Ok(created)
    }

    async fn get_device(&self, device_id: &str) -> Result<Device, RegistryError> {
        let response = self
            .request(Method::GET, &["devices", device_id])?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, device_id).await);
        }

        response.json().await.map_err(Into::into)
    }

    async fn remove_device(&self, device_id: &str) -> Result<(), RegistryError> {
        let response = self
            .request(Method::DELETE, &["devices", device_id])?
            .header(IF_MATCH, "\"*\"")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, device_id).await);
        }

        tracing::info!(device_id, "Removed device");
        Ok(())
    }

    async fn get_twin(&self, device_id: &str) -> Result<Twin, RegistryError> {
        let response = self
            .request(Method::GET, &["twins", device_id])?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, device_id).await);
        }

        response.json().await.map_err(Into::into)
    }

    async fn update_twin(
        &self,
        device_id: &str,
        patch: &Value,
        etag: &str,
    ) -> Result<Twin, RegistryError> {
        tracing::debug!(device_id, etag, "PATCH twin");

        let response = self
            .request(Method::PATCH, &["twins", device_id])?
            .header(IF_MATCH, format!("\"{}\"", etag.trim_matches('"')))
            .json(patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, device_id).await);
        }

        response.json().await.map_err(Into::into)
    }

    async fn query_twins(
        &self,
        query: &str,
        page_size: Option<u32>,
        continuation: Option<&str>,
    ) -> Result<TwinPage, RegistryError> {
        let mut request = self
            .request(Method::POST, &["devices", "query"])?
            .json(&QuerySpecification { query });

        if let Some(size) = page_size {
            request = request.header(MAX_ITEM_COUNT_HEADER, size.to_string());
        }
        if let Some(token) = continuation {
            request = request.header(CONTINUATION_HEADER, token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(RegistryError::Transport {
                status: Some(status.as_u16()),
                message: format!(
                    "query failed with {status}: {}",
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        let continuation_token = response
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(ToString::to_string);

        let twins: Vec<Twin> = response.json().await?;
        Ok(TwinPage {
            twins,
            continuation_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SharedAccessPolicy;

    fn client() -> RegistryClient {
        let config = HubConfig::new(
            "hub.azure-devices.net",
            SharedAccessPolicy::new("iothubowner", "c2VjcmV0"),
        );
        RegistryClient::new(config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = RegistryClient::from_connection_string(
            "HostName=hub.azure-devices.net;SharedAccessKeyName=owner;SharedAccessKey=c2VjcmV0",
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_url_includes_api_version() {
        let url = client().url(&["devices", "d1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://hub.azure-devices.net/devices/d1?api-version=2021-04-12"
        );
    }

    #[test]
    fn test_url_encodes_device_id() {
        let url = client().url(&["twins", "room 1/sensor"]).unwrap();
        assert_eq!(url.path(), "/twins/room%201%2Fsensor");
    }

    #[test]
    fn test_url_keeps_endpoint_prefix() {
        let config = HubConfig::new(
            "hub.azure-devices.net",
            SharedAccessPolicy::new("iothubowner", "c2VjcmV0"),
        )
        .with_endpoint("http://127.0.0.1:9000/hub");
        let client = RegistryClient::new(config).unwrap();
        let url = client.url(&["devices", "query"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/hub/devices/query?api-version=2021-04-12"
        );
    }

    #[test]
    fn test_auth_headers_carry_sas_token() {
        let headers = client().auth_headers().unwrap();
        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("SharedAccessSignature sr=hub.azure-devices.net"));
        assert!(auth.ends_with("&skn=iothubowner"));
    }

    #[test]
    fn test_auth_headers_reject_bad_key() {
        let config = HubConfig::new(
            "hub.azure-devices.net",
            SharedAccessPolicy::new("iothubowner", "***"),
        );
        let client = RegistryClient::new(config).unwrap();
        assert!(matches!(
            client.auth_headers(),
            Err(RegistryError::Authentication { .. })
        ));
    }
}
