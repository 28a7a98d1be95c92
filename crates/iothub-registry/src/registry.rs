//! The device registry capability.

use async_trait::async_trait;
use serde_json::Value;

use crate::device::Device;
use crate::error::RegistryError;
use crate::twin::{Twin, TwinPage};

/// Operations offered by a remote device registry.
///
/// Each call is a single independent request/response exchange. Nothing is
/// serialized client-side, so concurrent calls for the same device race at
/// the service.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Registers a new device and returns it as stored by the service.
    ///
    /// Fails with [`RegistryError::Conflict`] if the id is already taken.
    async fn add_device(&self, device: Device) -> Result<Device, RegistryError>;

    /// Reads a device identity.
    async fn get_device(&self, device_id: &str) -> Result<Device, RegistryError>;

    /// Deletes a device.
    ///
    /// Fails with [`RegistryError::NotFound`] if the device is absent.
    async fn remove_device(&self, device_id: &str) -> Result<(), RegistryError>;

    /// Reads the twin of a device.
    async fn get_twin(&self, device_id: &str) -> Result<Twin, RegistryError>;

    /// Applies `patch` to a twin if its current ETag equals `etag`.
    ///
    /// Fails with [`RegistryError::Conflict`] if `etag` is stale.
    async fn update_twin(
        &self,
        device_id: &str,
        patch: &Value,
        etag: &str,
    ) -> Result<Twin, RegistryError>;

    /// Runs one page of a twin query.
    ///
    /// Pass the previous page's continuation token to continue; `None`
    /// starts from the beginning.
    async fn query_twins(
        &self,
        query: &str,
        page_size: Option<u32>,
        continuation: Option<&str>,
    ) -> Result<TwinPage, RegistryError>;
}
