//! In-memory device registry.
//!
//! [`InMemoryRegistry`] implements [`DeviceRegistry`] with the same
//! observable contract as the hub: duplicate adds conflict, unknown ids are
//! not found, twin updates are guarded by ETags and queries are paged with
//! continuation tokens. Every call is recorded so tests can assert on the
//! exact sequence of registry operations.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use iothub_registry::twin::merge_patch;
use iothub_registry::{
    AuthenticationType, Device, DeviceRegistry, RegistryError, SymmetricKey, Twin, TwinPage,
    ALL_DEVICES_QUERY,
};

/// Registry operation kinds, for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `add_device`.
    AddDevice,
    /// `get_device`.
    GetDevice,
    /// `remove_device`.
    RemoveDevice,
    /// `get_twin`.
    GetTwin,
    /// `update_twin`.
    UpdateTwin,
    /// `query_twins`.
    QueryTwins,
}

/// A recorded registry call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCall {
    /// Operation invoked.
    pub operation: Operation,
    /// Device the call addressed, if any.
    pub device_id: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    devices: BTreeMap<String, Device>,
    twins: BTreeMap<String, Twin>,
    calls: Vec<RegistryCall>,
    failures: HashMap<Operation, String>,
    lost_responses: HashMap<Operation, String>,
    etag_counter: u64,
}

impl State {
    fn next_etag(&mut self) -> String {
        self.etag_counter += 1;
        format!("AAAAAAAAAA{}=", self.etag_counter)
    }

    /// Fails a call whose effect has already been applied.
    fn respond(&self, operation: Operation) -> Result<(), RegistryError> {
        self.lost_responses
            .get(&operation)
            .map_or(Ok(()), |message| {
                Err(RegistryError::Transport {
                    status: None,
                    message: message.clone(),
                })
            })
    }
}

/// Device registry held entirely in memory.
#[derive(Debug)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
    default_page_size: usize,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    /// Creates an empty registry returning up to 100 twins per page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            default_page_size: 100,
        }
    }

    /// Sets the page size used when a query does not ask for one.
    #[must_use]
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    /// Inserts a device and its twin directly, bypassing conflict checks.
    pub fn seed(&self, device: Device, twin: Twin) {
        let mut state = self.state.lock();
        state.twins.insert(device.device_id.clone(), twin);
        state.devices.insert(device.device_id.clone(), device);
    }

    /// Makes every subsequent call of `operation` fail with a transport error.
    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        self.state.lock().failures.insert(operation, message.into());
    }

    /// Makes every subsequent call of `operation` take effect and then fail
    /// with a transport error, as when the response is lost.
    pub fn lose_response(&self, operation: Operation, message: impl Into<String>) {
        self.state
            .lock()
            .lost_responses
            .insert(operation, message.into());
    }

    /// Stops injecting failures and lost responses for `operation`.
    pub fn recover(&self, operation: Operation) {
        let mut state = self.state.lock();
        state.failures.remove(&operation);
        state.lost_responses.remove(&operation);
    }

    /// Returns all recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.lock().calls.clone()
    }

    /// Counts recorded calls of `operation` addressing `device_id`.
    #[must_use]
    pub fn call_count(&self, operation: Operation, device_id: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation && c.device_id.as_deref() == Some(device_id))
            .count()
    }

    /// Returns a stored device.
    #[must_use]
    pub fn device(&self, device_id: &str) -> Option<Device> {
        self.state.lock().devices.get(device_id).cloned()
    }

    /// Returns a stored twin.
    #[must_use]
    pub fn twin(&self, device_id: &str) -> Option<Twin> {
        self.state.lock().twins.get(device_id).cloned()
    }

    /// Returns the number of registered devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.state.lock().devices.len()
    }

    /// Records the call and returns the injected failure, if any.
    fn enter(&self, operation: Operation, device_id: Option<&str>) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        state.calls.push(RegistryCall {
            operation,
            device_id: device_id.map(ToString::to_string),
        });
        state
            .failures
            .get(&operation)
            .map_or(Ok(()), |message| {
                Err(RegistryError::Transport {
                    status: Some(503),
                    message: message.clone(),
                })
            })
    }
}

fn generated_key() -> String {
    // 32 hex characters are valid, unpadded base64
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl DeviceRegistry for InMemoryRegistry {
    async fn add_device(&self, mut device: Device) -> Result<Device, RegistryError> {
        self.enter(Operation::AddDevice, Some(&device.device_id))?;
        let mut state = self.state.lock();

        if state.devices.contains_key(&device.device_id) {
            return Err(RegistryError::conflict(format!(
                "device '{}' already exists",
                device.device_id
            )));
        }

        if device.authentication.auth_type == AuthenticationType::Sas {
            let keys = device
                .authentication
                .symmetric_key
                .get_or_insert_with(SymmetricKey::default);
            if keys.primary_key.is_none() {
                keys.primary_key = Some(generated_key());
            }
            if keys.secondary_key.is_none() {
                keys.secondary_key = Some(generated_key());
            }
        }
        device.generation_id = Some(Uuid::new_v4().simple().to_string());
        device.etag = Some(state.next_etag());

        let mut twin = Twin::new(&device.device_id, state.next_etag());
        twin.version = Some(1);
        twin.status = device.status;

        tracing::debug!(device_id = %device.device_id, "In-memory device added");
        state.twins.insert(device.device_id.clone(), twin);
        state.devices.insert(device.device_id.clone(), device.clone());
        state.respond(Operation::AddDevice)?;
        Ok(device)
    }

    async fn get_device(&self, device_id: &str) -> Result<Device, RegistryError> {
        self.enter(Operation::GetDevice, Some(device_id))?;
        self.device(device_id)
            .ok_or_else(|| RegistryError::not_found(device_id))
    }

    async fn remove_device(&self, device_id: &str) -> Result<(), RegistryError> {
        self.enter(Operation::RemoveDevice, Some(device_id))?;
        let mut state = self.state.lock();
        state.twins.remove(device_id);
        if state.devices.remove(device_id).is_none() {
            return Err(RegistryError::not_found(device_id));
        }
        state.respond(Operation::RemoveDevice)
    }

    async fn get_twin(&self, device_id: &str) -> Result<Twin, RegistryError> {
        self.enter(Operation::GetTwin, Some(device_id))?;
        self.twin(device_id)
            .ok_or_else(|| RegistryError::not_found(device_id))
    }

    async fn update_twin(
        &self,
        device_id: &str,
        patch: &Value,
        etag: &str,
    ) -> Result<Twin, RegistryError> {
        self.enter(Operation::UpdateTwin, Some(device_id))?;
        let mut state = self.state.lock();
        let new_etag = state.next_etag();

        let twin = state
            .twins
            .get_mut(device_id)
            .ok_or_else(|| RegistryError::not_found(device_id))?;

        let expected = etag.trim_matches('"');
        if expected != "*" && expected != twin.etag {
            return Err(RegistryError::conflict(format!(
                "ETag '{expected}' is stale for device '{device_id}' (current '{}')",
                twin.etag
            )));
        }

        if let Some(desired) = patch.pointer("/properties/desired") {
            merge_patch(&mut twin.properties.desired, desired);
        }
        twin.etag = new_etag;
        twin.version = Some(twin.version.unwrap_or(0) + 1);
        Ok(twin.clone())
    }

    async fn query_twins(
        &self,
        query: &str,
        page_size: Option<u32>,
        continuation: Option<&str>,
    ) -> Result<TwinPage, RegistryError> {
        self.enter(Operation::QueryTwins, None)?;

        if !query.trim().eq_ignore_ascii_case(ALL_DEVICES_QUERY) {
            return Err(RegistryError::Transport {
                status: Some(400),
                message: format!("unsupported query '{query}'"),
            });
        }

        let start = match continuation {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| RegistryError::Transport {
                status: Some(400),
                message: format!("invalid continuation token '{token}'"),
            })?,
        };
        let page_size = page_size.map_or(self.default_page_size, |size| size.max(1) as usize);

        let state = self.state.lock();
        let twins: Vec<Twin> = state
            .twins
            .values()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();
        let next = start + twins.len();
        let continuation_token = (next < state.twins.len()).then(|| next.to_string());

        Ok(TwinPage {
            twins,
            continuation_token,
        })
    }
}
