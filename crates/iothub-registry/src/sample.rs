//! Registry manager sample.
//!
//! [`RegistryManagerSample`] wraps a [`DeviceRegistry`] handle and runs the
//! typical provisioning workflow: register a device, hand its connection
//! string to a messaging collaborator, and remove it again.

use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CertificateThumbprints;
use crate::connection_string::{extract_host_name, DeviceConnectionString};
use crate::device::{AuthenticationMechanism, Device};
use crate::error::RegistryError;
use crate::messaging::{DeviceTransport, MessagingError, MessagingSample};
use crate::query::{TwinQuery, ALL_DEVICES_QUERY};
use crate::registry::DeviceRegistry;
use crate::reporter::{ConsoleReporter, SampleReporter};
use crate::twin::{desired_properties_patch, Twin};

/// Prefix of device ids generated by [`RegistryManagerSample::run_sample`].
pub const DEVICE_ID_PREFIX: &str = "RegistryManagerSample_Device";

/// Desired properties merged by [`RegistryManagerSample::update_desired_properties`].
#[must_use]
pub fn custom_desired_properties() -> Value {
    json!({ "customKey": "customValue" })
}

/// Errors from the sample workflow.
#[derive(Debug, Error)]
pub enum SampleError {
    /// A registry call failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The messaging collaborator failed.
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    /// No registry handle was supplied.
    #[error("A device registry handle is required")]
    MissingRegistry,

    /// No hub connection string was supplied.
    #[error("A hub connection string is required")]
    MissingConnectionString,

    /// The created device has no symmetric key to build a connection string from.
    #[error("Device '{device_id}' has no primary symmetric key")]
    MissingSymmetricKey {
        /// Device identifier.
        device_id: String,
    },

    /// The workflow failed and removing the device failed too.
    #[error("{original}; removing device '{device_id}' also failed: {cleanup}")]
    CleanupFailed {
        /// Device that could not be removed.
        device_id: String,
        /// The error that aborted the workflow.
        #[source]
        original: Box<SampleError>,
        /// The error from the removal.
        cleanup: RegistryError,
    },
}

/// Client facade over a device registry.
pub struct RegistryManagerSample {
    registry: Arc<dyn DeviceRegistry>,
    connection_string: String,
    thumbprints: CertificateThumbprints,
    transport: DeviceTransport,
    reporter: Arc<dyn SampleReporter>,
}

impl RegistryManagerSample {
    /// Creates a sample with console progress output and AMQP transport.
    #[must_use]
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        connection_string: impl Into<String>,
        thumbprints: CertificateThumbprints,
    ) -> Self {
        Self {
            registry,
            connection_string: connection_string.into(),
            thumbprints,
            transport: DeviceTransport::default(),
            reporter: Arc::new(ConsoleReporter::new()),
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> RegistryManagerSampleBuilder {
        RegistryManagerSampleBuilder::default()
    }

    /// Returns the configured thumbprints.
    #[must_use]
    pub const fn thumbprints(&self) -> &CertificateThumbprints {
        &self.thumbprints
    }

    /// Returns the transport handed to the messaging collaborator.
    #[must_use]
    pub const fn transport(&self) -> DeviceTransport {
        self.transport
    }

    /// Replaces the transport handed to the messaging collaborator.
    #[must_use]
    pub fn with_transport(mut self, transport: DeviceTransport) -> Self {
        self.transport = transport;
        self
    }

    async fn step<T, F>(&self, message: String, call: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, RegistryError>>,
    {
        self.reporter.step_started(&message);
        let result = call.await;
        self.reporter
            .step_finished(if result.is_ok() { "DONE" } else { "FAILED" });
        result
    }

    /// Registers a device with symmetric key authentication.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Conflict`] if the id exists, or a transport error.
    pub async fn add_device(&self, device_id: &str) -> Result<Device, RegistryError> {
        self.step(
            format!("Adding device '{device_id}' with default authentication"),
            self.registry.add_device(Device::new(device_id)),
        )
        .await
    }

    /// Registers a device authenticated by a self-signed certificate.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Conflict`] if the id exists, or a transport error.
    pub async fn add_device_with_self_signed_certificate(
        &self,
        device_id: &str,
        primary_thumbprint: &str,
        secondary_thumbprint: &str,
    ) -> Result<(), RegistryError> {
        let device = Device::new(device_id).with_authentication(
            AuthenticationMechanism::self_signed(primary_thumbprint, secondary_thumbprint),
        );
        self.step(
            format!("Adding device '{device_id}' with self signed certificate auth"),
            self.registry.add_device(device),
        )
        .await
        .map(drop)
    }

    /// Registers a self-signed device using the configured thumbprints.
    ///
    /// # Errors
    ///
    /// Same as [`add_device_with_self_signed_certificate`](Self::add_device_with_self_signed_certificate).
    pub async fn add_device_with_configured_thumbprints(
        &self,
        device_id: &str,
    ) -> Result<(), RegistryError> {
        self.add_device_with_self_signed_certificate(
            device_id,
            &self.thumbprints.primary,
            &self.thumbprints.secondary,
        )
        .await
    }

    /// Registers a device trusting a CA-issued certificate chain.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Conflict`] if the id exists, or a transport error.
    pub async fn add_device_with_certificate_authority(
        &self,
        device_id: &str,
    ) -> Result<(), RegistryError> {
        let device = Device::new(device_id)
            .with_authentication(AuthenticationMechanism::certificate_authority());
        self.step(
            format!("Adding device '{device_id}' with CA authentication"),
            self.registry.add_device(device),
        )
        .await
        .map(drop)
    }

    /// Removes a device.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if the device is absent, or a transport error.
    pub async fn remove_device(&self, device_id: &str) -> Result<(), RegistryError> {
        self.step(
            format!("Remove device '{device_id}'"),
            self.registry.remove_device(device_id),
        )
        .await
    }

    /// Starts a lazy enumeration of all device twins.
    ///
    /// Every call issues the query again from the start.
    #[must_use]
    pub fn enumerate_twins(&self) -> TwinQuery {
        TwinQuery::new(Arc::clone(&self.registry), ALL_DEVICES_QUERY)
    }

    /// Enumerates all twins, reporting each one, and returns how many were seen.
    ///
    /// # Errors
    ///
    /// Returns the first registry error.
    pub async fn print_twins(&self) -> Result<usize, RegistryError> {
        self.reporter.heading("Querying devices:");

        let mut query = self.enumerate_twins();
        let mut count = 0;
        while query.has_more_results() {
            for twin in query.next_page().await? {
                self.reporter.twin(&twin);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Reads the twin and merges `customKey: customValue` into its desired
    /// properties, guarded by the ETag just read.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Conflict`] if the twin changed in between, or
    /// [`RegistryError::NotFound`].
    pub async fn update_desired_properties(&self, device_id: &str) -> Result<Twin, RegistryError> {
        let twin = self.registry.get_twin(device_id).await?;
        self.update_desired_properties_with_etag(&twin.device_id, &twin.etag)
            .await
    }

    /// Merges `customKey: customValue` into desired properties if the twin's
    /// ETag still equals `etag`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Conflict`] if `etag` is stale.
    pub async fn update_desired_properties_with_etag(
        &self,
        device_id: &str,
        etag: &str,
    ) -> Result<Twin, RegistryError> {
        let patch = desired_properties_patch(custom_desired_properties());
        self.step(
            format!("Updating desired properties of '{device_id}'"),
            self.registry.update_twin(device_id, &patch, etag),
        )
        .await
    }

    /// Extracts the hub host name from the configured connection string.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Parse`] if there is no `HostName`.
    pub fn host_name(&self) -> Result<String, RegistryError> {
        extract_host_name(&self.connection_string)
    }

    /// Builds the device-scoped connection string for a created device.
    ///
    /// # Errors
    ///
    /// Fails if the hub host name is missing or the device has no primary key.
    pub fn device_connection_string(
        &self,
        device: &Device,
    ) -> Result<DeviceConnectionString, SampleError> {
        let host_name = self.host_name()?;
        let key = device.authentication.primary_key().ok_or_else(|| {
            SampleError::MissingSymmetricKey {
                device_id: device.device_id.clone(),
            }
        })?;
        Ok(DeviceConnectionString::new(
            host_name,
            &device.device_id,
            key,
        ))
    }

    /// Registers `device_id`, runs `body` with the created device, then
    /// removes the device whatever `body` returned.
    ///
    /// Removal is also attempted when registration fails, unless the id
    /// already existed. A `NotFound` from that removal is dropped in favour of
    /// the registration error.
    ///
    /// # Errors
    ///
    /// The body's error, the removal error, or
    /// [`SampleError::CleanupFailed`] carrying both.
    pub async fn with_provisioned_device<T, F, Fut>(
        &self,
        device_id: &str,
        body: F,
    ) -> Result<T, SampleError>
    where
        F: FnOnce(Device) -> Fut,
        Fut: Future<Output = Result<T, SampleError>>,
    {
        let (outcome, provisioned) = match self.add_device(device_id).await {
            Ok(device) => (body(device).await, true),
            // the id was taken before this call, the device is not ours
            Err(err) if err.is_conflict() => return Err(err.into()),
            Err(err) => (Err(err.into()), false),
        };

        // a failed add may still have created the device if the response was lost
        let released = match self.remove_device(device_id).await {
            Err(cleanup) if !provisioned && cleanup.is_not_found() => Ok(()),
            other => other,
        };

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(cleanup.into()),
            (Err(original), Ok(())) => Err(original),
            (Err(original), Err(cleanup)) => {
                warn!(device_id, error = %cleanup, "Failed to remove device after error");
                Err(SampleError::CleanupFailed {
                    device_id: device_id.to_string(),
                    original: Box::new(original),
                    cleanup,
                })
            }
        }
    }

    /// Runs the full sample under a freshly generated device id.
    ///
    /// # Errors
    ///
    /// See [`run_sample_with_device_id`](Self::run_sample_with_device_id).
    pub async fn run_sample(&self, messaging: &dyn MessagingSample) -> Result<(), SampleError> {
        let device_id = format!("{DEVICE_ID_PREFIX}{}", Uuid::new_v4());
        self.run_sample_with_device_id(&device_id, messaging).await
    }

    /// Adds `device_id`, hands its connection string to `messaging`, and
    /// removes the device on every exit path.
    ///
    /// # Errors
    ///
    /// Any registry or messaging error; see
    /// [`with_provisioned_device`](Self::with_provisioned_device).
    pub async fn run_sample_with_device_id(
        &self,
        device_id: &str,
        messaging: &dyn MessagingSample,
    ) -> Result<(), SampleError> {
        info!(device_id, transport = %self.transport, "Running registry sample");

        self.with_provisioned_device(device_id, |device| async move {
            let connection = self.device_connection_string(&device)?;
            messaging.run(&connection, self.transport).await?;
            Ok::<(), SampleError>(())
        })
        .await
    }
}

impl std::fmt::Debug for RegistryManagerSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryManagerSample")
            .field("thumbprints", &self.thumbprints)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RegistryManagerSample`].
#[derive(Default)]
pub struct RegistryManagerSampleBuilder {
    registry: Option<Arc<dyn DeviceRegistry>>,
    connection_string: Option<String>,
    thumbprints: CertificateThumbprints,
    transport: DeviceTransport,
    reporter: Option<Arc<dyn SampleReporter>>,
}

impl RegistryManagerSampleBuilder {
    /// Sets the registry handle.
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn DeviceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the hub connection string.
    #[must_use]
    pub fn connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    /// Sets the thumbprints for self-signed registrations.
    #[must_use]
    pub fn thumbprints(mut self, thumbprints: CertificateThumbprints) -> Self {
        self.thumbprints = thumbprints;
        self
    }

    /// Sets the transport handed to the messaging collaborator.
    #[must_use]
    pub const fn transport(mut self, transport: DeviceTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the progress reporter. Defaults to [`ConsoleReporter`].
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn SampleReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Builds the sample.
    ///
    /// # Errors
    ///
    /// [`SampleError::MissingRegistry`] or [`SampleError::MissingConnectionString`].
    pub fn build(self) -> Result<RegistryManagerSample, SampleError> {
        let registry = self.registry.ok_or(SampleError::MissingRegistry)?;
        let connection_string = self
            .connection_string
            .ok_or(SampleError::MissingConnectionString)?;

        Ok(RegistryManagerSample {
            registry,
            connection_string,
            thumbprints: self.thumbprints,
            transport: self.transport,
            reporter: self
                .reporter
                .unwrap_or_else(|| Arc::new(ConsoleReporter::new())),
        })
    }
}
