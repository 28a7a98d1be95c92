//! # IoT Hub Registry
//!
//! Device registry client for IoT Hub.
//!
//! This crate provides functionality to register and remove devices, read
//! and patch device twins, and enumerate twins page by page against a hub's
//! REST API, plus a small facade that runs the usual provisioning workflow.
//!
//! ## Features
//!
//! - **Device identities**: symmetric key, self-signed and CA authentication
//! - **Twins**: ETag-guarded desired property updates, paged queries
//! - **SAS authentication**: tokens signed from the hub connection string
//! - **Scoped provisioning**: devices created for a workflow are always removed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use iothub_registry::{CertificateThumbprints, RegistryClient, RegistryManagerSample};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection_string = "HostName=contoso.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0";
//!     let client = RegistryClient::from_connection_string(connection_string)?;
//!
//!     let sample = RegistryManagerSample::new(
//!         Arc::new(client),
//!         connection_string,
//!         CertificateThumbprints::default(),
//!     );
//!
//!     sample.add_device("thermostat-1").await?;
//!     sample.update_desired_properties("thermostat-1").await?;
//!     sample.print_twins().await?;
//!     sample.remove_device("thermostat-1").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  RegistryManagerSample                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  TwinQuery  │  │  Reporter   │  │  MessagingSample    │  │
//! │  │  (paged)    │  │  (console)  │  │  (device hand-off)  │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                          │ dyn DeviceRegistry
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │           RegistryClient (HTTPS + SAS token)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod config;
mod connection_string;
mod device;
mod error;
mod messaging;
mod query;
mod registry;
mod reporter;
mod sample;
mod sas;
pub mod twin;

pub use client::{RegistryClient, CONTINUATION_HEADER, MAX_ITEM_COUNT_HEADER};
pub use config::{CertificateThumbprints, HubConfig, SharedAccessPolicy, DEFAULT_API_VERSION};
pub use connection_string::{extract_host_name, ConnectionString, DeviceConnectionString};
pub use device::{
    AuthenticationMechanism, AuthenticationType, ConnectionState, Device, DeviceStatus,
    SymmetricKey, X509Thumbprint,
};
pub use error::RegistryError;
pub use messaging::{DeviceTransport, MessagingError, MessagingSample};
pub use query::{TwinQuery, ALL_DEVICES_QUERY};
pub use registry::DeviceRegistry;
pub use reporter::{format_twin_line, ConsoleReporter, SampleReporter, SilentReporter};
pub use sample::{
    custom_desired_properties, RegistryManagerSample, RegistryManagerSampleBuilder, SampleError,
    DEVICE_ID_PREFIX,
};
pub use sas::SharedAccessSignature;
pub use twin::{Twin, TwinPage, TwinProperties};
