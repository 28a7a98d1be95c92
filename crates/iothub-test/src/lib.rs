//! # IoT Hub Test
//!
//! Test doubles for `iothub-registry`.
//!
//! This crate provides:
//!
//! - An in-memory [`DeviceRegistry`](iothub_registry::DeviceRegistry) with
//!   call recording and failure injection
//! - Messaging collaborators that record or fail
//! - A reporter that captures progress lines
//! - Fixture builders for devices, twins and connection strings
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use iothub_registry::RegistryManagerSample;
//! use iothub_test::{hub_connection_string, InMemoryRegistry, Operation, RecordingMessaging};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = Arc::new(InMemoryRegistry::new());
//! let sample = RegistryManagerSample::builder()
//!     .registry(registry.clone())
//!     .connection_string(hub_connection_string())
//!     .reporter(Arc::new(iothub_registry::SilentReporter))
//!     .build()
//!     .unwrap();
//!
//! let messaging = RecordingMessaging::new();
//! sample.run_sample_with_device_id("d1", &messaging).await.unwrap();
//!
//! assert_eq!(registry.call_count(Operation::RemoveDevice, "d1"), 1);
//! assert_eq!(registry.device_count(), 0);
//! # }
//! ```

pub mod fixtures;
pub mod memory;
pub mod messaging;
pub mod reporter;

pub use fixtures::{hub_connection_string, MockDevice, TEST_HOST, TEST_KEY, TEST_POLICY};
pub use memory::{InMemoryRegistry, Operation, RegistryCall};
pub use messaging::{FailingMessaging, RecordingMessaging};
pub use reporter::RecordingReporter;
