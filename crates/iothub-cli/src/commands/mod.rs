//! CLI commands and argument parsing.

pub mod device;
pub mod host_name;
pub mod run;
pub mod twins;
pub mod update_desired;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use iothub_registry::{CertificateThumbprints, HubConfig, RegistryClient, RegistryManagerSample};

/// Environment variable holding the hub connection string.
pub const CONNECTION_STRING_ENV: &str = "IOTHUB_CONN_STRING_CSHARP";

/// IoT Hub device registry tool
#[derive(Parser)]
#[command(name = "iothub-registry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Provision a temporary device, hand it off, and remove it
    Run(run::RunArgs),

    /// Add a device with symmetric key authentication
    Add(device::DeviceArgs),

    /// Add a device authenticated by a self-signed certificate
    AddSelfSigned(device::SelfSignedArgs),

    /// Add a device trusting a CA-issued certificate
    AddCa(device::DeviceArgs),

    /// Remove a device
    Remove(device::DeviceArgs),

    /// List all device twins
    Twins(twins::TwinsArgs),

    /// Merge customKey: customValue into a twin's desired properties
    UpdateDesired(update_desired::UpdateDesiredArgs),

    /// Print the host name of a connection string
    HostName(host_name::HostNameArgs),

    /// Print version information
    Version,
}

/// Hub connection options shared by every command that talks to the hub.
#[derive(Args, Debug, Clone)]
pub struct HubArgs {
    /// Hub connection string with a shared access policy
    #[arg(long, env = CONNECTION_STRING_ENV, hide_env_values = true)]
    pub connection_string: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

impl HubArgs {
    /// Builds the hub configuration.
    pub fn config(&self) -> Result<HubConfig> {
        let config = HubConfig::from_connection_string(&self.connection_string)
            .context("Invalid hub connection string")?;
        Ok(config.with_timeout(Duration::from_secs(self.timeout)))
    }

    /// Builds a sample over a live registry client.
    pub fn sample(&self, thumbprints: CertificateThumbprints) -> Result<RegistryManagerSample> {
        let client = RegistryClient::new(self.config()?).context("Failed to create client")?;
        Ok(RegistryManagerSample::new(
            Arc::new(client),
            self.connection_string.clone(),
            thumbprints,
        ))
    }
}
