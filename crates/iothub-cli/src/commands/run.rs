//! Run command: provision a temporary device and hand it off.
//!
//! The device-side send loop lives in a separate device application; this
//! command prints the device connection string for it while the device
//! exists, then removes the device.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use iothub_registry::{
    CertificateThumbprints, DeviceConnectionString, DeviceTransport, MessagingError,
    MessagingSample,
};
use tracing::info;

use super::HubArgs;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub hub: HubArgs,

    /// Transport the device application should use (amqp, amqp-ws, mqtt, mqtt-ws, http)
    #[arg(long, default_value = "amqp")]
    pub transport: DeviceTransport,

    /// Use this device id instead of a generated one
    #[arg(long)]
    pub device_id: Option<String>,
}

/// Hands the device off by printing its connection string.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintConnectionString;

impl PrintConnectionString {
    fn lines(connection: &DeviceConnectionString, transport: DeviceTransport) -> [String; 2] {
        [
            format!("   Device connection string: {connection}"),
            format!("   Transport: {transport}"),
        ]
    }
}

#[async_trait]
impl MessagingSample for PrintConnectionString {
    async fn run(
        &self,
        connection: &DeviceConnectionString,
        transport: DeviceTransport,
    ) -> Result<(), MessagingError> {
        for line in Self::lines(connection, transport) {
            println!("{line}");
        }
        Ok(())
    }
}

/// Executes the run command.
pub async fn execute(args: RunArgs) -> Result<()> {
    let sample = args.hub.sample(CertificateThumbprints::default())?;
    let sample = sample.with_transport(args.transport);
    info!(transport = %args.transport, "Starting registry sample");

    let outcome = match &args.device_id {
        Some(device_id) => {
            sample
                .run_sample_with_device_id(device_id, &PrintConnectionString)
                .await
        }
        None => sample.run_sample(&PrintConnectionString).await,
    };
    outcome.context("Registry sample failed")?;

    println!("\n✅ Sample complete");
    Ok(())
}
