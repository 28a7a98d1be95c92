//! Device add and remove commands.

use anyhow::{Context, Result};
use clap::Args;
use iothub_registry::CertificateThumbprints;
use tracing::info;

use super::HubArgs;

/// Arguments for commands addressing a single device.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    #[command(flatten)]
    pub hub: HubArgs,

    /// Device identifier
    pub device_id: String,
}

/// Arguments for adding a self-signed certificate device.
#[derive(Args, Debug)]
pub struct SelfSignedArgs {
    #[command(flatten)]
    pub hub: HubArgs,

    /// Device identifier
    pub device_id: String,

    /// Primary certificate thumbprint
    #[arg(long, env = "IOTHUB_PFX_X509_THUMBPRINT")]
    pub primary_thumbprint: String,

    /// Secondary certificate thumbprint
    #[arg(long, env = "IOTHUB_PFX_X509_THUMBPRINT2")]
    pub secondary_thumbprint: String,
}

impl SelfSignedArgs {
    fn thumbprints(&self) -> CertificateThumbprints {
        CertificateThumbprints::new(&self.primary_thumbprint, &self.secondary_thumbprint)
    }
}

/// Adds a device with symmetric key authentication and prints its keys.
pub async fn add(args: &DeviceArgs) -> Result<()> {
    let sample = args.hub.sample(CertificateThumbprints::default())?;
    let device = sample
        .add_device(&args.device_id)
        .await
        .with_context(|| format!("Failed to add device '{}'", args.device_id))?;

    if let Some(key) = device.authentication.primary_key() {
        println!("   Primary key: {key}");
    }
    info!(device_id = %device.device_id, "Device ready");
    Ok(())
}

/// Adds a device authenticated by a self-signed certificate.
pub async fn add_self_signed(args: &SelfSignedArgs) -> Result<()> {
    let sample = args.hub.sample(args.thumbprints())?;
    sample
        .add_device_with_configured_thumbprints(&args.device_id)
        .await
        .with_context(|| format!("Failed to add device '{}'", args.device_id))
}

/// Adds a device trusting a CA-issued certificate.
pub async fn add_ca(args: &DeviceArgs) -> Result<()> {
    let sample = args.hub.sample(CertificateThumbprints::default())?;
    sample
        .add_device_with_certificate_authority(&args.device_id)
        .await
        .with_context(|| format!("Failed to add device '{}'", args.device_id))
}

/// Removes a device.
pub async fn remove(args: &DeviceArgs) -> Result<()> {
    let sample = args.hub.sample(CertificateThumbprints::default())?;
    sample
        .remove_device(&args.device_id)
        .await
        .with_context(|| format!("Failed to remove device '{}'", args.device_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iothub_test::hub_connection_string;

    #[test]
    fn test_self_signed_thumbprints() {
        let args = SelfSignedArgs {
            hub: HubArgs {
                connection_string: hub_connection_string(),
                timeout: 30,
            },
            device_id: "cam-1".to_string(),
            primary_thumbprint: "AAAA".to_string(),
            secondary_thumbprint: "BBBB".to_string(),
        };

        assert_eq!(args.thumbprints(), CertificateThumbprints::new("AAAA", "BBBB"));
    }
}
