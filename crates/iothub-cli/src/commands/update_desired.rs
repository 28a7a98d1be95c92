//! Desired property update command.

use anyhow::{Context, Result};
use clap::Args;
use iothub_registry::CertificateThumbprints;

use super::HubArgs;

/// Arguments for the update-desired command.
#[derive(Args, Debug)]
pub struct UpdateDesiredArgs {
    #[command(flatten)]
    pub hub: HubArgs,

    /// Device identifier
    pub device_id: String,

    /// Apply only if the twin still has this ETag, instead of reading it first
    #[arg(long)]
    pub etag: Option<String>,
}

/// Runs the update-desired command.
pub async fn execute(args: &UpdateDesiredArgs) -> Result<()> {
    let sample = args.hub.sample(CertificateThumbprints::default())?;

    let twin = match &args.etag {
        Some(etag) => {
            sample
                .update_desired_properties_with_etag(&args.device_id, etag)
                .await
        }
        None => sample.update_desired_properties(&args.device_id).await,
    }
    .with_context(|| format!("Failed to update twin of '{}'", args.device_id))?;

    println!("   New ETag: {}", twin.etag);
    println!(
        "   Desired: {}",
        serde_json::to_string(&twin.properties.desired)?
    );
    Ok(())
}
