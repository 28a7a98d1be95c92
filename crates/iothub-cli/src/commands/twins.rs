//! Twin listing command.

use anyhow::{Context, Result};
use clap::Args;
use iothub_registry::{format_twin_line, CertificateThumbprints};

use super::HubArgs;

/// Arguments for the twins command.
#[derive(Args, Debug)]
pub struct TwinsArgs {
    #[command(flatten)]
    pub hub: HubArgs,

    /// Maximum twins per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for the twins command.
#[derive(Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Runs the twins command.
pub async fn execute(args: &TwinsArgs) -> Result<()> {
    let sample = args.hub.sample(CertificateThumbprints::default())?;

    if args.format == OutputFormat::Text && args.page_size.is_none() {
        let count = sample.print_twins().await.context("Twin query failed")?;
        println!("   {count} device(s)");
        return Ok(());
    }

    let mut query = sample.enumerate_twins();
    if let Some(size) = args.page_size {
        query = query.with_page_size(size);
    }
    let twins = query.collect_all().await.context("Twin query failed")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&twins)?),
        OutputFormat::Text => {
            println!("Querying devices:");
            for twin in &twins {
                println!("{}", format_twin_line(twin));
            }
            println!("   {} device(s)", twins.len());
        }
    }

    Ok(())
}
