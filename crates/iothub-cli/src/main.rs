//! IoT Hub registry CLI - manage devices and twins from the command line.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iothub_registry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Add(args) => commands::device::add(&args).await,
        Commands::AddSelfSigned(args) => commands::device::add_self_signed(&args).await,
        Commands::AddCa(args) => commands::device::add_ca(&args).await,
        Commands::Remove(args) => commands::device::remove(&args).await,
        Commands::Twins(args) => commands::twins::execute(&args).await,
        Commands::UpdateDesired(args) => commands::update_desired::execute(&args).await,
        Commands::HostName(args) => commands::host_name::run(&args),
        Commands::Version => {
            println!("iothub-registry {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
