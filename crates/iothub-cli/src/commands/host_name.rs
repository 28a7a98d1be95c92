//! Host name command.

use anyhow::{Context, Result};
use clap::Args;
use iothub_registry::extract_host_name;

use super::CONNECTION_STRING_ENV;

/// Arguments for the host-name command.
#[derive(Args, Debug)]
pub struct HostNameArgs {
    /// Connection string to parse
    #[arg(long, env = CONNECTION_STRING_ENV, hide_env_values = true)]
    pub connection_string: String,
}

/// Prints the `HostName` value of the connection string.
pub fn run(args: &HostNameArgs) -> Result<()> {
    let host = extract_host_name(&args.connection_string)
        .context("Connection string has no HostName")?;
    println!("{host}");
    Ok(())
}
