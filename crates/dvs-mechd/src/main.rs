//! dvs-mechd - DVS mechanism driver tool
//!
//! Validates driver configuration and previews port-group names.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use dvs_mechd::{portgroup_name, DvsConfig, DEFAULT_CONFIG_PATH};
use dvs_types::Network;

/// DVS mechanism driver
#[derive(Parser, Debug)]
#[command(name = "dvs-mechd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the configuration, then print the switch mapping
    Check,

    /// Print the port-group name derived for a network
    PortgroupName {
        /// Network identifier
        #[arg(long)]
        id: String,

        /// Network display name
        #[arg(long)]
        name: Option<String>,
    },
}

/// Initializes tracing/logging subsystem
fn init_logging(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = DvsConfig::load_or_default(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config.validate().context("validating configuration")?;

    let mappings = config.network_mappings()?;
    info!(
        path = %path.display(),
        mappings = mappings.len(),
        "Configuration is valid"
    );

    println!(
        "session: {}@{} (api retries {}, task poll {:?})",
        config.vsphere.login,
        config.vsphere.hostname,
        config.vsphere.api_retry_count,
        config.task_poll_interval()
    );
    if mappings.is_empty() {
        println!("no physical networks mapped");
    }
    for mapping in &mappings {
        println!("{:<24} -> {}", mapping.physical_network, mapping.switch_name);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let result = match &args.command {
        Command::Check => check(&args.config),
        Command::PortgroupName { id, name } => {
            let network = Network::new(id, name.as_deref());
            portgroup_name(&network)
                .map(|name| println!("{}", name))
                .map_err(anyhow::Error::from)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
