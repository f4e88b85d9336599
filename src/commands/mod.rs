//! CLI commands

use clap::{Parser, Subcommand};

use crate::Result;

pub mod down;
pub mod outputs;
pub mod provision;
pub mod resolve;

/// keybridge - provision a secrets-backed credential bridge
#[derive(Parser, Debug)]
#[command(name = "keybridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision the environment (idempotent; safe to re-run)
    Provision(provision::ProvisionArgs),
    /// Recompute deployment outputs from converged state
    Outputs(outputs::OutputsArgs),
    /// Resolve a workspace name to its service principal object id
    Resolve(resolve::ResolveArgs),
    /// Tear down the environment
    Down(down::DownArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Provision(args) => provision::run(args).await,
            Commands::Outputs(args) => outputs::run(args).await,
            Commands::Resolve(args) => resolve::run(args).await,
            Commands::Down(args) => down::run(args).await,
        }
    }
}

/// Build the REST clients from `KEYBRIDGE_*` environment variables.
pub(crate) fn rest_clients() -> Result<crate::cloud::rest::RestClients> {
    let config = crate::cloud::rest::RestConfig::from_env()?;
    crate::cloud::rest::RestClients::new(config)
}
