//! Outputs command - recompute outputs without provisioning
//!
//! Usage: keybridge outputs -f env.yaml [--format env|json]
//!
//! Read-only: queries the converged resources and re-emits the fixed output
//! set. Fails if the environment has not been provisioned.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::provision::Provisioner;
use crate::spec::EnvironmentSpec;
use crate::Result;

/// Output rendering format
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Dotenv-style `KEY="value"` lines
    Env,
    /// Pretty-printed JSON object
    Json,
}

/// Outputs command arguments
#[derive(Args, Debug)]
pub struct OutputsArgs {
    /// Path to the environment spec YAML file
    #[arg(short = 'f', long = "config", env = "KEYBRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Rendering format
    #[arg(long, value_enum, default_value = "env")]
    pub format: OutputFormat,
}

/// Run the outputs command
pub async fn run(args: OutputsArgs) -> Result<()> {
    let spec = EnvironmentSpec::load(&args.config).await?;
    let clients = super::rest_clients()?;
    let provisioner = Provisioner {
        directory: &clients.directory,
        control: &clients.control,
        vault_data: &clients.vault,
    };

    let outputs = provisioner.outputs(&spec).await?;
    match args.format {
        OutputFormat::Env => print!("{}", outputs.render_env()),
        OutputFormat::Json => println!("{}", outputs.render_json()?),
    }
    Ok(())
}
