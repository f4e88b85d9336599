//! Down command - tear down a provisioned environment
//!
//! Usage: keybridge down -f env.yaml [--purge] [--yes]
//!
//! Deletes the resource group and everything in it. Soft delete keeps the
//! store and account recoverable for the retention window; `--purge`
//! vacates those slots immediately so the names become reusable. Purge is
//! irreversible, so a confirmation prompt guards it unless `--yes` is set.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use crate::provision::Provisioner;
use crate::spec::EnvironmentSpec;
use crate::Result;

/// Down command arguments
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Path to the environment spec YAML file
    #[arg(short = 'f', long = "config", env = "KEYBRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Also purge soft-deleted state (irreversible)
    #[arg(long)]
    pub purge: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

/// Run the down command
pub async fn run(args: DownArgs) -> Result<()> {
    let spec = EnvironmentSpec::load(&args.config).await?;

    if !args.yes && !confirm(&spec.name, args.purge)? {
        println!("aborted");
        return Ok(());
    }

    let clients = super::rest_clients()?;
    let provisioner = Provisioner {
        directory: &clients.directory,
        control: &clients.control,
        vault_data: &clients.vault,
    };
    provisioner.teardown(&spec, args.purge).await
}

fn confirm(environment: &str, purge: bool) -> Result<bool> {
    let action = if purge {
        "delete AND PURGE (irreversible)"
    } else {
        "delete"
    };
    print!("This will {} environment '{}'. Continue? [y/N] ", action, environment);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
