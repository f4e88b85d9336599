//! Provision command - converge an environment and emit outputs
//!
//! Usage: keybridge provision -f env.yaml [--env-file .env]
//!
//! Runs the full sequence: resolve the workspace principal, ensure the
//! resource group, secret store and inference service, publish the
//! credential secrets, and print the output set. Re-running against
//! converged state performs no writes and prints identical outputs.

use std::path::PathBuf;

use clap::Args;

use crate::provision::Provisioner;
use crate::spec::EnvironmentSpec;
use crate::Result;

/// Provision command arguments
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Path to the environment spec YAML file
    #[arg(short = 'f', long = "config", env = "KEYBRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Also write the outputs to a dotenv-style file
    #[arg(long = "env-file")]
    pub env_file: Option<PathBuf>,
}

/// Run the provision command
pub async fn run(args: ProvisionArgs) -> Result<()> {
    let spec = EnvironmentSpec::load(&args.config).await?;
    let clients = super::rest_clients()?;
    let provisioner = Provisioner {
        directory: &clients.directory,
        control: &clients.control,
        vault_data: &clients.vault,
    };

    let converged = provisioner.provision(&spec).await?;

    let rendered = converged.outputs.render_env();
    print!("{}", rendered);

    if let Some(path) = &args.env_file {
        tokio::fs::write(path, rendered).await?;
    }

    if let Some(reason) = &converged.degraded {
        eprintln!(
            "warning: degraded mode ({}); set workspacePrincipalId in {} and re-run",
            reason,
            args.config.display()
        );
    }

    Ok(())
}
