//! Resolve command - debug the workspace principal lookup
//!
//! Usage: keybridge resolve <workspace-name>
//!
//! Runs just the identity resolver and prints the object id. Unlike the
//! provision flow, zero matches is an error here: the operator explicitly
//! asked for the id, so there is no degraded mode to fall back to.

use clap::Args;

use crate::resolver::lookup_principal;
use crate::Result;

/// Resolve command arguments
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Workspace display name to look up
    pub workspace: String,
}

/// Run the resolve command
pub async fn run(args: ResolveArgs) -> Result<()> {
    let clients = super::rest_clients()?;
    let principal = lookup_principal(&clients.directory, &args.workspace).await?;
    println!("{}", principal.object_id);
    Ok(())
}
