//! Provisioning orchestration
//!
//! Runs the components in dependency order: identity resolver first, then
//! the secret store and inference service provisioners (independent of each
//! other), then the secret publisher (strictly after both), then the output
//! emitter. Every step is an idempotent declarative apply; an interrupted
//! run is safe to re-invoke and converges to the same end state.

mod inference;
mod outputs;
mod secrets;
mod vault;

pub use inference::{desired_deployments, ensure_inference_service};
pub use outputs::Outputs;
pub use secrets::publish_secrets;
pub use vault::ensure_secret_store;

use tracing::{info, warn};

use crate::cloud::{ControlPlaneApi, DirectoryApi, VaultDataApi};
use crate::resolver::{resolve_workspace_principal, Resolution};
use crate::spec::EnvironmentSpec;
use crate::{Error, Result};

/// Result of a full provisioning run
#[derive(Clone, Debug)]
pub struct Converged {
    /// The emitted output set
    pub outputs: Outputs,
    /// Set when the run completed in degraded mode (no workspace grants)
    pub degraded: Option<String>,
}

/// Orchestrates the provisioners over the cloud API traits
pub struct Provisioner<'a> {
    /// Tenant directory (principal lookup, caller discovery)
    pub directory: &'a dyn DirectoryApi,
    /// Resource-management control plane
    pub control: &'a dyn ControlPlaneApi,
    /// Secret store data plane
    pub vault_data: &'a dyn VaultDataApi,
}

impl Provisioner<'_> {
    /// Converge the environment to its desired state and emit outputs.
    pub async fn provision(&self, spec: &EnvironmentSpec) -> Result<Converged> {
        let caller = self.directory.current_caller().await?;
        info!(caller = %caller.object_id, tenant = %caller.tenant_id, "deploying as");

        let resolution = resolve_workspace_principal(
            self.directory,
            spec.workspace_name(),
            spec.workspace_principal_id.as_deref(),
        )
        .await?;
        let principal = resolution.principal();

        self.control
            .ensure_resource_group(&spec.resource_group(), &spec.location, &spec.tags())
            .await?;

        // Independent of each other; publisher depends on both
        let store = ensure_secret_store(self.control, spec, &caller, principal).await?;
        let account = ensure_inference_service(self.control, spec, principal).await?;

        publish_secrets(self.control, self.vault_data, spec, &store, &account).await?;

        let outputs = Outputs::collect(spec, &store, &account);

        let degraded = match resolution {
            Resolution::Degraded { reason } => {
                warn!(
                    reason = %reason,
                    "provisioned in degraded mode; workspace access grants were omitted"
                );
                Some(reason)
            }
            Resolution::Resolved(_) => None,
        };

        Ok(Converged { outputs, degraded })
    }

    /// Recompute outputs from already-converged state without writing.
    ///
    /// Fails with a validation error when the environment has not been
    /// provisioned yet.
    pub async fn outputs(&self, spec: &EnvironmentSpec) -> Result<Outputs> {
        let resource_group = spec.resource_group();
        let store = self
            .control
            .get_secret_store(&resource_group, &spec.vault_name())
            .await?
            .ok_or_else(|| not_provisioned(spec, "secret store"))?;
        let account = self
            .control
            .get_account(&resource_group, &spec.account_name())
            .await?
            .ok_or_else(|| not_provisioned(spec, "inference account"))?;
        Ok(Outputs::collect(spec, &store, &account))
    }

    /// Tear down the environment.
    ///
    /// Deletes the resource group and everything in it. With `purge`, also
    /// vacates the soft-delete slots of the store and the account so their
    /// names become reusable immediately (irreversible).
    pub async fn teardown(&self, spec: &EnvironmentSpec, purge: bool) -> Result<()> {
        let resource_group = spec.resource_group();
        info!(resource_group = %resource_group, "deleting resource group");
        self.control.delete_resource_group(&resource_group).await?;

        if purge {
            info!(store = %spec.vault_name(), "purging soft-deleted secret store");
            self.control
                .purge_secret_store(&spec.vault_name(), &spec.location)
                .await?;
            info!(account = %spec.account_name(), "purging soft-deleted inference account");
            self.control
                .purge_account(&spec.account_name(), &spec.location)
                .await?;
        }

        info!(environment = %spec.name, purged = purge, "teardown complete");
        Ok(())
    }
}

fn not_provisioned(spec: &EnvironmentSpec, what: &str) -> Error {
    Error::validation(format!(
        "environment '{}' has no {}; run `keybridge provision` first",
        spec.name, what
    ))
}
