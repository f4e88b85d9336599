//! Secret store provisioner
//!
//! Ensures the environment's secret store exists with soft delete enabled,
//! purge protection off (so teardown stays reversible until an explicit
//! purge), and an access policy list keyed by principal object id: the
//! deploying user gets full secret permissions, the resolved workspace
//! principal (when present) gets read-only.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::cloud::{
    AccessPolicyEntry, CallerIdentity, ControlPlaneApi, SecretPermission, SecretStore,
    SecretStoreSpec,
};
use crate::resolver::ResolvedPrincipal;
use crate::spec::EnvironmentSpec;
use crate::{Result, SOFT_DELETE_RETENTION_DAYS};

/// Compute the desired access policy list.
///
/// Set semantics keyed by object id: if the workspace principal happens to
/// be the deployer, the single entry keeps the stronger permission set.
/// The result is sorted by object id so repeated computations are
/// byte-identical and converged state compares equal.
fn desired_access_policies(
    caller: &CallerIdentity,
    principal: Option<&ResolvedPrincipal>,
) -> Vec<AccessPolicyEntry> {
    let mut by_id: BTreeMap<String, AccessPolicyEntry> = BTreeMap::new();

    if let Some(p) = principal {
        by_id.insert(
            p.object_id.clone(),
            AccessPolicyEntry {
                tenant_id: caller.tenant_id.clone(),
                object_id: p.object_id.clone(),
                secret_permissions: SecretPermission::read_only(),
            },
        );
    }

    // Deployer last: wins over a read-only entry for the same id
    by_id.insert(
        caller.object_id.clone(),
        AccessPolicyEntry {
            tenant_id: caller.tenant_id.clone(),
            object_id: caller.object_id.clone(),
            secret_permissions: SecretPermission::full(),
        },
    );

    by_id.into_values().collect()
}

/// Desired secret store state for an environment
pub fn desired_store_spec(
    spec: &EnvironmentSpec,
    caller: &CallerIdentity,
    principal: Option<&ResolvedPrincipal>,
) -> SecretStoreSpec {
    SecretStoreSpec {
        location: spec.location.clone(),
        tenant_id: caller.tenant_id.clone(),
        soft_delete_retention_days: SOFT_DELETE_RETENTION_DAYS,
        purge_protection: false,
        access_policies: desired_access_policies(caller, principal),
        tags: spec.tags(),
    }
}

/// Idempotently ensure the secret store matches the desired state.
///
/// Reads current state first and only writes when something differs, so a
/// converged re-run performs no control-plane writes. The access policy
/// list is applied declaratively: re-applying identical inputs can never
/// duplicate an entry because the desired list is recomputed from scratch.
pub async fn ensure_secret_store(
    control: &dyn ControlPlaneApi,
    spec: &EnvironmentSpec,
    caller: &CallerIdentity,
    principal: Option<&ResolvedPrincipal>,
) -> Result<SecretStore> {
    let name = spec.vault_name();
    let resource_group = spec.resource_group();
    let desired = desired_store_spec(spec, caller, principal);

    if let Some(existing) = control.get_secret_store(&resource_group, &name).await? {
        if existing.properties == desired {
            debug!(store = %name, "secret store already converged");
            return Ok(existing);
        }
        info!(store = %name, "updating secret store");
    } else {
        info!(store = %name, location = %spec.location, "creating secret store");
    }

    let store = control
        .put_secret_store(&resource_group, &name, &desired)
        .await?;
    info!(store = %name, uri = %store.uri, "secret store ready");
    Ok(store)
}
