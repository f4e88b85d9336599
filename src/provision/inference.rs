//! Inference service provisioner
//!
//! Ensures the inference account exists with its fixed SKU, converges the
//! account to exactly the two named model deployments (chat + embedding),
//! and grants the workspace principal a data-plane role directly on the
//! account so identity-based callers never need the stored key.

use tracing::{debug, info};

use crate::cloud::{
    ControlPlaneApi, InferenceAccount, InferenceAccountSpec, ModelDeployment, RoleAssignment,
};
use crate::resolver::ResolvedPrincipal;
use crate::spec::EnvironmentSpec;
use crate::{
    Result, EMBEDDING_DEPLOYMENT_NAME, EMBEDDING_MODEL_VERSION, GPT_DEPLOYMENT_NAME,
    GPT_MODEL_VERSION, INFERENCE_SKU, MODEL_CAPACITY, OPENAI_USER_ROLE_ID,
};

/// The fixed deployment set: one general-purpose chat model, one embedding
/// model. Deployment name is the idempotency key.
pub fn desired_deployments() -> Vec<ModelDeployment> {
    vec![
        ModelDeployment {
            name: GPT_DEPLOYMENT_NAME.to_string(),
            model: GPT_DEPLOYMENT_NAME.to_string(),
            version: GPT_MODEL_VERSION.to_string(),
            capacity: MODEL_CAPACITY,
        },
        ModelDeployment {
            name: EMBEDDING_DEPLOYMENT_NAME.to_string(),
            model: EMBEDDING_DEPLOYMENT_NAME.to_string(),
            version: EMBEDDING_MODEL_VERSION.to_string(),
            capacity: MODEL_CAPACITY,
        },
    ]
}

/// Desired account state for an environment
pub fn desired_account_spec(spec: &EnvironmentSpec) -> InferenceAccountSpec {
    InferenceAccountSpec {
        location: spec.location.clone(),
        sku: INFERENCE_SKU.to_string(),
        custom_subdomain: spec.account_name(),
        tags: spec.tags(),
    }
}

/// Deterministic role-assignment name for a principal/role pair.
///
/// Stable across runs so a re-apply targets the same assignment instead of
/// creating a second one; scoped uniqueness comes from the account the
/// assignment is attached to.
pub fn assignment_name(principal_id: &str, role_id: &str) -> String {
    let prefix = |s: &str| s.chars().take(8).collect::<String>();
    format!("kb-{}-{}", prefix(principal_id), prefix(role_id))
}

/// Idempotently ensure the inference account, its two model deployments,
/// and (when a principal is available) the data-plane role assignment.
///
/// Deployments not in the desired set are deleted so repeated applies
/// converge to exactly the two named deployments. Failures surface
/// unmodified; a deployment PUT rejected for region availability arrives
/// as [`crate::Error::ModelUnavailable`] from the cloud layer.
pub async fn ensure_inference_service(
    control: &dyn ControlPlaneApi,
    spec: &EnvironmentSpec,
    principal: Option<&ResolvedPrincipal>,
) -> Result<InferenceAccount> {
    let name = spec.account_name();
    let resource_group = spec.resource_group();
    let desired = desired_account_spec(spec);

    let account = match control.get_account(&resource_group, &name).await? {
        Some(existing) if existing.properties == desired => {
            debug!(account = %name, "inference account already converged");
            existing
        }
        existing => {
            if existing.is_some() {
                info!(account = %name, "updating inference account");
            } else {
                info!(account = %name, location = %spec.location, "creating inference account");
            }
            control.put_account(&resource_group, &name, &desired).await?
        }
    };

    ensure_deployments(control, &resource_group, &name).await?;

    if let Some(principal) = principal {
        ensure_role_assignment(control, &resource_group, &name, principal).await?;
    } else {
        debug!(account = %name, "no workspace principal; skipping role assignment");
    }

    Ok(account)
}

/// Converge the account's deployment list to exactly the desired set.
async fn ensure_deployments(
    control: &dyn ControlPlaneApi,
    resource_group: &str,
    account: &str,
) -> Result<()> {
    let desired = desired_deployments();
    let current = control.list_deployments(resource_group, account).await?;

    for want in &desired {
        match current.iter().find(|d| d.name == want.name) {
            Some(have) if have == want => {
                debug!(deployment = %want.name, "model deployment already converged");
            }
            Some(_) => {
                info!(deployment = %want.name, model = %want.model, "updating model deployment");
                control.put_deployment(resource_group, account, want).await?;
            }
            None => {
                info!(deployment = %want.name, model = %want.model, "creating model deployment");
                control.put_deployment(resource_group, account, want).await?;
            }
        }
    }

    for have in &current {
        if !desired.iter().any(|d| d.name == have.name) {
            info!(deployment = %have.name, "removing extraneous model deployment");
            control
                .delete_deployment(resource_group, account, &have.name)
                .await?;
        }
    }

    Ok(())
}

/// Ensure the principal holds the data-plane role on the account.
///
/// Keyed by (principal, role) rather than assignment name so a grant
/// created out-of-band is recognized and not duplicated.
async fn ensure_role_assignment(
    control: &dyn ControlPlaneApi,
    resource_group: &str,
    account: &str,
    principal: &ResolvedPrincipal,
) -> Result<()> {
    let existing = control.list_role_assignments(resource_group, account).await?;
    let already_granted = existing
        .iter()
        .any(|a| a.principal_id == principal.object_id && a.role_id == OPENAI_USER_ROLE_ID);

    if already_granted {
        debug!(principal = %principal.object_id, "data-plane role already granted");
        return Ok(());
    }

    let assignment = RoleAssignment {
        name: assignment_name(&principal.object_id, OPENAI_USER_ROLE_ID),
        principal_id: principal.object_id.clone(),
        role_id: OPENAI_USER_ROLE_ID.to_string(),
    };
    info!(
        principal = %principal.object_id,
        account = %account,
        "granting data-plane role to workspace principal"
    );
    control
        .put_role_assignment(resource_group, account, &assignment)
        .await
}
