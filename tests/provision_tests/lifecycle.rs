//! Converge, idempotence, outputs, and teardown lifecycle tests.

use keybridge::cloud::SecretPermission;
use keybridge::provision::Provisioner;
use keybridge::{
    EMBEDDING_DEPLOYMENT_NAME, GPT_DEPLOYMENT_NAME, OPENAI_USER_ROLE_ID,
    SECRET_NAME_OPENAI_API_KEY, SECRET_NAME_OPENAI_ENDPOINT,
};

use super::fake_cloud::FakeCloud;
use super::{provision, spec_with_workspace, spec_without_workspace};

#[tokio::test]
async fn provision_converges_the_full_bridge() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    let spec = spec_with_workspace();

    let converged = provision(&cloud, &spec).await.unwrap();
    assert!(converged.degraded.is_none());

    let state = cloud.snapshot();
    let rg_key = ("rg-dev".to_string(), "kv-dev".to_string());

    // Secret store: soft delete on, purge protection off, two policies
    let store = state.stores.get(&rg_key).unwrap();
    assert_eq!(store.properties.soft_delete_retention_days, 90);
    assert!(!store.properties.purge_protection);
    assert_eq!(store.properties.access_policies.len(), 2);
    let ws_policy = store
        .properties
        .access_policies
        .iter()
        .find(|p| p.object_id == "ws-1")
        .unwrap();
    assert_eq!(ws_policy.secret_permissions, SecretPermission::read_only());
    let deployer = store
        .properties
        .access_policies
        .iter()
        .find(|p| p.object_id == "caller-1")
        .unwrap();
    assert_eq!(deployer.secret_permissions, SecretPermission::full());

    // Inference account: exactly the two fixed deployments
    let account_key = ("rg-dev".to_string(), "oai-dev".to_string());
    let deployments = state.deployments.get(&account_key).unwrap();
    let mut names: Vec<&str> = deployments.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(names, vec![EMBEDDING_DEPLOYMENT_NAME, GPT_DEPLOYMENT_NAME]);

    // Data-plane role granted directly on the account
    let assignments = state.role_assignments.get(&account_key).unwrap();
    assert_eq!(assignments.len(), 1);
    let assignment = assignments.values().next().unwrap();
    assert_eq!(assignment.principal_id, "ws-1");
    assert_eq!(assignment.role_id, OPENAI_USER_ROLE_ID);

    // Both secrets published under the fixed names
    let secrets = state.secrets.get(&store.uri).unwrap();
    assert_eq!(
        secrets.get(SECRET_NAME_OPENAI_ENDPOINT).unwrap(),
        "https://oai-dev.inference.example.net/"
    );
    assert_eq!(
        secrets.get(SECRET_NAME_OPENAI_API_KEY).unwrap(),
        &FakeCloud::primary_key("oai-dev")
    );
}

#[tokio::test]
async fn provisioning_twice_is_idempotent() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    let spec = spec_with_workspace();

    let first = provision(&cloud, &spec).await.unwrap();
    let after_first = cloud.snapshot();

    let second = provision(&cloud, &spec).await.unwrap();
    let after_second = cloud.snapshot();

    assert_eq!(after_first, after_second);
    assert_eq!(first.outputs, second.outputs);
}

#[tokio::test]
async fn repeated_applies_never_duplicate_grants() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    let spec = spec_with_workspace();

    for _ in 0..3 {
        provision(&cloud, &spec).await.unwrap();
    }

    let state = cloud.snapshot();
    let store = state
        .stores
        .get(&("rg-dev".to_string(), "kv-dev".to_string()))
        .unwrap();
    assert_eq!(store.properties.access_policies.len(), 2);

    let assignments = state
        .role_assignments
        .get(&("rg-dev".to_string(), "oai-dev".to_string()))
        .unwrap();
    assert_eq!(assignments.len(), 1);
}

#[tokio::test]
async fn extraneous_deployment_is_removed_on_converge() {
    use keybridge::cloud::{ControlPlaneApi, ModelDeployment};

    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    let spec = spec_with_workspace();
    provision(&cloud, &spec).await.unwrap();

    // Someone hand-created a third deployment on the account
    cloud
        .put_deployment(
            "rg-dev",
            "oai-dev",
            &ModelDeployment {
                name: "legacy-davinci".to_string(),
                model: "davinci".to_string(),
                version: "1".to_string(),
                capacity: 1,
            },
        )
        .await
        .unwrap();

    provision(&cloud, &spec).await.unwrap();

    let state = cloud.snapshot();
    let deployments = state
        .deployments
        .get(&("rg-dev".to_string(), "oai-dev".to_string()))
        .unwrap();
    assert_eq!(deployments.len(), 2);
    assert!(!deployments.contains_key("legacy-davinci"));
}

#[tokio::test]
async fn outputs_are_names_not_values() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    let converged = provision(&cloud, &spec_with_workspace()).await.unwrap();

    let rendered = converged.outputs.render_env();
    assert!(rendered.contains("KEYVAULT_OPENAI_API_KEY=\"openai-api-key\""));
    assert!(!rendered.contains(&FakeCloud::primary_key("oai-dev")));

    let json = converged.outputs.render_json().unwrap();
    assert!(!json.contains(&FakeCloud::primary_key("oai-dev")));
}

#[tokio::test]
async fn outputs_command_recomputes_without_writes() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    let spec = spec_with_workspace();
    let converged = provision(&cloud, &spec).await.unwrap();
    let before = cloud.snapshot();

    let provisioner = Provisioner {
        directory: &cloud,
        control: &cloud,
        vault_data: &cloud,
    };
    let outputs = provisioner.outputs(&spec).await.unwrap();

    assert_eq!(outputs, converged.outputs);
    assert_eq!(cloud.snapshot(), before);
}

#[tokio::test]
async fn outputs_before_provisioning_is_an_error() {
    let cloud = FakeCloud::new();
    let provisioner = Provisioner {
        directory: &cloud,
        control: &cloud,
        vault_data: &cloud,
    };
    let err = provisioner.outputs(&spec_without_workspace()).await.unwrap_err();
    assert!(err.to_string().contains("keybridge provision"));
}

#[tokio::test]
async fn teardown_soft_deletes_then_purge_frees_the_name() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    let spec = spec_with_workspace();
    provision(&cloud, &spec).await.unwrap();

    let provisioner = Provisioner {
        directory: &cloud,
        control: &cloud,
        vault_data: &cloud,
    };
    provisioner.teardown(&spec, false).await.unwrap();

    // Soft-deleted: the vault name is still occupied, re-provision fails
    let state = cloud.snapshot();
    assert!(state.stores.is_empty());
    assert!(state.deleted_stores.contains("kv-dev"));
    let err = provision(&cloud, &spec).await.unwrap_err();
    assert!(err.to_string().contains("soft-deleted"));

    // Purge vacates the slot; a fresh environment can reuse the name
    provisioner.teardown(&spec, true).await.unwrap();
    assert!(cloud.snapshot().deleted_stores.is_empty());
    provision(&cloud, &spec).await.unwrap();
    assert!(cloud
        .snapshot()
        .stores
        .contains_key(&("rg-dev".to_string(), "kv-dev".to_string())));
}

#[tokio::test]
async fn degraded_mode_without_workspace_grants_only_the_deployer() {
    let cloud = FakeCloud::new();
    let spec = spec_without_workspace();

    let converged = provision(&cloud, &spec).await.unwrap();
    assert!(converged.degraded.is_some());

    let state = cloud.snapshot();
    let store = state
        .stores
        .get(&("rg-dev".to_string(), "kv-dev".to_string()))
        .unwrap();
    assert_eq!(store.properties.access_policies.len(), 1);
    assert_eq!(store.properties.access_policies[0].object_id, "caller-1");

    // No role assignment was attempted
    let assignments = state
        .role_assignments
        .get(&("rg-dev".to_string(), "oai-dev".to_string()));
    assert!(assignments.is_none() || assignments.unwrap().is_empty());

    // Secrets still published: the bridge works for key-based callers
    assert_eq!(state.secrets.values().next().unwrap().len(), 2);
}
