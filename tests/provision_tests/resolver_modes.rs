//! Resolver behavior through the full provisioning flow.

use keybridge::Error;

use super::fake_cloud::FakeCloud;
use super::{provision, spec_with_workspace};
use keybridge::spec::EnvironmentSpec;

#[tokio::test]
async fn unknown_workspace_degrades_instead_of_failing() {
    // Directory has no principal named "Analytics"
    let cloud = FakeCloud::new().with_principal("other-1", "Other Workspace");

    let converged = provision(&cloud, &spec_with_workspace()).await.unwrap();
    let reason = converged.degraded.unwrap();
    assert!(reason.contains("Analytics"));

    // Everything else was still provisioned
    let state = cloud.snapshot();
    assert!(state
        .stores
        .contains_key(&("rg-dev".to_string(), "kv-dev".to_string())));
    assert!(state
        .accounts
        .contains_key(&("rg-dev".to_string(), "oai-dev".to_string())));
}

#[tokio::test]
async fn ambiguous_workspace_is_fatal() {
    let cloud = FakeCloud::new()
        .with_principal("ws-1", "Analytics")
        .with_principal("ws-2", "Analytics");

    let err = provision(&cloud, &spec_with_workspace()).await.unwrap_err();
    assert!(matches!(err, Error::LookupAmbiguous { count: 2, .. }));

    // Fatal before any resource writes
    assert!(cloud.snapshot().stores.is_empty());
}

#[tokio::test]
async fn manual_principal_override_bypasses_the_directory() {
    // Directory would be ambiguous, but the override wins
    let cloud = FakeCloud::new()
        .with_principal("ws-1", "Analytics")
        .with_principal("ws-2", "Analytics");
    let spec = EnvironmentSpec::parse(
        "name: dev\nlocation: eastus2\nworkspace: Analytics\nworkspacePrincipalId: ws-manual\n",
    )
    .unwrap();

    let converged = provision(&cloud, &spec).await.unwrap();
    assert!(converged.degraded.is_none());

    let state = cloud.snapshot();
    let assignments = state
        .role_assignments
        .get(&("rg-dev".to_string(), "oai-dev".to_string()))
        .unwrap();
    assert_eq!(assignments.values().next().unwrap().principal_id, "ws-manual");
}

#[tokio::test]
async fn single_transient_directory_failure_is_retried() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    cloud
        .directory_failures
        .store(1, std::sync::atomic::Ordering::SeqCst);

    let converged = provision(&cloud, &spec_with_workspace()).await.unwrap();
    assert!(converged.degraded.is_none());
}

#[tokio::test]
async fn persistent_directory_outage_degrades() {
    let cloud = FakeCloud::new().with_principal("ws-1", "Analytics");
    cloud
        .directory_failures
        .store(10, std::sync::atomic::Ordering::SeqCst);

    let converged = provision(&cloud, &spec_with_workspace()).await.unwrap();
    let reason = converged.degraded.unwrap();
    assert!(reason.contains("directory lookup"));

    // Degraded, not failed: the store exists with only the deployer policy
    let state = cloud.snapshot();
    let store = state
        .stores
        .get(&("rg-dev".to_string(), "kv-dev".to_string()))
        .unwrap();
    assert_eq!(store.properties.access_policies.len(), 1);
}
