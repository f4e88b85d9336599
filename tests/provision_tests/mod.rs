//! Shared fixtures for the provisioning integration tests.

pub mod fake_cloud;
pub mod lifecycle;
pub mod resolver_modes;

use self::fake_cloud::FakeCloud;
use keybridge::provision::{Converged, Provisioner};
use keybridge::spec::EnvironmentSpec;
use keybridge::Result;

/// Environment spec pointing at the "Analytics" workspace.
pub fn spec_with_workspace() -> EnvironmentSpec {
    EnvironmentSpec::parse(
        "name: dev\nlocation: eastus2\nworkspace: Analytics\n",
    )
    .unwrap()
}

/// Environment spec with no workspace configured.
pub fn spec_without_workspace() -> EnvironmentSpec {
    EnvironmentSpec::parse("name: dev\nlocation: eastus2\n").unwrap()
}

/// Run a full provision against the fake cloud.
pub async fn provision(cloud: &FakeCloud, spec: &EnvironmentSpec) -> Result<Converged> {
    let provisioner = Provisioner {
        directory: cloud,
        control: cloud,
        vault_data: cloud,
    };
    provisioner.provision(spec).await
}
