//! Secret publisher
//!
//! Writes the inference account's endpoint URL and primary access key into
//! the secret store under the two fixed secret names. This is the only
//! component that handles the key value directly; only secret *names* are
//! ever logged.

use tracing::info;

use crate::cloud::{ControlPlaneApi, InferenceAccount, SecretStore, SecretString, VaultDataApi};
use crate::spec::EnvironmentSpec;
use crate::{Result, SECRET_NAME_OPENAI_API_KEY, SECRET_NAME_OPENAI_ENDPOINT};

/// Publish the endpoint and primary key into the store.
///
/// Overwrites on redeploy: the store versions secrets internally and both
/// writes target "current". Must run strictly after both provisioners have
/// converged (data dependency on the store URI and the account keys).
pub async fn publish_secrets(
    control: &dyn ControlPlaneApi,
    vault_data: &dyn VaultDataApi,
    spec: &EnvironmentSpec,
    store: &SecretStore,
    account: &InferenceAccount,
) -> Result<()> {
    let keys = control
        .account_keys(&spec.resource_group(), &account.name)
        .await?;

    let endpoint = SecretString::new(account.endpoint.clone());
    vault_data
        .set_secret(&store.uri, SECRET_NAME_OPENAI_ENDPOINT, &endpoint)
        .await?;
    info!(secret = SECRET_NAME_OPENAI_ENDPOINT, store = %store.name, "published endpoint secret");

    vault_data
        .set_secret(&store.uri, SECRET_NAME_OPENAI_API_KEY, &keys.primary)
        .await?;
    info!(secret = SECRET_NAME_OPENAI_API_KEY, store = %store.name, "published api key secret");

    Ok(())
}
