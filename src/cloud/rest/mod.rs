//! REST implementations of the cloud API traits.
//!
//! Three thin clients over a shared [`HttpBackend`]: the tenant directory
//! (service principal lookup), the resource-management control plane, and
//! the secret store data plane. URL construction and body shapes live here;
//! all status-code interpretation lives in `http.rs`.
//!
//! Base URLs are configurable so tests can point the clients at a local
//! mock server.

mod http;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::cloud::{
    AccessPolicyEntry, AccountKeys, CallerIdentity, ControlPlaneApi, DirectoryApi,
    InferenceAccount, InferenceAccountSpec, ModelDeployment, RoleAssignment, SecretPermission,
    SecretStore, SecretStoreSpec, SecretString, ServicePrincipal, VaultDataApi,
};
use crate::{Error, Result};

use http::HttpBackend;

const DIRECTORY_API_VERSION: &str = "v1.0";
const RESOURCE_API_VERSION: &str = "2021-04-01";
const VAULT_API_VERSION: &str = "2023-07-01";
const INFERENCE_API_VERSION: &str = "2024-10-01";
const AUTHORIZATION_API_VERSION: &str = "2022-04-01";
const VAULT_DATA_API_VERSION: &str = "7.4";

/// Configuration for the REST clients
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the resource-management control plane
    pub management_url: String,
    /// Base URL of the tenant directory
    pub directory_url: String,
    /// Subscription the resources live in
    pub subscription_id: String,
    /// Bearer token used for all three planes
    pub token: SecretString,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl RestConfig {
    /// Read configuration from `KEYBRIDGE_*` environment variables.
    ///
    /// `KEYBRIDGE_SUBSCRIPTION_ID` and `KEYBRIDGE_TOKEN` are required;
    /// the endpoint URLs default to the public cloud.
    pub fn from_env() -> Result<Self> {
        let subscription_id = std::env::var("KEYBRIDGE_SUBSCRIPTION_ID")
            .map_err(|_| Error::validation("KEYBRIDGE_SUBSCRIPTION_ID is not set"))?;
        let token = std::env::var("KEYBRIDGE_TOKEN")
            .map_err(|_| Error::validation("KEYBRIDGE_TOKEN is not set"))?;
        Ok(Self {
            management_url: std::env::var("KEYBRIDGE_MANAGEMENT_URL")
                .unwrap_or_else(|_| "https://management.azure.com".to_string()),
            directory_url: std::env::var("KEYBRIDGE_DIRECTORY_URL")
                .unwrap_or_else(|_| "https://graph.microsoft.com".to_string()),
            subscription_id,
            token: SecretString::new(token),
            timeout_secs: 30,
        })
    }
}

/// The three REST clients, sharing one HTTP backend
#[derive(Debug, Clone)]
pub struct RestClients {
    /// Tenant directory client
    pub directory: RestDirectory,
    /// Control-plane client
    pub control: RestControlPlane,
    /// Vault data-plane client
    pub vault: RestVaultData,
}

impl RestClients {
    /// Build the clients from a config
    pub fn new(config: RestConfig) -> Result<Self> {
        let backend = HttpBackend::new(&config.token, Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            directory: RestDirectory {
                http: backend.clone(),
                base_url: config.directory_url.trim_end_matches('/').to_string(),
            },
            control: RestControlPlane {
                http: backend.clone(),
                base_url: config.management_url.trim_end_matches('/').to_string(),
                subscription_id: config.subscription_id,
            },
            vault: RestVaultData { http: backend },
        })
    }
}

/// Tenant directory client
#[derive(Debug, Clone)]
pub struct RestDirectory {
    http: HttpBackend,
    base_url: String,
}

#[async_trait]
impl DirectoryApi for RestDirectory {
    async fn find_service_principals(&self, display_name: &str) -> Result<Vec<ServicePrincipal>> {
        let mut url = Url::parse(&format!(
            "{}/{}/servicePrincipals",
            self.base_url, DIRECTORY_API_VERSION
        ))
        .map_err(|e| Error::validation(format!("invalid directory URL: {}", e)))?;
        // The filter value is user-supplied; single quotes are doubled per
        // the OData escaping rules and the whole expression is query-encoded.
        let filter = format!("displayName eq '{}'", display_name.replace('\'', "''"));
        url.query_pairs_mut().append_pair("$filter", &filter);

        debug!(workspace = %display_name, "looking up service principal");
        let body = self.http.get(url.as_str()).await?;
        let items = body["value"].as_array().cloned().unwrap_or_default();
        items
            .iter()
            .map(|v| {
                Ok(ServicePrincipal {
                    object_id: require_str(v, "id")?,
                    display_name: require_str(v, "displayName")?,
                })
            })
            .collect()
    }

    async fn current_caller(&self) -> Result<CallerIdentity> {
        let me = self
            .http
            .get(&format!("{}/{}/me", self.base_url, DIRECTORY_API_VERSION))
            .await?;
        let org = self
            .http
            .get(&format!(
                "{}/{}/organization",
                self.base_url, DIRECTORY_API_VERSION
            ))
            .await?;
        let tenant_id = org["value"]
            .as_array()
            .and_then(|v| v.first())
            .and_then(|o| o["id"].as_str())
            .ok_or_else(|| Error::api("directory returned no organization"))?
            .to_string();
        Ok(CallerIdentity {
            object_id: require_str(&me, "id")?,
            tenant_id,
        })
    }
}

/// Resource-management control-plane client
#[derive(Debug, Clone)]
pub struct RestControlPlane {
    http: HttpBackend,
    base_url: String,
    subscription_id: String,
}

impl RestControlPlane {
    fn subscription_url(&self) -> String {
        format!("{}/subscriptions/{}", self.base_url, self.subscription_id)
    }

    fn vault_url(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}/resourceGroups/{}/providers/Microsoft.KeyVault/vaults/{}?api-version={}",
            self.subscription_url(),
            resource_group,
            name,
            VAULT_API_VERSION
        )
    }

    fn account_url(&self, resource_group: &str, name: &str, suffix: &str) -> String {
        format!(
            "{}/resourceGroups/{}/providers/Microsoft.CognitiveServices/accounts/{}{}?api-version={}",
            self.subscription_url(),
            resource_group,
            name,
            suffix,
            INFERENCE_API_VERSION
        )
    }

    /// Scope string for role assignments on an account
    fn account_scope(&self, resource_group: &str, account: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.CognitiveServices/accounts/{}",
            self.subscription_id, resource_group, account
        )
    }

    fn role_definition_id(&self, role_id: &str) -> String {
        format!(
            "/subscriptions/{}/providers/Microsoft.Authorization/roleDefinitions/{}",
            self.subscription_id, role_id
        )
    }
}

#[async_trait]
impl ControlPlaneApi for RestControlPlane {
    async fn ensure_resource_group(
        &self,
        name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        let url = format!(
            "{}/resourcegroups/{}?api-version={}",
            self.subscription_url(),
            name,
            RESOURCE_API_VERSION
        );
        self.http
            .put(&url, &json!({ "location": location, "tags": tags }))
            .await?;
        Ok(())
    }

    async fn delete_resource_group(&self, name: &str) -> Result<()> {
        let url = format!(
            "{}/resourcegroups/{}?api-version={}",
            self.subscription_url(),
            name,
            RESOURCE_API_VERSION
        );
        self.http.delete(&url).await
    }

    async fn get_secret_store(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<SecretStore>> {
        match self
            .http
            .get_optional(&self.vault_url(resource_group, name))
            .await?
        {
            Some(body) => Ok(Some(parse_secret_store(&body)?)),
            None => Ok(None),
        }
    }

    async fn put_secret_store(
        &self,
        resource_group: &str,
        name: &str,
        spec: &SecretStoreSpec,
    ) -> Result<SecretStore> {
        let policies: Vec<Value> = spec
            .access_policies
            .iter()
            .map(|p| {
                json!({
                    "tenantId": p.tenant_id,
                    "objectId": p.object_id,
                    "permissions": { "secrets": p.secret_permissions }
                })
            })
            .collect();
        let body = json!({
            "location": spec.location,
            "tags": spec.tags,
            "properties": {
                "tenantId": spec.tenant_id,
                "sku": { "family": "A", "name": "standard" },
                "enableSoftDelete": true,
                "softDeleteRetentionInDays": spec.soft_delete_retention_days,
                "enablePurgeProtection": if spec.purge_protection { Value::Bool(true) } else { Value::Null },
                "accessPolicies": policies,
            }
        });
        let response = self
            .http
            .put(&self.vault_url(resource_group, name), &body)
            .await?;
        parse_secret_store(&response)
    }

    async fn purge_secret_store(&self, name: &str, location: &str) -> Result<()> {
        let url = format!(
            "{}/providers/Microsoft.KeyVault/locations/{}/deletedVaults/{}/purge?api-version={}",
            self.subscription_url(),
            location,
            name,
            VAULT_API_VERSION
        );
        self.http.post_unit(&url, None).await
    }

    async fn get_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<InferenceAccount>> {
        match self
            .http
            .get_optional(&self.account_url(resource_group, name, ""))
            .await?
        {
            Some(body) => Ok(Some(parse_account(&body)?)),
            None => Ok(None),
        }
    }

    async fn put_account(
        &self,
        resource_group: &str,
        name: &str,
        spec: &InferenceAccountSpec,
    ) -> Result<InferenceAccount> {
        let body = json!({
            "location": spec.location,
            "kind": "OpenAI",
            "sku": { "name": spec.sku },
            "tags": spec.tags,
            "properties": { "customSubDomainName": spec.custom_subdomain }
        });
        let response = self
            .http
            .put(&self.account_url(resource_group, name, ""), &body)
            .await?;
        parse_account(&response)
    }

    async fn purge_account(&self, name: &str, location: &str) -> Result<()> {
        let url = format!(
            "{}/providers/Microsoft.CognitiveServices/locations/{}/deletedAccounts/{}?api-version={}",
            self.subscription_url(),
            location,
            name,
            INFERENCE_API_VERSION
        );
        self.http.delete(&url).await
    }

    async fn list_deployments(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<ModelDeployment>> {
        let body = self
            .http
            .get(&self.account_url(resource_group, account, "/deployments"))
            .await?;
        body["value"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .map(parse_deployment)
            .collect()
    }

    async fn put_deployment(
        &self,
        resource_group: &str,
        account: &str,
        deployment: &ModelDeployment,
    ) -> Result<()> {
        let suffix = format!("/deployments/{}", deployment.name);
        let body = json!({
            "sku": { "name": "Standard", "capacity": deployment.capacity },
            "properties": {
                "model": {
                    "format": "OpenAI",
                    "name": deployment.model,
                    "version": deployment.version,
                }
            }
        });
        self.http
            .put(&self.account_url(resource_group, account, &suffix), &body)
            .await?;
        Ok(())
    }

    async fn delete_deployment(
        &self,
        resource_group: &str,
        account: &str,
        name: &str,
    ) -> Result<()> {
        let suffix = format!("/deployments/{}", name);
        self.http
            .delete(&self.account_url(resource_group, account, &suffix))
            .await
    }

    async fn account_keys(&self, resource_group: &str, account: &str) -> Result<AccountKeys> {
        let body = self
            .http
            .post(
                &self.account_url(resource_group, account, "/listKeys"),
                None,
            )
            .await?;
        let primary = body["key1"]
            .as_str()
            .ok_or_else(|| Error::api("listKeys response missing key1"))?;
        Ok(AccountKeys {
            primary: SecretString::new(primary),
        })
    }

    async fn list_role_assignments(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<RoleAssignment>> {
        let url = format!(
            "{}{}/providers/Microsoft.Authorization/roleAssignments?api-version={}",
            self.base_url,
            self.account_scope(resource_group, account),
            AUTHORIZATION_API_VERSION
        );
        let body = self.http.get(&url).await?;
        let items = body["value"].as_array().cloned().unwrap_or_default();
        items
            .iter()
            .map(|v| {
                let role_definition = require_str(&v["properties"], "roleDefinitionId")?;
                Ok(RoleAssignment {
                    name: require_str(v, "name")?,
                    principal_id: require_str(&v["properties"], "principalId")?,
                    // Callers compare bare role ids; strip the subscription prefix
                    role_id: role_definition
                        .rsplit('/')
                        .next()
                        .unwrap_or(&role_definition)
                        .to_string(),
                })
            })
            .collect()
    }

    async fn put_role_assignment(
        &self,
        resource_group: &str,
        account: &str,
        assignment: &RoleAssignment,
    ) -> Result<()> {
        let url = format!(
            "{}{}/providers/Microsoft.Authorization/roleAssignments/{}?api-version={}",
            self.base_url,
            self.account_scope(resource_group, account),
            assignment.name,
            AUTHORIZATION_API_VERSION
        );
        let body = json!({
            "properties": {
                "roleDefinitionId": self.role_definition_id(&assignment.role_id),
                "principalId": assignment.principal_id,
                "principalType": "ServicePrincipal",
            }
        });
        self.http.put(&url, &body).await?;
        Ok(())
    }
}

/// Secret store data-plane client
#[derive(Debug, Clone)]
pub struct RestVaultData {
    http: HttpBackend,
}

#[async_trait]
impl VaultDataApi for RestVaultData {
    async fn set_secret(&self, vault_uri: &str, name: &str, value: &SecretString) -> Result<()> {
        let url = format!(
            "{}/secrets/{}?api-version={}",
            vault_uri.trim_end_matches('/'),
            name,
            VAULT_DATA_API_VERSION
        );
        self.http
            .put(&url, &json!({ "value": value.expose() }))
            .await?;
        Ok(())
    }
}

fn require_str(value: &Value, field: &str) -> Result<String> {
    value[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::api(format!("response missing field '{}'", field)))
}

fn parse_secret_store(body: &Value) -> Result<SecretStore> {
    let props = &body["properties"];
    let access_policies = props["accessPolicies"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|p| {
            let permissions: Vec<SecretPermission> =
                serde_json::from_value(p["permissions"]["secrets"].clone()).unwrap_or_default();
            Ok(AccessPolicyEntry {
                tenant_id: require_str(p, "tenantId")?,
                object_id: require_str(p, "objectId")?,
                secret_permissions: permissions,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SecretStore {
        name: require_str(body, "name")?,
        uri: require_str(props, "vaultUri")?,
        properties: SecretStoreSpec {
            location: require_str(body, "location")?,
            tenant_id: require_str(props, "tenantId")?,
            soft_delete_retention_days: props["softDeleteRetentionInDays"].as_u64().unwrap_or(0)
                as u32,
            purge_protection: props["enablePurgeProtection"].as_bool().unwrap_or(false),
            access_policies,
            tags: serde_json::from_value(body["tags"].clone()).unwrap_or_default(),
        },
    })
}

fn parse_account(body: &Value) -> Result<InferenceAccount> {
    let props = &body["properties"];
    Ok(InferenceAccount {
        name: require_str(body, "name")?,
        endpoint: require_str(props, "endpoint")?,
        properties: InferenceAccountSpec {
            location: require_str(body, "location")?,
            sku: require_str(&body["sku"], "name")?,
            custom_subdomain: props["customSubDomainName"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            tags: serde_json::from_value(body["tags"].clone()).unwrap_or_default(),
        },
    })
}

fn parse_deployment(body: &Value) -> Result<ModelDeployment> {
    let model = &body["properties"]["model"];
    Ok(ModelDeployment {
        name: require_str(body, "name")?,
        model: require_str(model, "name")?,
        version: require_str(model, "version")?,
        capacity: body["sku"]["capacity"].as_u64().unwrap_or(0) as u32,
    })
}
