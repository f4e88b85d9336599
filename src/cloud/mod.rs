//! Cloud API abstraction layer
//!
//! This module provides trait-based abstractions for the three external
//! collaborators keybridge talks to: the tenant directory (service principal
//! lookup), the resource-management control plane (stores, accounts,
//! deployments, role assignments), and the secret store's data plane
//! (writing secret values).
//!
//! keybridge only issues well-formed requests against these traits and
//! interprets success/failure; none of the providers' own reconciliation
//! logic is reimplemented here. The production implementations live in
//! [`rest`]; tests substitute mocks or an in-memory fake.

pub mod rest;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A secret value that must never appear in logs, errors, or output
///
/// Wraps the value in [`zeroize::Zeroizing`] so it is wiped on drop, and
/// redacts `Debug` formatting. Only [`SecretString::expose`] yields the
/// underlying string; call sites are the audit surface.
#[derive(Clone)]
pub struct SecretString(zeroize::Zeroizing<String>);

impl SecretString {
    /// Wrap a sensitive value
    pub fn new(value: impl Into<String>) -> Self {
        Self(zeroize::Zeroizing::new(value.into()))
    }

    /// Access the underlying value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([redacted])")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A service principal as returned by the tenant directory
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    /// Directory object identifier
    pub object_id: String,
    /// Human-readable display name
    pub display_name: String,
}

/// The deploying caller's identity, discovered from the directory
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    /// Directory object identifier of the caller
    pub object_id: String,
    /// Tenant the caller belongs to
    pub tenant_id: String,
}

/// Secret-level permission grantable through an access policy
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SecretPermission {
    /// Read a single secret value
    Get,
    /// Enumerate secret names
    List,
    /// Create or overwrite a secret
    Set,
    /// Delete a secret
    Delete,
}

impl SecretPermission {
    /// Full read/write permission set granted to the deployer
    pub fn full() -> Vec<Self> {
        vec![Self::Get, Self::List, Self::Set, Self::Delete]
    }

    /// Read-only permission set granted to the workspace principal
    pub fn read_only() -> Vec<Self> {
        vec![Self::Get, Self::List]
    }
}

/// One entry in a secret store's access policy list, keyed by object id
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyEntry {
    /// Tenant of the principal
    pub tenant_id: String,
    /// Principal object identifier (the set key)
    pub object_id: String,
    /// Secret permissions granted to the principal
    pub secret_permissions: Vec<SecretPermission>,
}

/// Desired state for a secret store
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretStoreSpec {
    /// Deployment location
    pub location: String,
    /// Tenant the store authenticates against
    pub tenant_id: String,
    /// Days a deleted store/secret is recoverable before purge
    pub soft_delete_retention_days: u32,
    /// Whether purge of soft-deleted state is blocked
    pub purge_protection: bool,
    /// Access policy list (set semantics, keyed by `object_id`)
    pub access_policies: Vec<AccessPolicyEntry>,
    /// Resource tags
    pub tags: BTreeMap<String, String>,
}

/// A provisioned secret store (desired spec plus provider-assigned fields)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretStore {
    /// Store name
    pub name: String,
    /// Data-plane URI (e.g. `https://kv-dev.vault.example.net/`)
    pub uri: String,
    /// Current properties
    pub properties: SecretStoreSpec,
}

/// Desired state for an inference account
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceAccountSpec {
    /// Deployment location
    pub location: String,
    /// SKU name (fixed `S0` for keybridge)
    pub sku: String,
    /// Custom subdomain, required for identity-based data-plane auth
    pub custom_subdomain: String,
    /// Resource tags
    pub tags: BTreeMap<String, String>,
}

/// A provisioned inference account
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceAccount {
    /// Account name
    pub name: String,
    /// Data-plane endpoint URL
    pub endpoint: String,
    /// Current properties
    pub properties: InferenceAccountSpec,
}

/// A model deployment hosted on an inference account, keyed by `name`
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelDeployment {
    /// Deployment name (the idempotency key)
    pub name: String,
    /// Model family (e.g. `gpt-4.1-mini`)
    pub model: String,
    /// Model version pin
    pub version: String,
    /// Provisioned throughput capacity
    pub capacity: u32,
}

/// A data-plane role assignment scoped to an inference account
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    /// Deterministic assignment name (the idempotency key)
    pub name: String,
    /// Principal receiving the role
    pub principal_id: String,
    /// Role definition identifier
    pub role_id: String,
}

/// Access keys for an inference account
#[derive(Clone, Debug)]
pub struct AccountKeys {
    /// Primary long-lived access key
    pub primary: SecretString,
}

/// Tenant directory operations (read-only)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// List service principals whose display name matches exactly
    async fn find_service_principals(&self, display_name: &str) -> Result<Vec<ServicePrincipal>>;

    /// Discover the identity of the authenticated caller
    async fn current_caller(&self) -> Result<CallerIdentity>;
}

/// Resource-management control plane operations
///
/// All `put_*` operations are idempotent upserts keyed by resource name, as
/// guaranteed by the underlying deployment engine; keybridge relies on that
/// contract instead of implementing its own locking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlaneApi: Send + Sync {
    /// Ensure the resource group exists with the given tags
    async fn ensure_resource_group(
        &self,
        name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Delete the resource group and everything in it
    async fn delete_resource_group(&self, name: &str) -> Result<()>;

    /// Read a secret store, `None` if it does not exist
    async fn get_secret_store(&self, resource_group: &str, name: &str)
        -> Result<Option<SecretStore>>;

    /// Create or update a secret store
    async fn put_secret_store(
        &self,
        resource_group: &str,
        name: &str,
        spec: &SecretStoreSpec,
    ) -> Result<SecretStore>;

    /// Purge a soft-deleted secret store, vacating its name (irreversible)
    async fn purge_secret_store(&self, name: &str, location: &str) -> Result<()>;

    /// Read an inference account, `None` if it does not exist
    async fn get_account(&self, resource_group: &str, name: &str)
        -> Result<Option<InferenceAccount>>;

    /// Create or update an inference account
    async fn put_account(
        &self,
        resource_group: &str,
        name: &str,
        spec: &InferenceAccountSpec,
    ) -> Result<InferenceAccount>;

    /// Purge a soft-deleted inference account (irreversible)
    async fn purge_account(&self, name: &str, location: &str) -> Result<()>;

    /// List model deployments on an account
    async fn list_deployments(&self, resource_group: &str, account: &str)
        -> Result<Vec<ModelDeployment>>;

    /// Create or update a model deployment (keyed by deployment name)
    async fn put_deployment(
        &self,
        resource_group: &str,
        account: &str,
        deployment: &ModelDeployment,
    ) -> Result<()>;

    /// Delete a model deployment
    async fn delete_deployment(&self, resource_group: &str, account: &str, name: &str)
        -> Result<()>;

    /// Fetch the account's access keys
    async fn account_keys(&self, resource_group: &str, account: &str) -> Result<AccountKeys>;

    /// List role assignments scoped to an account
    async fn list_role_assignments(&self, resource_group: &str, account: &str)
        -> Result<Vec<RoleAssignment>>;

    /// Create a role assignment scoped to an account (keyed by assignment name)
    async fn put_role_assignment(
        &self,
        resource_group: &str,
        account: &str,
        assignment: &RoleAssignment,
    ) -> Result<()>;
}

/// Secret store data-plane operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultDataApi: Send + Sync {
    /// Create or overwrite a secret; the store versions internally, writes
    /// always target "current"
    async fn set_secret(&self, vault_uri: &str, name: &str, value: &SecretString) -> Result<()>;
}
