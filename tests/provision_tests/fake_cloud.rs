//! In-memory fake of the cloud API traits.
//!
//! Records full resource state so tests can assert convergence and
//! idempotence (two runs with identical inputs leave byte-identical state).
//! Failure injection covers the error taxonomy: transient directory
//! failures, region model availability, and permission denials.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use keybridge::cloud::{
    AccountKeys, CallerIdentity, ControlPlaneApi, DirectoryApi, InferenceAccount,
    InferenceAccountSpec, ModelDeployment, RoleAssignment, SecretStore, SecretStoreSpec,
    SecretString, ServicePrincipal, VaultDataApi,
};
use keybridge::{Error, Result};

/// Everything the fake cloud knows, comparable across runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CloudState {
    pub resource_groups: BTreeMap<String, (String, BTreeMap<String, String>)>,
    pub stores: BTreeMap<(String, String), SecretStore>,
    pub deleted_stores: BTreeSet<String>,
    pub accounts: BTreeMap<(String, String), InferenceAccount>,
    pub deleted_accounts: BTreeSet<String>,
    pub deployments: BTreeMap<(String, String), BTreeMap<String, ModelDeployment>>,
    pub role_assignments: BTreeMap<(String, String), BTreeMap<String, RoleAssignment>>,
    /// vault uri -> secret name -> current value
    pub secrets: BTreeMap<String, BTreeMap<String, String>>,
}

pub struct FakeCloud {
    pub state: Mutex<CloudState>,
    pub principals: Vec<ServicePrincipal>,
    pub caller: CallerIdentity,
    /// Model names that fail deployment with ModelUnavailable
    pub unavailable_models: HashSet<String>,
    /// When set, role assignment writes fail with InsufficientPermissions
    pub forbid_role_assignments: bool,
    /// Fail this many directory lookups with a transient error first
    pub directory_failures: AtomicU32,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CloudState::default()),
            principals: Vec::new(),
            caller: CallerIdentity {
                object_id: "caller-1".to_string(),
                tenant_id: "tenant-1".to_string(),
            },
            unavailable_models: HashSet::new(),
            forbid_role_assignments: false,
            directory_failures: AtomicU32::new(0),
        }
    }

    pub fn with_principal(mut self, object_id: &str, display_name: &str) -> Self {
        self.principals.push(ServicePrincipal {
            object_id: object_id.to_string(),
            display_name: display_name.to_string(),
        });
        self
    }

    pub fn snapshot(&self) -> CloudState {
        self.state.lock().unwrap().clone()
    }

    fn vault_uri(name: &str) -> String {
        format!("https://{}.vault.example.net/", name)
    }

    fn endpoint(name: &str) -> String {
        format!("https://{}.inference.example.net/", name)
    }

    pub fn primary_key(account: &str) -> String {
        format!("key-{}-primary", account)
    }
}

#[async_trait]
impl DirectoryApi for FakeCloud {
    async fn find_service_principals(&self, display_name: &str) -> Result<Vec<ServicePrincipal>> {
        if self
            .directory_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::api("directory unreachable"));
        }
        Ok(self
            .principals
            .iter()
            .filter(|p| p.display_name == display_name)
            .cloned()
            .collect())
    }

    async fn current_caller(&self) -> Result<CallerIdentity> {
        Ok(self.caller.clone())
    }
}

#[async_trait]
impl ControlPlaneApi for FakeCloud {
    async fn ensure_resource_group(
        &self,
        name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.state.lock().unwrap().resource_groups.insert(
            name.to_string(),
            (location.to_string(), tags.clone()),
        );
        Ok(())
    }

    async fn delete_resource_group(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.resource_groups.remove(name);

        let store_names: Vec<_> = state
            .stores
            .keys()
            .filter(|(rg, _)| rg == name)
            .cloned()
            .collect();
        for key in store_names {
            let store = state.stores.remove(&key).unwrap();
            // Soft delete: the name stays occupied until purged
            state.deleted_stores.insert(key.1);
            state.secrets.remove(&store.uri);
        }

        let account_names: Vec<_> = state
            .accounts
            .keys()
            .filter(|(rg, _)| rg == name)
            .cloned()
            .collect();
        for key in account_names {
            state.accounts.remove(&key);
            state.deployments.remove(&key);
            state.role_assignments.remove(&key);
            state.deleted_accounts.insert(key.1);
        }
        Ok(())
    }

    async fn get_secret_store(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<SecretStore>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .stores
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn put_secret_store(
        &self,
        resource_group: &str,
        name: &str,
        spec: &SecretStoreSpec,
    ) -> Result<SecretStore> {
        let mut state = self.state.lock().unwrap();
        if state.deleted_stores.contains(name) {
            return Err(Error::api(format!(
                "conflict: vault name '{}' is held by a soft-deleted vault",
                name
            )));
        }
        let store = SecretStore {
            name: name.to_string(),
            uri: Self::vault_uri(name),
            properties: spec.clone(),
        };
        state
            .stores
            .insert((resource_group.to_string(), name.to_string()), store.clone());
        Ok(store)
    }

    async fn purge_secret_store(&self, name: &str, _location: &str) -> Result<()> {
        self.state.lock().unwrap().deleted_stores.remove(name);
        Ok(())
    }

    async fn get_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<InferenceAccount>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .accounts
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn put_account(
        &self,
        resource_group: &str,
        name: &str,
        spec: &InferenceAccountSpec,
    ) -> Result<InferenceAccount> {
        let mut state = self.state.lock().unwrap();
        if state.deleted_accounts.contains(name) {
            return Err(Error::api(format!(
                "conflict: account name '{}' is held by a soft-deleted account",
                name
            )));
        }
        let account = InferenceAccount {
            name: name.to_string(),
            endpoint: Self::endpoint(name),
            properties: spec.clone(),
        };
        state
            .accounts
            .insert((resource_group.to_string(), name.to_string()), account.clone());
        Ok(account)
    }

    async fn purge_account(&self, name: &str, _location: &str) -> Result<()> {
        self.state.lock().unwrap().deleted_accounts.remove(name);
        Ok(())
    }

    async fn list_deployments(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<ModelDeployment>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .deployments
            .get(&(resource_group.to_string(), account.to_string()))
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn put_deployment(
        &self,
        resource_group: &str,
        account: &str,
        deployment: &ModelDeployment,
    ) -> Result<()> {
        if self.unavailable_models.contains(&deployment.model) {
            return Err(Error::model_unavailable(format!(
                "model '{}' version '{}' is not available in this region",
                deployment.model, deployment.version
            )));
        }
        self.state
            .lock()
            .unwrap()
            .deployments
            .entry((resource_group.to_string(), account.to_string()))
            .or_default()
            .insert(deployment.name.clone(), deployment.clone());
        Ok(())
    }

    async fn delete_deployment(
        &self,
        resource_group: &str,
        account: &str,
        name: &str,
    ) -> Result<()> {
        if let Some(m) = self
            .state
            .lock()
            .unwrap()
            .deployments
            .get_mut(&(resource_group.to_string(), account.to_string()))
        {
            m.remove(name);
        }
        Ok(())
    }

    async fn account_keys(&self, resource_group: &str, account: &str) -> Result<AccountKeys> {
        let state = self.state.lock().unwrap();
        if !state
            .accounts
            .contains_key(&(resource_group.to_string(), account.to_string()))
        {
            return Err(Error::api(format!("account '{}' not found", account)));
        }
        Ok(AccountKeys {
            primary: SecretString::new(Self::primary_key(account)),
        })
    }

    async fn list_role_assignments(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<RoleAssignment>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .role_assignments
            .get(&(resource_group.to_string(), account.to_string()))
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn put_role_assignment(
        &self,
        resource_group: &str,
        account: &str,
        assignment: &RoleAssignment,
    ) -> Result<()> {
        if self.forbid_role_assignments {
            return Err(Error::insufficient_permissions(
                "the client does not have authorization to perform action 'roleAssignments/write'",
            ));
        }
        self.state
            .lock()
            .unwrap()
            .role_assignments
            .entry((resource_group.to_string(), account.to_string()))
            .or_default()
            .insert(assignment.name.clone(), assignment.clone());
        Ok(())
    }
}

#[async_trait]
impl VaultDataApi for FakeCloud {
    async fn set_secret(&self, vault_uri: &str, name: &str, value: &SecretString) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let known = state.stores.values().any(|s| s.uri == vault_uri);
        if !known {
            return Err(Error::api(format!("no vault at '{}'", vault_uri)));
        }
        state
            .secrets
            .entry(vault_uri.to_string())
            .or_default()
            .insert(name.to_string(), value.expose().to_string());
        Ok(())
    }
}
