//! Environment specification
//!
//! The environment spec is the single YAML input to every keybridge command.
//! It names the environment, picks the deployment region, and optionally
//! identifies the workspace whose service principal should be granted access
//! to the provisioned resources.
//!
//! Resource names are derived from the environment name unless overridden,
//! making the spec GitOps-friendly: the same file drives `provision`,
//! `outputs`, and `down`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tag applied to every resource keybridge creates
pub const TAG_MANAGED_BY: &str = "managed-by";
/// Value of the managed-by tag
pub const TAG_MANAGED_BY_VALUE: &str = "keybridge";
/// Tag carrying the environment name
pub const TAG_ENVIRONMENT: &str = "environment";

/// Secret store names are limited by the provider to 3-24 characters.
const VAULT_NAME_MAX: usize = 24;

/// Specification for a keybridge environment
///
/// Either `workspace` (display name, resolved via the directory) or
/// `workspacePrincipalId` (manual override) identifies the workspace
/// principal. If both are absent the deployment runs in degraded mode:
/// everything is provisioned but no workspace access is granted.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnvironmentSpec {
    /// Environment name, used as the suffix for derived resource names
    pub name: String,

    /// Deployment location/region (e.g. "eastus2")
    pub location: String,

    /// Workspace display name, resolved to a service principal at deploy time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Manual service principal object id, bypassing the directory lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_principal_id: Option<String>,

    /// Resource group override (derived as `rg-<name>` when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,

    /// Secret store name override (derived as `kv-<name>` when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_name: Option<String>,

    /// Inference account name override (derived as `oai-<name>` when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

impl EnvironmentSpec {
    /// Load and validate a spec from a YAML file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse and validate a spec from YAML content
    pub fn parse(content: &str) -> Result<Self> {
        let spec: Self = serde_yaml::from_str(content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Validate the environment specification
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("environment name must not be empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            || !self.name.starts_with(|c: char| c.is_ascii_lowercase())
        {
            return Err(Error::validation(format!(
                "environment name '{}' must be lowercase alphanumeric with hyphens, starting with a letter",
                self.name
            )));
        }
        if self.location.is_empty() {
            return Err(Error::validation("location must not be empty"));
        }

        let vault = self.vault_name();
        if vault.len() > VAULT_NAME_MAX {
            return Err(Error::validation(format!(
                "vault name '{}' exceeds {} characters; shorten the environment name or set vaultName",
                vault, VAULT_NAME_MAX
            )));
        }

        Ok(())
    }

    /// Workspace display name, treating the empty string as unset
    pub fn workspace_name(&self) -> Option<&str> {
        self.workspace.as_deref().filter(|w| !w.is_empty())
    }

    /// Resource group name (override or `rg-<name>`)
    pub fn resource_group(&self) -> String {
        self.resource_group
            .clone()
            .unwrap_or_else(|| format!("rg-{}", self.name))
    }

    /// Secret store name (override or `kv-<name>`)
    pub fn vault_name(&self) -> String {
        self.vault_name
            .clone()
            .unwrap_or_else(|| format!("kv-{}", self.name))
    }

    /// Inference account name (override or `oai-<name>`)
    pub fn account_name(&self) -> String {
        self.account_name
            .clone()
            .unwrap_or_else(|| format!("oai-{}", self.name))
    }

    /// Tags applied to every resource in this environment
    pub fn tags(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (TAG_MANAGED_BY.to_string(), TAG_MANAGED_BY_VALUE.to_string()),
            (TAG_ENVIRONMENT.to_string(), self.name.clone()),
        ])
    }
}
