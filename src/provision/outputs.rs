//! Output emitter
//!
//! Surfaces resource identifiers, secret *names* (never values), and model
//! deployment names as a fixed set of named key/value pairs for downstream
//! consumption (notebooks, `.env` files, CI). Outputs are recomputable from
//! converged state, so a no-op re-run emits identical values.

use serde::Serialize;

use crate::cloud::{InferenceAccount, SecretStore};
use crate::spec::EnvironmentSpec;
use crate::{
    Result, EMBEDDING_DEPLOYMENT_NAME, GPT_DEPLOYMENT_NAME, SECRET_NAME_OPENAI_API_KEY,
    SECRET_NAME_OPENAI_ENDPOINT,
};

/// The fixed deployment output set
///
/// `keyvault_openai_endpoint` and `keyvault_openai_api_key` hold the secret
/// *names* under which the sensitive values live, not the values themselves.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Outputs {
    /// Secret store data-plane URI
    pub keyvault_uri: String,
    /// Name of the secret holding the inference endpoint URL
    pub keyvault_openai_endpoint: String,
    /// Name of the secret holding the inference API key
    pub keyvault_openai_api_key: String,
    /// Chat model deployment name
    pub openai_gpt_model: String,
    /// Embedding model deployment name
    pub openai_embedding_model: String,
    /// Secret store name
    pub keyvault_name: String,
    /// Inference account name
    pub openai_name: String,
    /// Deployment location
    pub location: String,
    /// Tenant identifier
    pub tenant_id: String,
    /// Resource group name
    pub resource_group: String,
}

impl Outputs {
    /// Assemble outputs from converged resource state
    pub fn collect(spec: &EnvironmentSpec, store: &SecretStore, account: &InferenceAccount) -> Self {
        Self {
            keyvault_uri: store.uri.clone(),
            keyvault_openai_endpoint: SECRET_NAME_OPENAI_ENDPOINT.to_string(),
            keyvault_openai_api_key: SECRET_NAME_OPENAI_API_KEY.to_string(),
            openai_gpt_model: GPT_DEPLOYMENT_NAME.to_string(),
            openai_embedding_model: EMBEDDING_DEPLOYMENT_NAME.to_string(),
            keyvault_name: store.name.clone(),
            openai_name: account.name.clone(),
            location: spec.location.clone(),
            tenant_id: store.properties.tenant_id.clone(),
            resource_group: spec.resource_group(),
        }
    }

    /// Ordered key/value pairs, keys matching the serialized field names
    pub fn as_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("KEYVAULT_URI", &self.keyvault_uri),
            ("KEYVAULT_OPENAI_ENDPOINT", &self.keyvault_openai_endpoint),
            ("KEYVAULT_OPENAI_API_KEY", &self.keyvault_openai_api_key),
            ("OPENAI_GPT_MODEL", &self.openai_gpt_model),
            ("OPENAI_EMBEDDING_MODEL", &self.openai_embedding_model),
            ("KEYVAULT_NAME", &self.keyvault_name),
            ("OPENAI_NAME", &self.openai_name),
            ("LOCATION", &self.location),
            ("TENANT_ID", &self.tenant_id),
            ("RESOURCE_GROUP", &self.resource_group),
        ]
    }

    /// Render as `KEY="value"` lines for a dotenv-style file
    pub fn render_env(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.as_pairs() {
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(value);
            out.push_str("\"\n");
        }
        out
    }

    /// Render as pretty JSON
    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
