//! keybridge - secrets-backed credential bridge provisioning
//!
//! keybridge provisions a credential bridge between a managed compute
//! workspace and a credential store: a soft-delete-enabled secret store, an
//! AI inference account with two fixed model deployments, access policies
//! and a data-plane role assignment for the workspace's backing service
//! principal, and the inference credentials published into the store under
//! well-known secret names.
//!
//! # Architecture
//!
//! Every provisioning step is an idempotent "ensure desired state" apply:
//! read current state, compute the desired state from the environment spec,
//! write only the difference. There is no saga or rollback logic — a failed
//! or interrupted run leaves converged resources intact and re-running the
//! whole sequence converges to the same end state.
//!
//! # Modules
//!
//! - [`spec`] - Environment specification (the YAML input to every command)
//! - [`cloud`] - Cloud API traits and their REST implementations
//! - [`resolver`] - Workspace name to service principal resolution
//! - [`provision`] - The provisioners, secret publisher, and output emitter
//! - [`commands`] - CLI commands (provision, outputs, resolve, down)
//! - [`retry`] - Backoff/jitter retry for transient directory failures
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod cloud;
pub mod commands;
pub mod error;
pub mod provision;
pub mod resolver;
pub mod retry;
pub mod spec;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================
// Fixed, template-authoring-time values. Secret names and deployment names
// are part of the published contract: downstream consumers read them from
// the deployment outputs.

/// Secret name under which the inference endpoint URL is published
pub const SECRET_NAME_OPENAI_ENDPOINT: &str = "openai-endpoint";

/// Secret name under which the inference API key is published
pub const SECRET_NAME_OPENAI_API_KEY: &str = "openai-api-key";

/// Chat model deployment name (doubles as the model family name)
pub const GPT_DEPLOYMENT_NAME: &str = "gpt-4.1-mini";

/// Pinned chat model version
pub const GPT_MODEL_VERSION: &str = "2025-04-14";

/// Embedding model deployment name (doubles as the model family name)
pub const EMBEDDING_DEPLOYMENT_NAME: &str = "text-embedding-3-large";

/// Pinned embedding model version
pub const EMBEDDING_MODEL_VERSION: &str = "1";

/// Provisioned capacity for each model deployment (thousands of tokens/min)
pub const MODEL_CAPACITY: u32 = 10;

/// Fixed SKU for the inference account
pub const INFERENCE_SKU: &str = "S0";

/// Soft-delete retention window for the secret store, in days
pub const SOFT_DELETE_RETENTION_DAYS: u32 = 90;

/// Role definition id of the Cognitive Services OpenAI User data-plane role
pub const OPENAI_USER_ROLE_ID: &str = "5e0bd9bd-7b93-4f28-af87-19fc36ad61bd";
