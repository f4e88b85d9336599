//! Identity resolver
//!
//! Resolves a workspace display name to the object id of its backing
//! service principal via the tenant directory. The lookup is read-only and
//! retried at most once on transport failures; everything downstream treats
//! the resolved principal as immutable for the rest of the deployment.

use tracing::{info, warn};

use crate::cloud::DirectoryApi;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::{Error, Result};

/// How a principal was obtained, recorded for the deployment log
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrincipalSource {
    /// Resolved through the directory lookup
    Lookup,
    /// Supplied manually in the environment spec
    Manual,
}

/// A workspace principal resolved once per deployment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPrincipal {
    /// Directory object identifier
    pub object_id: String,
    /// Where the id came from
    pub source: PrincipalSource,
}

impl ResolvedPrincipal {
    /// Construct a manually supplied principal
    pub fn manual(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            source: PrincipalSource::Manual,
        }
    }
}

/// Outcome of the resolver step
///
/// `Degraded` is a successful outcome: the deployment proceeds without the
/// workspace access grant and the operator is warned to configure the
/// principal manually. Only ambiguity and non-transient failures are fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// A principal is available for access grants
    Resolved(ResolvedPrincipal),
    /// No principal; workspace grants are omitted
    Degraded {
        /// Why the deployment is degraded, for the operator warning
        reason: String,
    },
}

impl Resolution {
    /// The principal, if one was resolved
    pub fn principal(&self) -> Option<&ResolvedPrincipal> {
        match self {
            Self::Resolved(p) => Some(p),
            Self::Degraded { .. } => None,
        }
    }
}

/// Resolve the workspace principal for a deployment.
///
/// Precedence: a manual `principal_id` override wins over the directory
/// lookup; an absent/empty workspace name skips the step entirely.
///
/// Lookup semantics: exactly one match resolves; zero matches and transient
/// directory failures (after one retry) degrade; multiple matches are fatal
/// because guessing could grant secret access to the wrong principal.
pub async fn resolve_workspace_principal(
    directory: &dyn DirectoryApi,
    workspace_name: Option<&str>,
    principal_id: Option<&str>,
) -> Result<Resolution> {
    if let Some(id) = principal_id {
        info!(principal = %id, "using manually configured workspace principal");
        return Ok(Resolution::Resolved(ResolvedPrincipal::manual(id)));
    }

    let Some(name) = workspace_name.filter(|n| !n.is_empty()) else {
        warn!("no workspace configured; provisioning without workspace access grants");
        return Ok(Resolution::Degraded {
            reason: "no workspace name supplied".to_string(),
        });
    };

    let retry = RetryConfig::with_max_attempts(2);
    let matches = match retry_with_backoff(&retry, "service_principal_lookup", || {
        directory.find_service_principals(name)
    })
    .await
    {
        Ok(matches) => matches,
        Err(e) if e.is_transient() => {
            warn!(
                workspace = %name,
                error = %e,
                "directory lookup failed after retry; set workspacePrincipalId manually"
            );
            return Ok(Resolution::Degraded {
                reason: format!("directory lookup for '{}' failed: {}", name, e),
            });
        }
        Err(e) => return Err(e),
    };

    match matches.len() {
        0 => {
            let err = Error::lookup_not_found(name);
            warn!(workspace = %name, "{}; set workspacePrincipalId manually", err);
            Ok(Resolution::Degraded {
                reason: err.to_string(),
            })
        }
        1 => {
            let principal = &matches[0];
            info!(
                workspace = %name,
                principal = %principal.object_id,
                "resolved workspace service principal"
            );
            Ok(Resolution::Resolved(ResolvedPrincipal {
                object_id: principal.object_id.clone(),
                source: PrincipalSource::Lookup,
            }))
        }
        n => Err(Error::lookup_ambiguous(name, n)),
    }
}

/// Strict variant used by `keybridge resolve`: zero matches is an error
/// instead of degraded mode, since the operator explicitly asked for the id.
pub async fn lookup_principal(
    directory: &dyn DirectoryApi,
    workspace_name: &str,
) -> Result<ResolvedPrincipal> {
    if workspace_name.is_empty() {
        return Err(Error::validation("workspace name must not be empty"));
    }
    let matches = directory.find_service_principals(workspace_name).await?;
    match matches.len() {
        0 => Err(Error::lookup_not_found(workspace_name)),
        1 => Ok(ResolvedPrincipal {
            object_id: matches[0].object_id.clone(),
            source: PrincipalSource::Lookup,
        }),
        n => Err(Error::lookup_ambiguous(workspace_name, n)),
    }
}
