//! Error types for keybridge operations

use thiserror::Error;

/// Main error type for keybridge operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Workspace name matched zero service principals in the directory
    #[error("no service principal found with display name '{name}'")]
    LookupNotFound {
        /// The workspace display name that was looked up
        name: String,
    },

    /// Workspace name matched more than one service principal
    #[error("workspace name '{name}' matched {count} service principals; pass the object id explicitly")]
    LookupAmbiguous {
        /// The workspace display name that was looked up
        name: String,
        /// Number of principals that matched
        count: usize,
    },

    /// Caller lacks rights for a control-plane write (role assignments, access policies)
    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// Requested model/version is not offered in the chosen region
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Any other failure reported by a cloud API, surfaced verbatim
    #[error("cloud api error: {0}")]
    Api(String),

    /// Validation error for the environment spec
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a lookup-not-found error for the given workspace name
    pub fn lookup_not_found(name: impl Into<String>) -> Self {
        Self::LookupNotFound { name: name.into() }
    }

    /// Create an ambiguous-lookup error for the given workspace name
    pub fn lookup_ambiguous(name: impl Into<String>, count: usize) -> Self {
        Self::LookupAmbiguous {
            name: name.into(),
            count,
        }
    }

    /// Create an insufficient-permissions error with the given message
    pub fn insufficient_permissions(msg: impl Into<String>) -> Self {
        Self::InsufficientPermissions(msg.into())
    }

    /// Create a model-unavailable error with the given message
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a cloud API error with the given message
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Returns true if this error is a transient transport failure that the
    /// resolver may downgrade to degraded mode after its single retry.
    ///
    /// Ambiguity and permission errors are never transient: downgrading them
    /// would grant access to the wrong principal or hide a policy problem.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
