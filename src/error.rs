/// Error types for workspace RBAC configuration
use thiserror::Error;

/// Errors that can occur while configuring workspace access
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    /// The workspace (or another addressed resource) does not exist,
    /// or the credential cannot read it
    #[error("Not found: {0}")]
    NotFound(String),

    /// No role definition with this display name is visible at the scope
    #[error("No role definition named '{role}' found at workspace scope")]
    Lookup {
        /// Role name that was searched for
        role: String,
    },

    /// The caller lacks permission for the operation (HTTP 401/403)
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// An equivalent role assignment already exists (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success response from the management API
    #[error("Management API error (HTTP {status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// No credential source produced a token
    #[error("Credential error: {0}")]
    Credential(String),

    /// Invalid or missing configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Response body did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl RbacError {
    /// Short label used in the outcome table
    pub fn kind(&self) -> &'static str {
        match self {
            RbacError::NotFound(_) => "not found",
            RbacError::Lookup { .. } => "lookup",
            RbacError::Authorization(_) => "authorization",
            RbacError::Conflict(_) => "conflict",
            RbacError::Api { .. } => "api",
            RbacError::Network(_) => "network",
            RbacError::Credential(_) => "credential",
            RbacError::Config(_) => "config",
            RbacError::Parse(_) => "parse",
        }
    }
}

impl From<reqwest::Error> for RbacError {
    fn from(e: reqwest::Error) -> Self {
        RbacError::Network(e.to_string())
    }
}
