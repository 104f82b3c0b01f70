use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RbacError;

// Default configuration constants
pub const DEFAULT_SUBSCRIPTION_ID: &str = "your-sub-id";
pub const DEFAULT_RESOURCE_GROUP: &str = "aml-sec-rg";
pub const DEFAULT_WORKSPACE_NAME: &str = "secure-ml-prod";
pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// What to do with the remaining group/role mappings once one of them fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep going and attempt every mapping
    #[default]
    Continue,
    /// Stop at the first failure; later mappings are reported as skipped
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" | "stop" => Ok(FailurePolicy::Abort),
            other => Err(RbacError::Config(format!(
                "unknown failure policy '{}' (expected 'continue' or 'abort')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Subscription, resource group and workspace being configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTarget {
    pub subscription_id: String,
    pub resource_group: String,
    pub workspace_name: String,
}

impl WorkspaceTarget {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        workspace_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            workspace_name: workspace_name.into(),
        }
    }

    /// Fill each field from the override when given, otherwise from the environment
    pub fn resolve(
        subscription_id: Option<String>,
        resource_group: Option<String>,
        workspace_name: Option<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.unwrap_or_else(get_subscription_id),
            resource_group: resource_group.unwrap_or_else(get_resource_group),
            workspace_name: workspace_name.unwrap_or_else(get_workspace_name),
        }
    }

    pub fn validate(&self) -> Result<(), RbacError> {
        for (label, value) in [
            ("subscription id", &self.subscription_id),
            ("resource group", &self.resource_group),
            ("workspace name", &self.workspace_name),
        ] {
            if value.trim().is_empty() {
                return Err(RbacError::Config(format!("{} must not be empty", label)));
            }
        }
        Ok(())
    }
}

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        dotenvy::from_path(Path::new(path)).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

pub fn get_subscription_id() -> String {
    non_empty_var("AZURE_SUBSCRIPTION_ID").unwrap_or_else(|| DEFAULT_SUBSCRIPTION_ID.to_string())
}

pub fn get_resource_group() -> String {
    non_empty_var("AZURE_RESOURCE_GROUP").unwrap_or_else(|| DEFAULT_RESOURCE_GROUP.to_string())
}

pub fn get_workspace_name() -> String {
    non_empty_var("AML_WORKSPACE_NAME").unwrap_or_else(|| DEFAULT_WORKSPACE_NAME.to_string())
}

pub fn get_resource_manager_url() -> String {
    sanitize_base_url(
        &env::var("AZURE_RESOURCE_MANAGER_URL").unwrap_or_else(|_| DEFAULT_RESOURCE_MANAGER_URL.to_string()),
        DEFAULT_RESOURCE_MANAGER_URL,
    )
}

pub fn get_authority_host() -> String {
    sanitize_base_url(
        &env::var("AZURE_AUTHORITY_HOST").unwrap_or_else(|_| DEFAULT_AUTHORITY_HOST.to_string()),
        DEFAULT_AUTHORITY_HOST,
    )
}

pub fn get_failure_policy() -> Result<FailurePolicy, RbacError> {
    match non_empty_var("AML_RBAC_ON_ERROR") {
        Some(raw) => raw.parse(),
        None => Ok(FailurePolicy::default()),
    }
}

pub fn get_http_timeout() -> Duration {
    let secs = non_empty_var("AML_RBAC_HTTP_TIMEOUT_SECS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Static bearer token, if one was provided
pub fn get_access_token() -> Option<String> {
    non_empty_var("AZURE_ACCESS_TOKEN")
}

/// Service principal (tenant, client id, client secret), if fully configured
pub fn get_client_secret_credentials() -> Option<(String, String, String)> {
    let tenant = non_empty_var("AZURE_TENANT_ID")?;
    let client_id = non_empty_var("AZURE_CLIENT_ID")?;
    let secret = non_empty_var("AZURE_CLIENT_SECRET")?;
    Some((tenant, client_id, secret))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn sanitize_base_url(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
