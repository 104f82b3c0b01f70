//! Credential sources for the management API.
//!
//! `DefaultCredential` tries, in order:
//! 1. a static token from `AZURE_ACCESS_TOKEN`
//! 2. a service principal secret (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`)
//! 3. the Azure CLI (`az account get-access-token`)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config;
use crate::error::RbacError;

/// OAuth scope for the Azure Resource Manager audience
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Lifetime in seconds as reported by the issuer, when known
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"****")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Human-readable name used in diagnostics
    fn name(&self) -> &'static str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken, RbacError>;
}

/// Pre-issued bearer token
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &'static str {
        "AZURE_ACCESS_TOKEN"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, RbacError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_in: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// OAuth2 client-credentials flow against the Microsoft identity platform
pub struct ClientSecretCredential {
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
}

impl ClientSecretCredential {
    pub fn new(
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        timeout: Duration,
    ) -> Result<Self, RbacError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("aml-rbac/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RbacError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            authority_host: authority_host.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            client,
        })
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host,
            urlencoding::encode(&self.tenant_id)
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "client secret"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, RbacError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];
        let response = self.client.post(self.token_url()).form(&form).send().await?;
        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| RbacError::Credential(format!("invalid token response: {}", e)))?;

        match body.access_token {
            Some(token) if status.is_success() => Ok(AccessToken {
                token,
                expires_in: body.expires_in,
            }),
            _ => Err(RbacError::Credential(format!(
                "token request failed (HTTP {}): {} {}",
                status,
                body.error.unwrap_or_default(),
                body.error_description.unwrap_or_default()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
}

/// Token from the logged-in Azure CLI session
pub struct AzureCliCredential;

/// Resource URI for `az --resource`: the scope without its `/.default` suffix
pub fn resource_for_scope(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "Azure CLI"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, RbacError> {
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource_for_scope(scope),
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| RbacError::Credential(format!("failed to run az: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RbacError::Credential(format!("az exited with {}: {}", output.status, stderr.trim())));
        }
        let parsed: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| RbacError::Credential(format!("unexpected az output: {}", e)))?;
        Ok(AccessToken {
            token: parsed.access_token,
            expires_in: None,
        })
    }
}

/// Ordered chain of credential sources; the first one to succeed wins.
pub struct DefaultCredential {
    sources: Vec<Box<dyn TokenCredential>>,
}

impl DefaultCredential {
    pub fn new(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self { sources }
    }

    /// Build the chain from the current environment.
    pub fn from_env() -> Result<Self, RbacError> {
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
        if let Some(token) = config::get_access_token() {
            sources.push(Box::new(StaticTokenCredential::new(token)));
        }
        if let Some((tenant, client_id, secret)) = config::get_client_secret_credentials() {
            sources.push(Box::new(ClientSecretCredential::new(
                &config::get_authority_host(),
                &tenant,
                &client_id,
                &secret,
                config::get_http_timeout(),
            )?));
        }
        sources.push(Box::new(AzureCliCredential));
        Ok(Self::new(sources))
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    fn name(&self) -> &'static str {
        "default chain"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, RbacError> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!(source = source.name(), "acquired management token");
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(source = source.name(), error = %e, "credential source failed");
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }
        if failures.is_empty() {
            return Err(RbacError::Credential("no credential sources configured".into()));
        }
        Err(RbacError::Credential(failures.join("; ")))
    }
}
