use reqwest::Method;
use serde::Deserialize;

use super::client::{ensure_within_base, ArmClient};
use crate::error::RbacError;
use crate::models::RoleDefinition;

pub const AUTHORIZATION_API_VERSION: &str = "2022-04-01";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleDefinitionPage {
    #[serde(default)]
    value: Vec<RoleDefinitionResource>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleDefinitionResource {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    properties: RoleDefinitionProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleDefinitionProperties {
    #[serde(default)]
    role_name: String,
    #[serde(default, rename = "type")]
    role_type: Option<String>,
}

impl From<RoleDefinitionResource> for RoleDefinition {
    fn from(r: RoleDefinitionResource) -> Self {
        RoleDefinition {
            id: r.id,
            name: r.name,
            role_name: r.properties.role_name,
            role_type: r.properties.role_type,
        }
    }
}

/// Parse one page of a role-definition listing, returning the definitions and the next page link.
pub fn parse_role_definition_page(
    payload: serde_json::Value,
) -> Result<(Vec<RoleDefinition>, Option<String>), RbacError> {
    let page: RoleDefinitionPage =
        serde_json::from_value(payload).map_err(|e| RbacError::Parse(format!("role definitions: {}", e)))?;
    let next = page.next_link.filter(|l| !l.trim().is_empty());
    Ok((page.value.into_iter().map(RoleDefinition::from).collect(), next))
}

/// List every role definition visible at `scope`, following `nextLink` pagination.
pub async fn list_role_definitions(client: &ArmClient, scope: &str) -> Result<Vec<RoleDefinition>, RbacError> {
    let mut endpoint = format!(
        "{}/providers/Microsoft.Authorization/roleDefinitions?api-version={}",
        scope.trim_end_matches('/'),
        AUTHORIZATION_API_VERSION
    );
    let mut out = Vec::new();
    loop {
        let payload = client.send(Method::GET, &endpoint, None).await?;
        let (defs, next) = parse_role_definition_page(payload)?;
        out.extend(defs);
        match next {
            Some(link) => {
                ensure_within_base(client.base_url(), &link)?;
                endpoint = link;
            }
            None => break,
        }
    }
    tracing::debug!(scope, count = out.len(), "listed role definitions");
    Ok(out)
}
