use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::client::ArmClient;
use super::role_definitions::AUTHORIZATION_API_VERSION;
use crate::error::RbacError;
use crate::models::{PrincipalType, RoleAssignment, RoleAssignmentRequest};

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    properties: CreateProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProperties<'a> {
    role_definition_id: &'a str,
    principal_id: &'a str,
    principal_type: PrincipalType,
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentResource {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    properties: RoleAssignmentProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignmentProperties {
    role_definition_id: String,
    principal_id: String,
    principal_type: PrincipalType,
    #[serde(default)]
    scope: Option<String>,
}

/// JSON body for `PUT .../roleAssignments/{id}`.
pub fn role_assignment_body(request: &RoleAssignmentRequest) -> serde_json::Value {
    let body = CreateBody {
        properties: CreateProperties {
            role_definition_id: &request.role_definition_id,
            principal_id: &request.principal_id,
            principal_type: request.principal_type,
        },
    };
    // Serializing plain strings and a unit enum cannot fail
    serde_json::to_value(body).unwrap_or(serde_json::Value::Null)
}

/// Parse the created assignment. `scope` fills in when the response omits it.
pub fn parse_role_assignment(payload: serde_json::Value, scope: &str) -> Result<RoleAssignment, RbacError> {
    let resource: RoleAssignmentResource =
        serde_json::from_value(payload).map_err(|e| RbacError::Parse(format!("role assignment: {}", e)))?;
    Ok(RoleAssignment {
        id: resource.id,
        name: resource.name,
        scope: resource.properties.scope.unwrap_or_else(|| scope.to_string()),
        role_definition_id: resource.properties.role_definition_id,
        principal_id: resource.properties.principal_id,
        principal_type: resource.properties.principal_type,
    })
}

/// Create a role assignment named `assignment_id` at `scope`.
/// An existing equivalent assignment surfaces as `RbacError::Conflict`.
pub async fn create_role_assignment(
    client: &ArmClient,
    scope: &str,
    assignment_id: &str,
    request: &RoleAssignmentRequest,
) -> Result<RoleAssignment, RbacError> {
    let endpoint = format!(
        "{}/providers/Microsoft.Authorization/roleAssignments/{}?api-version={}",
        scope.trim_end_matches('/'),
        urlencoding::encode(assignment_id),
        AUTHORIZATION_API_VERSION
    );
    let body = role_assignment_body(request);
    let payload = client.send(Method::PUT, &endpoint, Some(&body)).await?;
    parse_role_assignment(payload, scope)
}
