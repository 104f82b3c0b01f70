use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Full definition id, e.g. `/subscriptions/.../roleDefinitions/<guid>`
    pub id: String,
    /// Definition GUID
    pub name: String,
    /// Human-readable display name such as "Contributor"
    pub role_name: String,
    /// `BuiltInRole` or `CustomRole`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
}
