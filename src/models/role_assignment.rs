use serde::{Deserialize, Serialize};

/// Kind of principal a role is granted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalType {
    User,
    Group,
    ServicePrincipal,
}

impl std::fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalType::User => write!(f, "User"),
            PrincipalType::Group => write!(f, "Group"),
            PrincipalType::ServicePrincipal => write!(f, "ServicePrincipal"),
        }
    }
}

/// Body of a role-assignment creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentRequest {
    pub role_definition_id: String,
    pub principal_id: String,
    pub principal_type: PrincipalType,
}

/// A role assignment created at some scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: String,
    /// Assignment GUID
    pub name: String,
    pub scope: String,
    pub role_definition_id: String,
    pub principal_id: String,
    pub principal_type: PrincipalType,
}
