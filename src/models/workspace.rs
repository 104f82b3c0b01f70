use serde::{Deserialize, Serialize};

/// Azure Machine Learning workspace as returned by the management API.
/// Only the fields needed to scope role lookups are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Full ARM resource id, used as the RBAC scope
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}
