use serde::{Deserialize, Serialize};

/// A security group and the role it should hold on the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRoleMapping {
    pub group_name: String,
    pub role_name: String,
}

impl GroupRoleMapping {
    pub fn new(group_name: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            role_name: role_name.into(),
        }
    }
}

/// The fixed workspace access layout, in the order it is applied.
pub fn default_mappings() -> Vec<GroupRoleMapping> {
    vec![
        GroupRoleMapping::new("ML Security Admins", "Contributor"),
        GroupRoleMapping::new("ML Data Scientists", "AzureML Data Scientist"),
        GroupRoleMapping::new("ML Auditors", "Reader"),
    ]
}
