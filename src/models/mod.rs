pub mod group_role_mapping;
pub mod role_assignment;
pub mod role_definition;
pub mod workspace;

pub use group_role_mapping::{default_mappings, GroupRoleMapping};
pub use role_assignment::{PrincipalType, RoleAssignment, RoleAssignmentRequest};
pub use role_definition::RoleDefinition;
pub use workspace::Workspace;
