// Atomic API modules
pub mod client;
pub mod role_assignments;
pub mod role_definitions;
pub mod workspaces;

use async_trait::async_trait;

use crate::config::WorkspaceTarget;
use crate::error::RbacError;
use crate::models::{RoleAssignment, RoleAssignmentRequest, RoleDefinition, Workspace};

// Re-export commonly used items
pub use client::{absolute_url, classify_response, ensure_within_base, parse_arm_error, set_silent, ArmClient};
pub use role_assignments::{parse_role_assignment, role_assignment_body};
pub use role_definitions::parse_role_definition_page;
pub use workspaces::workspace_path;

/// The three management operations the configurator depends on.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn get_workspace(&self, target: &WorkspaceTarget) -> Result<Workspace, RbacError>;

    async fn list_role_definitions(&self, scope: &str) -> Result<Vec<RoleDefinition>, RbacError>;

    async fn create_role_assignment(
        &self,
        scope: &str,
        assignment_id: &str,
        request: &RoleAssignmentRequest,
    ) -> Result<RoleAssignment, RbacError>;
}

#[async_trait]
impl ManagementApi for ArmClient {
    async fn get_workspace(&self, target: &WorkspaceTarget) -> Result<Workspace, RbacError> {
        workspaces::get_workspace(self, target).await
    }

    async fn list_role_definitions(&self, scope: &str) -> Result<Vec<RoleDefinition>, RbacError> {
        role_definitions::list_role_definitions(self, scope).await
    }

    async fn create_role_assignment(
        &self,
        scope: &str,
        assignment_id: &str,
        request: &RoleAssignmentRequest,
    ) -> Result<RoleAssignment, RbacError> {
        role_assignments::create_role_assignment(self, scope, assignment_id, request).await
    }
}
