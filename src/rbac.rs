//! Workspace RBAC configuration.
//!
//! Resolves the workspace, then for each group/role mapping in order looks up
//! the role definition at workspace scope and creates a role assignment for the
//! group. Successful assignments are never rolled back. A second run against
//! the same workspace surfaces `RbacError::Conflict` for every assignment that
//! already exists.

use uuid::Uuid;

use crate::api::ManagementApi;
use crate::config::{FailurePolicy, WorkspaceTarget};
use crate::error::RbacError;
use crate::models::{
    GroupRoleMapping, PrincipalType, RoleAssignment, RoleAssignmentRequest, RoleDefinition, Workspace,
};

/// Result of applying a single mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingOutcome {
    Assigned(RoleAssignment),
    Failed(RbacError),
    /// Not attempted because an earlier mapping failed under `FailurePolicy::Abort`
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingResult {
    pub mapping: GroupRoleMapping,
    pub outcome: MappingOutcome,
}

/// Per-mapping record of a configuration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureReport {
    pub workspace: Workspace,
    pub results: Vec<MappingResult>,
}

impl ConfigureReport {
    /// True when every mapping produced an assignment
    pub fn is_success(&self) -> bool {
        self.results
            .iter()
            .all(|r| matches!(r.outcome, MappingOutcome::Assigned(_)))
    }

    pub fn assigned(&self) -> impl Iterator<Item = &RoleAssignment> {
        self.results.iter().filter_map(|r| match &r.outcome {
            MappingOutcome::Assigned(a) => Some(a),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&GroupRoleMapping, &RbacError)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            MappingOutcome::Failed(e) => Some((&r.mapping, e)),
            _ => None,
        })
    }

    /// Final line for the run: the completion message when every mapping was
    /// assigned, otherwise a failure summary with the failed/total count.
    pub fn summary_line(&self, workspace_name: &str) -> String {
        if self.is_success() {
            return completion_message(workspace_name);
        }
        let failed = self
            .results
            .iter()
            .filter(|r| !matches!(r.outcome, MappingOutcome::Assigned(_)))
            .count();
        format!(
            "Failed to configure RBAC for {} workspace ({} of {} mappings failed)",
            workspace_name,
            failed,
            self.results.len()
        )
    }
}

/// Line printed once every mapping has been assigned
pub fn completion_message(workspace_name: &str) -> String {
    format!("Configured RBAC for {} workspace", workspace_name)
}

/// Principal id of a security group in the subscription's directory namespace.
/// The group is assumed to exist.
pub fn principal_id_for_group(subscription_id: &str, group_name: &str) -> String {
    format!(
        "/subscriptions/{}/providers/Microsoft.Aadiam/groups/{}",
        subscription_id, group_name
    )
}

/// Linear search for the definition whose display name matches exactly.
pub fn find_role_definition<'a>(
    definitions: &'a [RoleDefinition],
    role_name: &str,
) -> Result<&'a RoleDefinition, RbacError> {
    definitions
        .iter()
        .find(|d| d.role_name == role_name)
        .ok_or_else(|| RbacError::Lookup {
            role: role_name.to_string(),
        })
}

/// Fresh name for a new role assignment
pub fn new_assignment_id() -> String {
    Uuid::new_v4().to_string()
}

async fn apply_mapping(
    api: &dyn ManagementApi,
    target: &WorkspaceTarget,
    scope: &str,
    mapping: &GroupRoleMapping,
) -> Result<RoleAssignment, RbacError> {
    let definitions = api.list_role_definitions(scope).await?;
    let definition = find_role_definition(&definitions, &mapping.role_name)?;

    let request = RoleAssignmentRequest {
        role_definition_id: definition.id.clone(),
        principal_id: principal_id_for_group(&target.subscription_id, &mapping.group_name),
        principal_type: PrincipalType::Group,
    };
    let assignment_id = new_assignment_id();
    tracing::info!(
        group = %mapping.group_name,
        role = %mapping.role_name,
        assignment_id = %assignment_id,
        "creating role assignment"
    );
    api.create_role_assignment(scope, &assignment_id, &request).await
}

/// Apply `mappings` to the workspace identified by `target`.
///
/// Fails outright only when the workspace cannot be resolved; in that case no
/// role lookups or assignments are attempted. Per-mapping failures are recorded
/// in the report, and `policy` decides whether later mappings still run.
pub async fn configure_workspace(
    api: &dyn ManagementApi,
    target: &WorkspaceTarget,
    mappings: &[GroupRoleMapping],
    policy: FailurePolicy,
) -> Result<ConfigureReport, RbacError> {
    target.validate()?;
    let workspace = api.get_workspace(target).await?;
    let scope = workspace.id.clone();

    let mut results = Vec::with_capacity(mappings.len());
    let mut aborted = false;
    for mapping in mappings {
        if aborted {
            results.push(MappingResult {
                mapping: mapping.clone(),
                outcome: MappingOutcome::Skipped,
            });
            continue;
        }
        let outcome = match apply_mapping(api, target, &scope, mapping).await {
            Ok(assignment) => MappingOutcome::Assigned(assignment),
            Err(e) => {
                tracing::warn!(group = %mapping.group_name, role = %mapping.role_name, error = %e, "mapping failed");
                if policy == FailurePolicy::Abort {
                    aborted = true;
                }
                MappingOutcome::Failed(e)
            }
        };
        results.push(MappingResult {
            mapping: mapping.clone(),
            outcome,
        });
    }

    Ok(ConfigureReport { workspace, results })
}
