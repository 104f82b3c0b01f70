use reqwest::Method;

use super::client::ArmClient;
use crate::config::WorkspaceTarget;
use crate::error::RbacError;
use crate::models::Workspace;

pub const WORKSPACE_API_VERSION: &str = "2024-04-01";

/// ARM path of a Machine Learning workspace.
pub fn workspace_path(target: &WorkspaceTarget) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
        urlencoding::encode(&target.subscription_id),
        urlencoding::encode(&target.resource_group),
        urlencoding::encode(&target.workspace_name),
    )
}

/// Fetch a workspace. A missing workspace surfaces as `RbacError::NotFound`.
pub async fn get_workspace(client: &ArmClient, target: &WorkspaceTarget) -> Result<Workspace, RbacError> {
    let endpoint = format!("{}?api-version={}", workspace_path(target), WORKSPACE_API_VERSION);
    let payload = client.send(Method::GET, &endpoint, None).await?;
    let workspace: Workspace =
        serde_json::from_value(payload).map_err(|e| RbacError::Parse(format!("workspace: {}", e)))?;
    tracing::debug!(id = %workspace.id, "resolved workspace");
    Ok(workspace)
}
