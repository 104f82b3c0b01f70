//! Runs `ArmClient` against a local HTTP stub that serves canned responses
//! in order and records what it received.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use aml_rbac::api::{set_silent, ArmClient, ManagementApi};
use aml_rbac::config::{FailurePolicy, WorkspaceTarget};
use aml_rbac::error::RbacError;
use aml_rbac::models::{default_mappings, PrincipalType, RoleAssignmentRequest};
use aml_rbac::rbac::configure_workspace;

const TOKEN: &str = "test-token";
const WORKSPACE_ID: &str =
    "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.MachineLearningServices/workspaces/ws1";

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    target: String,
    authorization: Option<String>,
    body: String,
}

type Requests = Arc<Mutex<Vec<Recorded>>>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

async fn read_request(stream: &mut TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers were complete");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let header = |name: &str| {
        head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            if k.trim().eq_ignore_ascii_case(name) {
                Some(v.trim().to_string())
            } else {
                None
            }
        })
    };
    let content_length: usize = header("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before body was complete");
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or("").split_whitespace();
    Recorded {
        method: request_line.next().unwrap_or("").to_string(),
        target: request_line.next().unwrap_or("").to_string(),
        authorization: header("authorization"),
        body: String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string(),
    }
}

/// Serve each response on its own connection, in order.
fn serve(listener: TcpListener, responses: Vec<(u16, Value)>) -> Requests {
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let request = read_request(&mut stream).await;
            recorded.lock().unwrap().push(request);

            let body = body.to_string();
            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });
    requests
}

fn client(base: &str) -> ArmClient {
    set_silent(true);
    ArmClient::new(base, TOKEN, Duration::from_secs(5)).unwrap()
}

fn role(guid: &str, role_name: &str) -> Value {
    json!({
        "id": format!("/subscriptions/sub1/providers/Microsoft.Authorization/roleDefinitions/{}", guid),
        "name": guid,
        "properties": {"roleName": role_name, "type": "BuiltInRole"}
    })
}

fn assignment(name: &str, role_definition_id: &str, principal_id: &str) -> Value {
    json!({
        "id": format!("{}/providers/Microsoft.Authorization/roleAssignments/{}", WORKSPACE_ID, name),
        "name": name,
        "properties": {
            "roleDefinitionId": role_definition_id,
            "principalId": principal_id,
            "principalType": "Group",
            "scope": WORKSPACE_ID
        }
    })
}

fn requests(recorded: &Requests) -> Vec<Recorded> {
    recorded.lock().unwrap().clone()
}

#[tokio::test]
async fn test_list_role_definitions_follows_next_link() {
    let (listener, base) = bind().await;
    let next = format!("{}/page2?api-version=2022-04-01&$skiptoken=abc", base);
    let recorded = serve(
        listener,
        vec![
            (200, json!({"value": [role("b24988ac", "Contributor")], "nextLink": next})),
            (200, json!({"value": [role("acdd72a7", "Reader")]})),
        ],
    );

    let defs = client(&base).list_role_definitions(WORKSPACE_ID).await.unwrap();

    let names: Vec<&str> = defs.iter().map(|d| d.role_name.as_str()).collect();
    assert_eq!(names, vec!["Contributor", "Reader"]);

    let seen = requests(&recorded);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(
        seen[0].target,
        format!(
            "{}/providers/Microsoft.Authorization/roleDefinitions?api-version=2022-04-01",
            WORKSPACE_ID
        )
    );
    assert_eq!(seen[1].target, "/page2?api-version=2022-04-01&$skiptoken=abc");
    for r in &seen {
        assert_eq!(r.authorization.as_deref(), Some("Bearer test-token"));
    }
}

#[tokio::test]
async fn test_list_role_definitions_refuses_foreign_next_link() {
    let (listener, base) = bind().await;
    let recorded = serve(
        listener,
        vec![(
            200,
            json!({"value": [role("b24988ac", "Contributor")], "nextLink": "https://attacker.example/page2"}),
        )],
    );

    let err = client(&base).list_role_definitions(WORKSPACE_ID).await.unwrap_err();

    assert!(matches!(err, RbacError::Parse(ref m) if m.contains("attacker.example")));
    assert_eq!(requests(&recorded).len(), 1);
}

#[tokio::test]
async fn test_get_workspace_not_found() {
    let (listener, base) = bind().await;
    let recorded = serve(
        listener,
        vec![(
            404,
            json!({"error": {"code": "ResourceNotFound", "message": "Workspace 'ws1' was not found"}}),
        )],
    );

    let err = client(&base)
        .get_workspace(&WorkspaceTarget::new("sub1", "rg1", "ws1"))
        .await
        .unwrap_err();

    assert!(matches!(err, RbacError::NotFound(ref m) if m.starts_with("ResourceNotFound")));
    let seen = requests(&recorded);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].target, format!("{}?api-version=2024-04-01", WORKSPACE_ID));
}

#[tokio::test]
async fn test_create_role_assignment_conflict() {
    let (listener, base) = bind().await;
    let recorded = serve(
        listener,
        vec![(
            409,
            json!({"error": {"code": "RoleAssignmentExists", "message": "The role assignment already exists."}}),
        )],
    );
    let request = RoleAssignmentRequest {
        role_definition_id: "/subscriptions/sub1/providers/Microsoft.Authorization/roleDefinitions/acdd72a7".into(),
        principal_id: "/subscriptions/sub1/providers/Microsoft.Aadiam/groups/ML Auditors".into(),
        principal_type: PrincipalType::Group,
    };

    let err = client(&base)
        .create_role_assignment(WORKSPACE_ID, "0f8fad5b-d9cb-469f-a165-70867728950e", &request)
        .await
        .unwrap_err();

    assert!(matches!(err, RbacError::Conflict(_)));
    let seen = requests(&recorded);
    assert_eq!(seen[0].method, "PUT");
    assert_eq!(
        seen[0].target,
        format!(
            "{}/providers/Microsoft.Authorization/roleAssignments/0f8fad5b-d9cb-469f-a165-70867728950e?api-version=2022-04-01",
            WORKSPACE_ID
        )
    );
    let body: Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(
        body,
        json!({
            "properties": {
                "roleDefinitionId": "/subscriptions/sub1/providers/Microsoft.Authorization/roleDefinitions/acdd72a7",
                "principalId": "/subscriptions/sub1/providers/Microsoft.Aadiam/groups/ML Auditors",
                "principalType": "Group"
            }
        })
    );
}

#[tokio::test]
async fn test_configure_workspace_over_http() {
    let (listener, base) = bind().await;
    let roles = json!({"value": [
        role("b24988ac", "Contributor"),
        role("f6c7c914", "AzureML Data Scientist"),
        role("acdd72a7", "Reader")
    ]});
    let recorded = serve(
        listener,
        vec![
            (200, json!({"id": WORKSPACE_ID, "name": "ws1", "location": "westeurope"})),
            (200, roles.clone()),
            (201, assignment("a1", "rd-contributor", "p1")),
            (200, roles.clone()),
            (201, assignment("a2", "rd-ds", "p2")),
            (200, roles),
            (403, json!({"error": {"code": "AuthorizationFailed", "message": "no write access"}})),
        ],
    );

    let report = configure_workspace(
        &client(&base),
        &WorkspaceTarget::new("sub1", "rg1", "ws1"),
        &default_mappings(),
        FailurePolicy::Continue,
    )
    .await
    .unwrap();

    assert_eq!(report.assigned().count(), 2);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0.group_name, "ML Auditors");
    assert!(matches!(failures[0].1, RbacError::Authorization(_)));
    assert_eq!(
        report.summary_line("ws1"),
        "Failed to configure RBAC for ws1 workspace (1 of 3 mappings failed)"
    );

    let seen = requests(&recorded);
    let methods: Vec<&str> = seen.iter().map(|r| r.method.as_str()).collect();
    assert_eq!(methods, vec!["GET", "GET", "PUT", "GET", "PUT", "GET", "PUT"]);
    let last: Value = serde_json::from_str(&seen[6].body).unwrap();
    assert_eq!(
        last["properties"]["principalId"],
        "/subscriptions/sub1/providers/Microsoft.Aadiam/groups/ML Auditors"
    );
    assert!(last["properties"]["roleDefinitionId"]
        .as_str()
        .unwrap()
        .ends_with("/acdd72a7"));
}
