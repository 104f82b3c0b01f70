use reqwest::Method;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use yansi::Paint;

use crate::error::RbacError;

static SILENT: AtomicBool = AtomicBool::new(false);

pub fn set_silent(silent: bool) {
    SILENT.store(silent, Ordering::Relaxed);
}

fn log_output(msg: String) {
    if !SILENT.load(Ordering::Relaxed) {
        println!("{}", msg);
    }
}

/// Authenticated client for the Azure Resource Manager REST API.
#[derive(Clone)]
pub struct ArmClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ArmClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, RbacError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("aml-rbac/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RbacError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and return the parsed JSON body.
    /// Non-success statuses are mapped onto `RbacError` by `classify_response`.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value, RbacError> {
        let url = absolute_url(&self.base_url, endpoint);
        log_output(format!("Request:\n{}", curl_line(&method, &url, body)));

        let mut req = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&self.token);
        if let Some(b) = body {
            req = req.json(b);
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log_output(format!(
                "Response:\n{}",
                Paint::new(format!("HTTP {}: {}", status, text)).fg(yansi::Color::Red)
            ));
            tracing::debug!(%status, %url, "management API returned an error");
            return Err(classify_response(status.as_u16(), &text));
        }

        // Grayed out so the echoed payload stays visually secondary
        log_output(format!("Response:\n{}", Paint::new(&text).rgb(100, 100, 100)));

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RbacError::Parse(e.to_string()))
    }
}

/// Render the request as an equivalent curl command. The bearer token is masked.
fn curl_line(method: &Method, url: &str, body: Option<&Value>) -> String {
    let mut parts = Vec::new();
    parts.push(Paint::new("curl").fg(yansi::Color::Green).bold().to_string());
    parts.push(format!("-X {}", Paint::new(method.as_str()).fg(yansi::Color::Yellow).bold()));
    parts.push(format!("'{}'", Paint::new(url).fg(yansi::Color::Cyan)));
    parts.push(format!(
        "{} {}",
        Paint::new("-H").fg(yansi::Color::Magenta),
        Paint::new("'Authorization: Bearer ****'").fg(yansi::Color::Magenta)
    ));
    if let Some(d) = body {
        parts.push(format!(
            "{} {}",
            Paint::new("-H").fg(yansi::Color::Magenta),
            Paint::new("'Content-Type: application/json'").fg(yansi::Color::Magenta)
        ));
        let json_str = serde_json::to_string_pretty(d).unwrap_or_default();
        let escaped_json = json_str.replace('\'', "'\\''");
        parts.push(format!(
            "{} {}",
            Paint::new("-d").fg(yansi::Color::Blue),
            Paint::new(format!("'{}'", escaped_json)).fg(yansi::Color::White)
        ));
    }
    parts.join(" ")
}

/// Build an absolute URL from a base URL and a path.
/// Absolute inputs (such as `nextLink` values) are returned unchanged.
pub fn absolute_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return base_url.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), trimmed)
}

/// Reject absolute links that leave the management endpoint, so the bearer
/// token is only ever sent to `base_url`. Relative links are always accepted.
pub fn ensure_within_base(base_url: &str, link: &str) -> Result<(), RbacError> {
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        return Ok(());
    }
    let base = base_url.trim_end_matches('/');
    let inside = link
        .strip_prefix(base)
        .map(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
        .unwrap_or(false);
    if inside {
        Ok(())
    } else {
        Err(RbacError::Parse(format!(
            "refusing to follow link outside {}: {}",
            base, link
        )))
    }
}

/// Extract `(code, message)` from an ARM error envelope:
/// `{"error": {"code": "...", "message": "..."}}`
pub fn parse_arm_error(body: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(body).ok()?;
    let err = value.get("error")?;
    let code = err.get("code").and_then(|c| c.as_str()).unwrap_or("").to_string();
    let message = err.get("message").and_then(|m| m.as_str()).unwrap_or("").to_string();
    if code.is_empty() && message.is_empty() {
        return None;
    }
    Some((code, message))
}

/// Map a non-success HTTP status and body onto a typed error.
pub fn classify_response(status: u16, body: &str) -> RbacError {
    let (code, message) = parse_arm_error(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            format!("HTTP {}", status)
        } else {
            trimmed.to_string()
        };
        (String::new(), message)
    });
    let detail = if code.is_empty() {
        message.clone()
    } else {
        format!("{}: {}", code, message)
    };

    if code == "RoleAssignmentExists" {
        return RbacError::Conflict(detail);
    }
    match status {
        404 => RbacError::NotFound(detail),
        401 | 403 => RbacError::Authorization(detail),
        409 => RbacError::Conflict(detail),
        _ => RbacError::Api {
            status,
            code: if code.is_empty() { "Unknown".to_string() } else { code },
            message,
        },
    }
}
