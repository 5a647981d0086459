//! HTTP utilities for cloudscale.ch REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging secret keys)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Error returned by the API for any non-2xx response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

/// Human readable message from an error body.
///
/// The API answers with `{"detail": "..."}` for most failures and with a map
/// of field names to messages for validation errors. Anything else is
/// passed through sanitized.
fn error_detail(status: StatusCode, body: &str) -> String {
    let fallback = || status.canonical_reason().unwrap_or("unknown error").to_string();

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            if let Some(detail) = map.get("detail").and_then(Value::as_str) {
                return detail.to_string();
            }
            if map.is_empty() {
                return fallback();
            }
            map.iter()
                .map(|(field, messages)| format!("{}: {}", field, render_messages(messages)))
                .collect::<Vec<_>>()
                .join("; ")
        }
        Ok(other) if !other.is_null() => render_messages(&other),
        _ if body.trim().is_empty() => fallback(),
        _ => sanitize_for_log(body),
    }
}

fn render_messages(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_messages)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Returns true if the error chain contains a 404 from the API
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<ApiError>(), Some(e) if e.is_not_found()))
}

/// HTTP client wrapper for API calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
}

impl ApiHttpClient {
    /// Create a new HTTP client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cloudscale-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// GET a JSON document
    pub async fn get<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        let body = self.send::<()>(Method::GET, url, token, None).await?;
        serde_json::from_str(&body).context("Failed to parse response JSON")
    }

    /// POST a JSON body and decode the created object
    pub async fn post<B, T>(&self, url: &str, token: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let body = self.send(Method::POST, url, token, Some(body)).await?;
        serde_json::from_str(&body).context("Failed to parse response JSON")
    }

    /// PATCH a JSON body. The API answers with 204 and no content.
    pub async fn patch<B: Serialize>(&self, url: &str, token: &str, body: &B) -> Result<()> {
        self.send(Method::PATCH, url, token, Some(body)).await?;
        Ok(())
    }

    /// DELETE a resource
    pub async fn delete(&self, url: &str, token: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, url, token, None).await?;
        Ok(())
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&B>,
    ) -> Result<String> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body
            if status == StatusCode::NOT_FOUND {
                tracing::debug!("API not found: {} - {}", status, sanitize_for_log(&body));
            } else {
                tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            }
            let detail = error_detail(status, &body);
            return Err(ApiError { status, detail }.into());
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_error_detail_prefers_detail_key() {
        let body = r#"{"detail": "Not found."}"#;
        assert_eq!(error_detail(StatusCode::NOT_FOUND, body), "Not found.");
    }

    #[test]
    fn test_error_detail_renders_field_errors() {
        let body = r#"{"flavor": ["Invalid choice: lb-nope."], "name": ["This field is required."]}"#;
        assert_eq!(
            error_detail(StatusCode::BAD_REQUEST, body),
            "flavor: Invalid choice: lb-nope.; name: This field is required."
        );
    }

    #[test]
    fn test_error_detail_falls_back_to_body_or_reason() {
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, "upstream\nexploded"),
            "upstreamexploded"
        );
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(error_detail(StatusCode::BAD_REQUEST, "{}"), "Bad Request");
        assert_eq!(
            error_detail(StatusCode::BAD_REQUEST, r#"["Invalid zone."]"#),
            "Invalid zone."
        );
    }

    #[test]
    fn test_is_not_found_through_context() {
        let err: anyhow::Error = ApiError {
            status: StatusCode::NOT_FOUND,
            detail: "Not found.".to_string(),
        }
        .into();
        let wrapped = err.context("Error retrieving load balancer");
        assert!(is_not_found(&wrapped));
    }

    #[test]
    fn test_other_status_is_not_not_found() {
        let err: anyhow::Error = ApiError {
            status: StatusCode::BAD_REQUEST,
            detail: "flavor: invalid".to_string(),
        }
        .into();
        assert!(!is_not_found(&err));
        assert_eq!(err.to_string(), "400 Bad Request: flavor: invalid");
    }
}
