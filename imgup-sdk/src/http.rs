// ABOUTME: Shared reqwest client construction and response status handling
// ABOUTME: Maps non-success responses to protocol errors with the server's message

use crate::constants::USER_AGENT;
use crate::error::{ImgupError, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT as USER_AGENT_HEADER};
use reqwest::Response;

/// Client with the imgup user agent and reqwest's default timeouts.
pub fn client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT_HEADER, HeaderValue::from_static(USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| ImgupError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Pass successful responses through; turn anything else into
/// [`ImgupError::Protocol`] carrying the decoded error message if present.
pub async fn ensure_success(response: Response, context: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("{context} returned HTTP {}: {}", status.as_u16(), body);
    Err(ImgupError::Protocol {
        context,
        status: status.as_u16(),
        message: error_message(&body, status.canonical_reason()),
    })
}

/// `error`/`message` from a JSON error body, else the raw body, else the
/// status reason.
pub fn error_message(body: &str, reason: Option<&str>) -> String {
    let decoded = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["error", "message", "Message"]
                .iter()
                .find_map(|key| json.get(*key).and_then(|v| v.as_str()).map(String::from))
        });

    decoded
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| reason.unwrap_or("unknown error").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_error() {
        assert_eq!(
            error_message(r#"{"error":"file too large"}"#, Some("Unprocessable Entity")),
            "file too large"
        );
        assert_eq!(
            error_message(r#"{"Code":401,"Message":"oauth_problem=token_rejected"}"#, None),
            "oauth_problem=token_rejected"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_body_then_reason() {
        assert_eq!(error_message("  bad gateway \n", Some("Bad Gateway")), "bad gateway");
        assert_eq!(error_message("", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message("", None), "unknown error");
    }

    #[tokio::test]
    async fn test_client_sends_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/ping")
            .match_header("user-agent", USER_AGENT)
            .with_status(204)
            .create_async()
            .await;

        let response = client()
            .unwrap()
            .get(format!("{}/ping", server.url()))
            .send()
            .await
            .unwrap();

        m.assert_async().await;
        assert!(ensure_success(response, "Ping").await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_success_maps_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/fail")
            .with_status(422)
            .with_body(r#"{"error":"nope"}"#)
            .create_async()
            .await;

        let response = client()
            .unwrap()
            .get(format!("{}/fail", server.url()))
            .send()
            .await
            .unwrap();

        match ensure_success(response, "Media upload").await {
            Err(ImgupError::Protocol {
                context,
                status,
                message,
            }) => {
                assert_eq!(context, "Media upload");
                assert_eq!(status, 422);
                assert_eq!(message, "nope");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }
}
