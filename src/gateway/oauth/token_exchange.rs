//! Usage: OAuth token endpoint helper (authorization code -> access token).

use crate::shared::error::{AppError, AppResult};
use crate::shared::security::mask_token;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TokenExchangeRequest {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) code: String,
}

/// Outcome of a token exchange that reached the provider and returned JSON.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenGrant {
    Granted { access_token: String },
    /// Decoded body without an `access_token`; surfaced verbatim to the popup.
    Denied { body: Value },
}

pub(crate) async fn exchange_authorization_code(
    client: &reqwest::Client,
    token_url: &str,
    req: &TokenExchangeRequest,
) -> AppResult<TokenGrant> {
    let payload = TokenExchangeRequest {
        client_id: req.client_id.trim().to_string(),
        client_secret: req.client_secret.trim().to_string(),
        code: req.code.trim().to_string(),
    };

    let response = client
        .post(token_url.trim())
        .header(ACCEPT, "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(|e| transport_error("oauth token exchange request failed", e))?;

    parse_token_response(response).await
}

fn transport_error(context: &str, err: reqwest::Error) -> AppError {
    // reqwest's Display omits the source chain, so name the failure class explicitly.
    let (code, reason) = if err.is_timeout() {
        ("OAUTH_TOKEN_TIMEOUT", "timed out waiting for token endpoint")
    } else if err.is_connect() {
        ("OAUTH_TOKEN_CONNECT_FAILED", "could not connect to token endpoint")
    } else {
        ("OAUTH_TOKEN_REQUEST_FAILED", "request error")
    };
    let message = format!("{context}: {reason}: {err}");
    AppError::with_source(code, message, err)
}

async fn parse_token_response(response: reqwest::Response) -> AppResult<TokenGrant> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error("oauth token response read failed", e))?;

    let value: Value = serde_json::from_str(&body).map_err(|e| {
        let snippet: String = body.chars().take(240).collect();
        format!(
            "OAUTH_TOKEN_RESPONSE_INVALID: oauth token endpoint returned status={} \
             with non-json body ({e}): {snippet}",
            status.as_u16()
        )
    })?;

    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match access_token {
        Some(token) => {
            tracing::info!(
                status = status.as_u16(),
                token = %mask_token(token),
                "oauth token exchange succeeded"
            );
            Ok(TokenGrant::Granted {
                access_token: token.to_string(),
            })
        }
        None => {
            let (error_code, error_message) = parse_oauth_error_details(&value);
            tracing::warn!(
                status = status.as_u16(),
                error_code = error_code.as_deref().unwrap_or("<none>"),
                error_description = error_message.as_deref().unwrap_or("<none>"),
                "oauth token response missing access_token"
            );
            Ok(TokenGrant::Denied { body: value })
        }
    }
}

fn parse_oauth_error_details(value: &Value) -> (Option<String>, Option<String>) {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut code = non_empty(value.get("error"));
    let mut message = non_empty(value.get("error_description"));

    if let Some(err_obj) = value.get("error").and_then(Value::as_object) {
        if code.is_none() {
            code = non_empty(err_obj.get("code")).or_else(|| non_empty(err_obj.get("type")));
        }
        if message.is_none() {
            message = non_empty(err_obj.get("message"));
        }
    }

    (code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(code: &str) -> TokenExchangeRequest {
        TokenExchangeRequest {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn exchange_posts_json_credentials_and_returns_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/login/oauth/access_token")
            .match_header("accept", "application/json")
            .match_body(Matcher::Json(json!({
                "client_id": "client-id",
                "client_secret": "client-secret",
                "code": "one-time-code"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"abc123","token_type":"bearer","scope":"repo,user"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/login/oauth/access_token", server.url());
        let grant = exchange_authorization_code(&client, &url, &request(" one-time-code "))
            .await
            .expect("grant");

        assert_eq!(
            grant,
            TokenGrant::Granted {
                access_token: "abc123".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exchange_without_access_token_is_denied_with_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#,
            )
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/token", server.url());
        let grant = exchange_authorization_code(&client, &url, &request("stale"))
            .await
            .expect("grant");

        assert_eq!(
            grant,
            TokenGrant::Denied {
                body: json!({
                    "error": "bad_verification_code",
                    "error_description": "The code passed is incorrect or expired."
                })
            }
        );
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/token", server.url());
        let err = exchange_authorization_code(&client, &url, &request("c"))
            .await
            .expect_err("should fail");

        assert_eq!(err.code(), "OAUTH_TOKEN_RESPONSE_INVALID");
        assert!(err.message().contains("status=502"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = reqwest::Client::new();
        let url = format!("http://{addr}/token");
        let err = exchange_authorization_code(&client, &url, &request("c"))
            .await
            .expect_err("should fail");

        assert_eq!(err.code(), "OAUTH_TOKEN_CONNECT_FAILED");
        assert!(err
            .message()
            .starts_with("oauth token exchange request failed: could not connect"));
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let stall = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(300))
            .build()
            .expect("client");
        let url = format!("http://{addr}/token");
        let err = exchange_authorization_code(&client, &url, &request("c"))
            .await
            .expect_err("should time out");
        stall.abort();

        assert_eq!(err.code(), "OAUTH_TOKEN_TIMEOUT");
        assert!(err.message().contains("timed out waiting for token endpoint"));
    }

    #[test]
    fn parse_oauth_error_details_supports_standard_and_nested_shapes() {
        let (code, message) = parse_oauth_error_details(&json!({
            "error": "invalid_grant",
            "error_description": "token is invalid"
        }));
        assert_eq!(code.as_deref(), Some("invalid_grant"));
        assert_eq!(message.as_deref(), Some("token is invalid"));

        let (code, message) = parse_oauth_error_details(&json!({
            "error": {"type": "invalid_request_error", "message": "nope"}
        }));
        assert_eq!(code.as_deref(), Some("invalid_request_error"));
        assert_eq!(message.as_deref(), Some("nope"));

        assert_eq!(parse_oauth_error_details(&json!({})), (None, None));
    }
}
