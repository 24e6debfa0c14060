//! Usage: `start-auth` and `handle-callback` handlers of the OAuth relay.
//!
//! Each request is independent: the generated `state` is not retained, and every failure is
//! terminal for that popup (the text stays visible until the user closes it).

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::manager::RelayAppState;
use super::oauth::authorize::build_authorize_url;
use super::oauth::popup::{render_popup_html, HandshakeMessage, TokenStorageRecord};
use super::oauth::state::generate_state;
use super::oauth::token_exchange::{
    exchange_authorization_code, TokenExchangeRequest, TokenGrant,
};
use crate::shared::error::AppError;

pub(super) const MISSING_CODE_BODY: &str = "Error: No code received from GitHub.";

#[derive(Debug, Deserialize)]
pub(super) struct CallbackParams {
    code: Option<String>,
}

fn error_text(err: &AppError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error: {}", err.message()),
    )
        .into_response()
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => error_text(&AppError::new(
            "SYSTEM_ERROR",
            "authorization url is not a valid header value",
        )),
    }
}

pub(super) async fn start_auth(State(state): State<RelayAppState>) -> Response {
    let oauth_state = generate_state();
    match build_authorize_url(&state.settings, &oauth_state) {
        Ok(url) => {
            tracing::debug!(
                provider = %state.settings.provider,
                "redirecting popup to authorization page"
            );
            found(url.as_str())
        }
        Err(err) => {
            tracing::error!(
                error_code = err.code(),
                "failed to build authorization url: {}",
                err
            );
            error_text(&err)
        }
    }
}

pub(super) async fn handle_callback(
    State(state): State<RelayAppState>,
    params: Option<Query<CallbackParams>>,
) -> Response {
    let code = params
        .and_then(|Query(params)| params.code)
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty());
    let Some(code) = code else {
        tracing::warn!("oauth callback without code");
        return (StatusCode::BAD_REQUEST, MISSING_CODE_BODY).into_response();
    };

    let settings = &state.settings;
    let request = TokenExchangeRequest {
        client_id: settings.client_id.clone(),
        client_secret: settings.client_secret.clone(),
        code,
    };

    match exchange_authorization_code(&state.client, &settings.token_url, &request).await {
        Ok(TokenGrant::Granted { access_token }) => {
            let message = HandshakeMessage {
                provider: settings.provider.clone(),
                token: access_token.clone(),
            };
            let record = TokenStorageRecord {
                token: access_token,
                backend_name: settings.provider.clone(),
            };
            match render_popup_html(&message, &record) {
                Ok(html) => Html(html).into_response(),
                Err(err) => {
                    tracing::error!(
                        error_code = err.code(),
                        "failed to render popup page: {}",
                        err
                    );
                    error_text(&err)
                }
            }
        }
        Ok(TokenGrant::Denied { body }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Login failed: {body}"),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error_code = err.code(), "oauth token exchange failed: {}", err);
            error_text(&err)
        }
    }
}
