//! Usage: Relay server lifecycle (shared state, bind, serve, graceful shutdown).

use crate::infra::settings::RelaySettings;
use crate::shared::error::{AppError, AppResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::listen;
use super::oauth::authorize::build_authorize_url;
use super::routes::build_router;

#[derive(Clone)]
pub(crate) struct RelayAppState {
    pub(crate) settings: Arc<RelaySettings>,
    pub(crate) client: reqwest::Client,
}

impl RelayAppState {
    pub(crate) fn new(settings: RelaySettings) -> AppResult<Self> {
        // Fail at startup rather than on the first popup.
        build_authorize_url(&settings, "startup-probe")?;

        let client = reqwest::Client::builder()
            .user_agent(format!("cms-oauth-relay/{}", env!("CARGO_PKG_VERSION")))
            .timeout(settings.token_request_timeout())
            .build()
            .map_err(|e| AppError::with_source("RELAY_HTTP_CLIENT_INIT", e.to_string(), e))?;

        Ok(Self {
            settings: Arc::new(settings),
            client,
        })
    }
}

fn resolve_bind_target(settings: &RelaySettings) -> AppResult<(String, u16)> {
    let parsed = listen::parse_listen_address(&settings.listen_address)
        .map_err(|e| format!("CONFIG_INVALID: {e}"))?;
    let port = listen::validate_port(parsed.port.unwrap_or(settings.port))
        .map_err(|e| format!("CONFIG_INVALID: {e}"))?;
    Ok((parsed.host, port))
}

pub struct RelayServer {
    local_addr: SocketAddr,
    base_url: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RelayServer {
    pub async fn start(settings: RelaySettings) -> AppResult<Self> {
        let (bind_host, port) = resolve_bind_target(&settings)?;
        let state = RelayAppState::new(settings)?;

        let listener = tokio::net::TcpListener::bind((bind_host.as_str(), port))
            .await
            .map_err(|e| {
                let target = listen::format_host_port(&bind_host, port);
                AppError::with_source(
                    "RELAY_BIND_FAILED",
                    format!("failed to bind {target}: {e}"),
                    e,
                )
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AppError::with_source("RELAY_BIND_FAILED", e.to_string(), e))?;

        let base_host = if listen::is_wildcard_host(&bind_host) {
            "127.0.0.1".to_string()
        } else {
            bind_host.clone()
        };
        let base_url = format!(
            "http://{}",
            listen::format_host_port(&base_host, local_addr.port())
        );

        let app = build_router(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            if let Err(err) = serve.await {
                tracing::error!(bind_addr = %local_addr, "relay server error: {}", err);
            }
        });

        tracing::info!(bind_addr = %local_addr, base_url = %base_url, "relay server started");

        Ok(Self {
            local_addr,
            base_url,
            shutdown: shutdown_tx,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Loopback-reachable URL of the server (wildcard binds map to 127.0.0.1).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn shutdown(self) -> AppResult<()> {
        let _ = self.shutdown.send(());
        self.task
            .await
            .map_err(|e| AppError::new("TASK_JOIN", format!("relay server task failed: {e}")))?;
        tracing::info!(bind_addr = %self.local_addr, "relay server stopped");
        Ok(())
    }
}
