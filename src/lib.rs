mod app;
mod gateway;
mod infra;
mod shared;

pub use gateway::RelayServer;
pub use infra::settings;
pub use shared::error::{AppError, AppResult};

use shared::blocking;
use shared::security::mask_token;

/// Loads settings, starts the relay and serves until Ctrl-C.
pub async fn run() -> AppResult<()> {
    let settings = blocking::run("load_settings", settings::load).await?;
    let _logging = app::logging::init(&settings)?;

    if settings.uses_dev_client_id() || settings.uses_dev_client_secret() {
        tracing::warn!(
            client_id = %settings.client_id,
            client_secret = %mask_token(&settings.client_secret),
            "using development OAuth credentials; set {} and {} for deployments",
            settings::ENV_CLIENT_ID,
            settings::ENV_CLIENT_SECRET
        );
    }
    tracing::debug!(settings = ?settings, "relay settings resolved");

    let server = RelayServer::start(settings).await?;
    tracing::info!(
        addr = %server.local_addr(),
        "cms oauth relay listening on {}",
        server.base_url()
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::with_source("SYSTEM_ERROR", "failed to listen for ctrl-c", e))?;
    tracing::info!("shutdown signal received");

    server.shutdown().await
}
