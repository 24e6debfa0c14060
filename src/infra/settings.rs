//! Usage: Relay settings (schema, defaults, TOML file + environment loading, sanitisation).
//!
//! Settings are resolved once at startup and shared read-only with the request handlers.
//! Precedence, lowest first: built-in defaults, the TOML file named by `RELAY_CONFIG`,
//! then individual environment variables.

use crate::shared::error::AppResult;
use crate::shared::security::mask_token;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_PROVIDER: &str = "github";
pub const DEFAULT_SCOPE: &str = "repo,user";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const DEFAULT_TOKEN_REQUEST_TIMEOUT_SECONDS: u32 = 15;
pub const DEFAULT_LOG_FILTER: &str = "cms_oauth_relay=info,tower_http=info";
const MAX_TOKEN_REQUEST_TIMEOUT_SECONDS: u32 = 120;

// Development-only OAuth app credentials. Deployments must override both.
pub const DEV_CLIENT_ID: &str = "Ov23liDevRelayClient";
pub const DEV_CLIENT_SECRET: &str = "dev-relay-client-secret-change-me";

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG";
pub const ENV_CLIENT_ID: &str = "OAUTH_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "OAUTH_CLIENT_SECRET";
pub const ENV_PORT: &str = "PORT";
pub const ENV_LISTEN_ADDR: &str = "RELAY_LISTEN_ADDR";
pub const ENV_AUTHORIZE_URL: &str = "OAUTH_AUTHORIZE_URL";
pub const ENV_TOKEN_URL: &str = "OAUTH_TOKEN_URL";
pub const ENV_SCOPE: &str = "OAUTH_SCOPE";
pub const ENV_PROVIDER: &str = "OAUTH_PROVIDER";
pub const ENV_TOKEN_TIMEOUT_SECONDS: &str = "OAUTH_TOKEN_TIMEOUT_SECONDS";
pub const ENV_LOG_FILTER: &str = "RELAY_LOG";
pub const ENV_LOG_DIR: &str = "RELAY_LOG_DIR";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub client_id: String,
    pub client_secret: String,
    // Host, or host:port; an explicit port here wins over `port`.
    pub listen_address: String,
    pub port: u16,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: String,
    // Provider name used in the handshake message and the storage record.
    pub provider: String,
    pub token_request_timeout_seconds: u32,
    pub log_filter: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            client_id: DEV_CLIENT_ID.to_string(),
            client_secret: DEV_CLIENT_SECRET.to_string(),
            listen_address: DEFAULT_LISTEN_HOST.to_string(),
            port: DEFAULT_PORT,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            token_request_timeout_seconds: DEFAULT_TOKEN_REQUEST_TIMEOUT_SECONDS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

impl std::fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &mask_token(&self.client_secret))
            .field("listen_address", &self.listen_address)
            .field("port", &self.port)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("provider", &self.provider)
            .field(
                "token_request_timeout_seconds",
                &self.token_request_timeout_seconds,
            )
            .field("log_filter", &self.log_filter)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl RelaySettings {
    pub fn uses_dev_client_id(&self) -> bool {
        self.client_id == DEV_CLIENT_ID
    }

    pub fn uses_dev_client_secret(&self) -> bool {
        self.client_secret == DEV_CLIENT_SECRET
    }

    pub fn token_request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.token_request_timeout_seconds))
    }
}

fn reset_if_blank(value: &mut String, default: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        *value = default.to_string();
        return true;
    }
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
        return true;
    }
    false
}

fn sanitize_credentials(settings: &mut RelaySettings) -> bool {
    let mut changed = false;
    changed |= reset_if_blank(&mut settings.client_id, DEV_CLIENT_ID);
    changed |= reset_if_blank(&mut settings.client_secret, DEV_CLIENT_SECRET);
    changed
}

fn sanitize_provider_endpoints(settings: &mut RelaySettings) -> bool {
    let mut changed = false;
    changed |= reset_if_blank(&mut settings.authorize_url, DEFAULT_AUTHORIZE_URL);
    changed |= reset_if_blank(&mut settings.token_url, DEFAULT_TOKEN_URL);
    changed |= reset_if_blank(&mut settings.scope, DEFAULT_SCOPE);
    changed |= reset_if_blank(&mut settings.provider, DEFAULT_PROVIDER);
    changed
}

fn sanitize_token_request_timeout(settings: &mut RelaySettings) -> bool {
    if settings.token_request_timeout_seconds == 0 {
        settings.token_request_timeout_seconds = DEFAULT_TOKEN_REQUEST_TIMEOUT_SECONDS;
        return true;
    }
    if settings.token_request_timeout_seconds > MAX_TOKEN_REQUEST_TIMEOUT_SECONDS {
        settings.token_request_timeout_seconds = MAX_TOKEN_REQUEST_TIMEOUT_SECONDS;
        return true;
    }
    false
}

fn sanitize_logging(settings: &mut RelaySettings) -> bool {
    let mut changed = reset_if_blank(&mut settings.log_filter, DEFAULT_LOG_FILTER);
    if settings
        .log_dir
        .as_ref()
        .is_some_and(|dir| dir.as_os_str().is_empty())
    {
        settings.log_dir = None;
        changed = true;
    }
    changed
}

/// Normalises out-of-range or blank values. Returns `true` if anything changed.
pub fn sanitize(settings: &mut RelaySettings) -> bool {
    let mut changed = false;
    changed |= sanitize_credentials(settings);
    changed |= sanitize_provider_endpoints(settings);
    changed |= sanitize_token_request_timeout(settings);
    changed |= sanitize_logging(settings);
    // An empty listen address means "all interfaces".
    if settings.listen_address.trim().is_empty() {
        settings.listen_address = DEFAULT_LISTEN_HOST.to_string();
        changed = true;
    }
    changed
}

pub fn parse_settings_toml(content: &str) -> AppResult<RelaySettings> {
    let settings: RelaySettings = toml::from_str(content)
        .map_err(|e| format!("CONFIG_INVALID: failed to parse relay config: {e}"))?;
    Ok(settings)
}

pub fn read_file(path: &Path) -> AppResult<RelaySettings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        format!(
            "CONFIG_INVALID: failed to read relay config {}: {e}",
            path.display()
        )
    })?;
    parse_settings_toml(&content)
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| format!("CONFIG_INVALID: {key} must be a number, got {raw:?}").into())
}

/// Applies environment overrides. `lookup` returns the raw value of a variable, if set.
pub fn apply_env_overrides(
    settings: &mut RelaySettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> AppResult<()> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_CLIENT_ID) {
        settings.client_id = v;
    }
    if let Some(v) = get(ENV_CLIENT_SECRET) {
        settings.client_secret = v;
    }
    if let Some(v) = get(ENV_PORT) {
        settings.port = parse_number(ENV_PORT, &v)?;
    }
    if let Some(v) = get(ENV_LISTEN_ADDR) {
        settings.listen_address = v;
    }
    if let Some(v) = get(ENV_AUTHORIZE_URL) {
        settings.authorize_url = v;
    }
    if let Some(v) = get(ENV_TOKEN_URL) {
        settings.token_url = v;
    }
    if let Some(v) = get(ENV_SCOPE) {
        settings.scope = v;
    }
    if let Some(v) = get(ENV_PROVIDER) {
        settings.provider = v;
    }
    if let Some(v) = get(ENV_TOKEN_TIMEOUT_SECONDS) {
        settings.token_request_timeout_seconds = parse_number(ENV_TOKEN_TIMEOUT_SECONDS, &v)?;
    }
    if let Some(v) = get(ENV_LOG_FILTER) {
        settings.log_filter = v;
    }
    if let Some(v) = get(ENV_LOG_DIR) {
        settings.log_dir = Some(PathBuf::from(v.trim()));
    }

    Ok(())
}

pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> AppResult<RelaySettings> {
    let mut settings = match lookup(ENV_CONFIG_PATH).filter(|v| !v.trim().is_empty()) {
        Some(path) => read_file(Path::new(path.trim()))?,
        None => RelaySettings::default(),
    };
    apply_env_overrides(&mut settings, &lookup)?;
    sanitize(&mut settings);
    Ok(settings)
}

/// Resolves settings from the process environment (and the optional config file).
pub fn load() -> AppResult<RelaySettings> {
    load_with(|key| std::env::var(key).ok())
}
