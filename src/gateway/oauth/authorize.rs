//! Usage: Authorization URL construction for the `start-auth` redirect.

use crate::infra::settings::RelaySettings;
use crate::shared::error::AppResult;
use reqwest::Url;

pub(crate) fn build_authorize_url(settings: &RelaySettings, state: &str) -> AppResult<Url> {
    let mut url = Url::parse(settings.authorize_url.trim()).map_err(|e| {
        format!(
            "CONFIG_INVALID: invalid authorize url {:?}: {e}",
            settings.authorize_url
        )
    })?;
    url.query_pairs_mut()
        .append_pair("client_id", settings.client_id.trim())
        .append_pair("scope", settings.scope.trim())
        .append_pair("state", state);
    Ok(url)
}
