//! Usage: Popup page emitted after a successful token exchange.
//!
//! The page stores the token for the CMS editor and notifies the opener window with the
//! handshake message, then closes itself. Every interpolated value goes through
//! [`script_literal`], so token contents cannot terminate the `<script>` element.
//!
//! The second `postMessage` targets `"*"`: any opener origin receives the token. Mixed
//! http/https admin deployments depend on it.

use crate::shared::error::AppResult;
use serde::Serialize;
use std::fmt;

/// Storage key read by older CMS editor builds.
pub(crate) const LEGACY_STORAGE_KEY: &str = "netlify-cms-user";
/// Storage key read by current CMS editor builds.
pub(crate) const STORAGE_KEY: &str = "decap-cms-user";
pub(crate) const CLOSE_DELAY_MS: u64 = 100;
pub(crate) const CONFIRMATION_TEXT: &str =
    "Authorization complete. This window will close automatically.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenStorageRecord {
    pub(crate) token: String,
    pub(crate) backend_name: String,
}

#[derive(Serialize)]
struct HandshakePayload<'a> {
    token: &'a str,
    provider: &'a str,
}

/// `authorization:<provider>:success:{"token":"...","provider":"..."}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HandshakeMessage {
    pub(crate) provider: String,
    pub(crate) token: String,
}

impl fmt::Display for HandshakeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = serde_json::to_string(&HandshakePayload {
            token: &self.token,
            provider: &self.provider,
        })
        .map_err(|_| fmt::Error)?;
        write!(f, "authorization:{}:success:{payload}", self.provider)
    }
}

/// Serializes `value` as JSON that is safe to splice into an inline `<script>`.
fn script_literal<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    let json = serde_json::to_string(value)
        .map_err(|e| format!("SYSTEM_ERROR: failed to serialize popup payload: {e}"))?;
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    Ok(out)
}

pub(crate) fn render_popup_html(
    message: &HandshakeMessage,
    record: &TokenStorageRecord,
) -> AppResult<String> {
    let record = script_literal(record)?;
    let message = script_literal(&message.to_string())?;
    let storage_keys = script_literal(&[LEGACY_STORAGE_KEY, STORAGE_KEY])?;
    let confirmation = script_literal(CONFIRMATION_TEXT)?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Authorizing</title></head>
<body>
<p>Authorizing...</p>
<script>
(function () {{
  var record = {record};
  var message = {message};
  var storageKeys = {storage_keys};
  try {{
    var serialized = JSON.stringify(record);
    for (var i = 0; i < storageKeys.length; i++) {{
      window.localStorage.setItem(storageKeys[i], serialized);
    }}
  }} catch (err) {{
    console.error("failed to store token", err);
  }}
  if (window.opener) {{
    window.opener.postMessage(message, window.location.origin);
    window.opener.postMessage(message, "*");
  }}
  document.body.innerText = {confirmation};
  setTimeout(function () {{ window.close(); }}, {CLOSE_DELAY_MS});
}})();
</script>
</body>
</html>
"#
    ))
}
