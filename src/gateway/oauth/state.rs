//! Usage: Anti-forgery `state` generation for the authorization redirect.
//!
//! The value only travels in the outbound authorization URL; the callback never compares it.

use rand::distributions::Alphanumeric;
use rand::Rng;

pub(crate) const STATE_LEN: usize = 32;

pub(crate) fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}
