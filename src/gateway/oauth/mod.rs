//! Usage: OAuth building blocks used by the relay handlers.

pub(crate) mod authorize;
pub(crate) mod popup;
pub(crate) mod state;
pub(crate) mod token_exchange;
