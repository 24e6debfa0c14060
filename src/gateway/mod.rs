//! Usage: HTTP surface of the relay (router, `start-auth` / `handle-callback`, listener lifecycle).

mod listen;
mod manager;
pub(crate) mod oauth;
mod relay;
mod routes;

pub use manager::RelayServer;
