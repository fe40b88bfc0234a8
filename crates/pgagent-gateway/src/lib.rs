//! pgagent-gateway — the HTTP front door: auth, routing, and handlers.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod state;

pub use server::start_gateway;
pub use state::AppState;
