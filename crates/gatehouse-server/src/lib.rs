//! # Gatehouse Server
//!
//! HTTP surface for Gatehouse: provider login routes that end in a session
//! token, and `/api` routes behind the authorization gate.

pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ConfigError, DatabaseTarget, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use routes::app;
pub use state::AppState;
