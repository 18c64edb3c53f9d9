#![forbid(unsafe_code)]

//! The multi-tenant sync endpoint: authenticated HTTP, per-route rate
//! limits, serialized writes per tenant, and per-tenant files on disk with
//! strict path containment.

pub mod attachments;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod tasks;
pub mod write_lock;

pub use config::{bind_addr_from_env, ServerConfig};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
