//! Request authentication and per-request context

pub mod auth;
pub mod context;

pub use auth::{require_identity, RequestAuthenticator};
pub use context::{ExecutionContext, GatewayContextBuilder};
