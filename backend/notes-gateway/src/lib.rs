//! Notes GraphQL Gateway Library
//! Re-exports modules for the binaries and integration tests

pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod schema;
pub mod security;
pub mod store;

pub use error::GatewayError;
pub use gateway::Gateway;
