/// Error types for the notes gateway
///
/// Every variant except `Config` is a request-scoped rejection raised before
/// any resolver runs. They are rendered in the GraphQL error shape so clients
/// can handle them the same way as execution errors.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use crypto_core::jwt::CredentialError;

use crate::store::StoreError;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or invalid process-wide configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential was presented and failed verification
    #[error("Session invalid: the supplied credential could not be verified")]
    SessionInvalid,

    #[error("Query depth {depth} exceeds maximum allowed depth {max_depth}")]
    QueryTooDeep { depth: usize, max_depth: usize },

    #[error("Query complexity {complexity} exceeds maximum allowed complexity {max_complexity}")]
    QueryTooComplex { complexity: u64, max_complexity: u64 },

    /// Query document could not be parsed or analyzed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GatewayError {
    /// Machine-readable code placed in `extensions.code`
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "CONFIG_ERROR",
            GatewayError::SessionInvalid => "SESSION_INVALID",
            GatewayError::QueryTooDeep { .. } => "QUERY_TOO_DEEP",
            GatewayError::QueryTooComplex { .. } => "QUERY_TOO_COMPLEX",
            GatewayError::InvalidQuery(_) => "GRAPHQL_PARSE_FAILED",
            GatewayError::Store(e) => e.code(),
        }
    }
}

impl From<CredentialError> for GatewayError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Config(msg) | CredentialError::Signing(msg) => {
                GatewayError::Config(msg)
            }
            // A presented credential that fails verification rejects the request
            CredentialError::InvalidCredential => GatewayError::SessionInvalid,
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::SessionInvalid => StatusCode::UNAUTHORIZED,
            GatewayError::QueryTooDeep { .. }
            | GatewayError::QueryTooComplex { .. }
            | GatewayError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            GatewayError::Config(_) | GatewayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "data": null,
            "errors": [{
                "message": self.to_string(),
                "extensions": { "code": self.code() },
            }],
        }))
    }
}
