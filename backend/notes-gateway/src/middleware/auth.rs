//! Credential extraction and verification for incoming requests

use async_graphql::{Context, ErrorExtensions};
use crypto_core::jwt::{CredentialCodec, Identity};
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;
use crate::middleware::context::ExecutionContext;

const BEARER_PREFIX: &str = "bearer";

/// Turns a raw `Authorization` header value into a verified identity
///
/// A missing or blank header is an anonymous request. A header that is
/// present but fails verification is rejected; it is never downgraded to
/// anonymous.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    codec: Arc<CredentialCodec>,
}

impl RequestAuthenticator {
    pub fn new(codec: Arc<CredentialCodec>) -> Self {
        Self { codec }
    }

    pub fn authenticate(&self, raw_header: Option<&str>) -> Result<Option<Identity>> {
        let Some(credential) = raw_header.and_then(extract_credential) else {
            return Ok(None);
        };

        match self.codec.verify(credential) {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                warn!(error = %e, "Rejecting request with unverifiable credential");
                Err(e.into())
            }
        }
    }
}

/// Strip whitespace and an optional `Bearer` scheme; `None` when nothing is left
fn extract_credential(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();

    let credential = match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(BEARER_PREFIX) => rest.trim_start(),
        _ if trimmed.eq_ignore_ascii_case(BEARER_PREFIX) => "",
        _ => trimmed,
    };

    (!credential.is_empty()).then_some(credential)
}

/// Verified identity of the current request, or an `UNAUTHENTICATED` error
pub fn require_identity<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Identity> {
    ctx.data::<ExecutionContext>()?.identity().ok_or_else(|| {
        async_graphql::Error::new("Unauthorized: authentication required")
            .extend_with(|_, e| e.set("code", "UNAUTHENTICATED"))
    })
}
