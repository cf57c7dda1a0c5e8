//! Per-request execution context handed to resolvers

use crypto_core::jwt::Identity;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::RequestAuthenticator;
use crate::store::NoteStore;

/// Store handle plus the request's verified identity
///
/// Built once per request and never mutated afterwards. The identity is
/// either fully verified or absent.
pub struct ExecutionContext {
    store: Arc<dyn NoteStore>,
    identity: Option<Identity>,
}

impl ExecutionContext {
    pub fn store(&self) -> &dyn NoteStore {
        self.store.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Assembles an `ExecutionContext` for each request
///
/// Credentials are re-verified on every request; nothing is cached between
/// requests.
#[derive(Debug, Clone)]
pub struct GatewayContextBuilder {
    authenticator: RequestAuthenticator,
}

impl GatewayContextBuilder {
    pub fn new(authenticator: RequestAuthenticator) -> Self {
        Self { authenticator }
    }

    pub fn build(
        &self,
        raw_header: Option<&str>,
        store: Arc<dyn NoteStore>,
    ) -> Result<ExecutionContext> {
        let identity = self.authenticator.authenticate(raw_header)?;
        Ok(ExecutionContext { store, identity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::store::InMemoryNoteStore;
    use crypto_core::jwt::CredentialCodec;

    fn builder() -> (GatewayContextBuilder, Arc<CredentialCodec>) {
        let codec = Arc::new(
            CredentialCodec::new("context-test-secret-0123456789abcdef", None).unwrap(),
        );
        let authenticator = RequestAuthenticator::new(Arc::clone(&codec));
        (GatewayContextBuilder::new(authenticator), codec)
    }

    #[test]
    fn test_build_with_valid_credential() {
        let (builder, codec) = builder();
        let token = codec.sign(&Identity::new("user-7")).unwrap();

        let context = builder
            .build(Some(&token), Arc::new(InMemoryNoteStore::new()))
            .unwrap();
        assert_eq!(context.identity(), Some(&Identity::new("user-7")));
    }

    #[test]
    fn test_build_without_credential_is_anonymous() {
        let (builder, _) = builder();
        let context = builder
            .build(None, Arc::new(InMemoryNoteStore::new()))
            .unwrap();
        assert!(context.identity().is_none());
    }

    #[test]
    fn test_build_with_bad_credential_fails() {
        let (builder, _) = builder();
        let result = builder.build(Some("garbage"), Arc::new(InMemoryNoteStore::new()));
        assert!(matches!(result, Err(GatewayError::SessionInvalid)));
    }

    #[tokio::test]
    async fn test_context_exposes_store() {
        let (builder, _) = builder();
        let context = builder
            .build(None, Arc::new(InMemoryNoteStore::new()))
            .unwrap();
        assert!(context.store().find().await.unwrap().is_empty());
    }
}
