//! Guarded GraphQL request pipeline
//!
//! query guard -> context build (authenticate, attach store) -> execution.
//! Any rejection short-circuits before a resolver or the store is touched.

use async_graphql::{Request, Response};
use crypto_core::jwt::CredentialCodec;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::metrics::{REQUESTS_EXECUTED, REQUESTS_REJECTED};
use crate::middleware::{GatewayContextBuilder, RequestAuthenticator};
use crate::schema::{build_schema, AppSchema};
use crate::security::{QueryCostPolicy, QueryGuard};
use crate::store::NoteStore;

pub struct Gateway {
    schema: AppSchema,
    guard: QueryGuard,
    contexts: GatewayContextBuilder,
    store: Arc<dyn NoteStore>,
}

impl Gateway {
    pub fn new(
        schema: AppSchema,
        guard: QueryGuard,
        contexts: GatewayContextBuilder,
        store: Arc<dyn NoteStore>,
    ) -> Self {
        Self {
            schema,
            guard,
            contexts,
            store,
        }
    }

    /// Wire every component from loaded configuration
    pub fn from_config(config: &Config, store: Arc<dyn NoteStore>) -> Result<Self> {
        let codec = Arc::new(config.jwt.credential_codec()?);
        Ok(Self::with_codec(
            codec,
            QueryCostPolicy::for_notes_schema(
                config.graphql.max_depth,
                config.graphql.max_complexity,
            ),
            config.graphql.introspection,
            store,
        ))
    }

    pub fn with_codec(
        codec: Arc<CredentialCodec>,
        policy: QueryCostPolicy,
        introspection: bool,
        store: Arc<dyn NoteStore>,
    ) -> Self {
        Self::new(
            build_schema(introspection),
            QueryGuard::new(policy),
            GatewayContextBuilder::new(RequestAuthenticator::new(codec)),
            store,
        )
    }

    pub fn schema(&self) -> &AppSchema {
        &self.schema
    }

    pub fn guard(&self) -> &QueryGuard {
        &self.guard
    }

    /// Run one GraphQL request
    ///
    /// `Err` means the request was rejected before execution; resolver
    /// failures come back inside the `Response`.
    pub async fn execute(&self, auth_header: Option<&str>, request: Request) -> Result<Response> {
        let cost = self.guard.check_request(&request).map_err(rejected)?;

        let context = self
            .contexts
            .build(auth_header, Arc::clone(&self.store))
            .map_err(rejected)?;

        debug!(
            depth = cost.depth,
            complexity = cost.complexity,
            authenticated = context.identity().is_some(),
            operation = request.operation_name.as_deref().unwrap_or_default(),
            "Executing GraphQL request"
        );

        REQUESTS_EXECUTED.inc();
        Ok(self.schema.execute(request.data(context)).await)
    }
}

fn rejected(err: GatewayError) -> GatewayError {
    REQUESTS_REJECTED.with_label_values(&[err.code()]).inc();
    err
}
