//! Authentication schema and resolvers

use async_graphql::{Context, Object, Result as GraphQLResult, SimpleObject, ID};
use serde::{Deserialize, Serialize};

use crate::middleware::ExecutionContext;

/// The authenticated caller
#[derive(SimpleObject, Clone, Debug, Serialize, Deserialize)]
pub struct Viewer {
    pub id: ID,
}

#[derive(Default)]
pub struct AuthQuery;

#[Object]
impl AuthQuery {
    async fn hello(&self) -> &str {
        "Hello world!"
    }

    async fn health(&self) -> &str {
        "ok"
    }

    /// The caller's identity, or null for anonymous requests
    async fn me(&self, ctx: &Context<'_>) -> GraphQLResult<Option<Viewer>> {
        let context = ctx.data::<ExecutionContext>()?;

        Ok(context.identity().map(|identity| Viewer {
            id: ID(identity.id.clone()),
        }))
    }
}
