//! GraphQL schema for the notes API

pub mod auth;
pub mod note;

use async_graphql::{EmptySubscription, MergedObject, Schema};

/// Root query object
#[derive(MergedObject, Default)]
pub struct QueryRoot(note::NoteQuery, auth::AuthQuery);

/// Root mutation object
#[derive(MergedObject, Default)]
pub struct MutationRoot(note::NoteMutation);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema
///
/// The store and the caller's identity are not schema data: they arrive per
/// request inside an `ExecutionContext`.
pub fn build_schema(introspection: bool) -> AppSchema {
    let builder = Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        EmptySubscription,
    );

    if introspection {
        builder.finish()
    } else {
        builder.disable_introspection().finish()
    }
}
