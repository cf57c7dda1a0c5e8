//! Note schema and resolvers

use async_graphql::{Context, ErrorExtensions, Object, Result as GraphQLResult, SimpleObject, ID};
use serde::{Deserialize, Serialize};

use crate::middleware::{require_identity, ExecutionContext};
use crate::store::{self, NewNote};

/// Page size used by `notes` when `first` is omitted
pub const DEFAULT_PAGE_SIZE: i32 = 100;

#[derive(SimpleObject, Clone, Debug, Serialize, Deserialize)]
pub struct Note {
    pub id: ID,
    pub content: String,
    pub author: String,
}

impl From<store::Note> for Note {
    fn from(note: store::Note) -> Self {
        Note {
            id: ID(note.id),
            content: note.content,
            author: note.author,
        }
    }
}

#[derive(Default)]
pub struct NoteQuery;

#[Object]
impl NoteQuery {
    /// Notes, oldest first
    async fn notes(
        &self,
        ctx: &Context<'_>,
        #[graphql(default_with = "DEFAULT_PAGE_SIZE")] first: i32,
    ) -> GraphQLResult<Vec<Note>> {
        let context = ctx.data::<ExecutionContext>()?;
        let notes = context.store().find().await.map_err(|e| e.extend())?;

        Ok(notes
            .into_iter()
            .take(first.max(0) as usize)
            .map(Note::from)
            .collect())
    }

    async fn note(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<Note> {
        let context = ctx.data::<ExecutionContext>()?;
        let note = context
            .store()
            .find_by_id(id.as_str())
            .await
            .map_err(|e| e.extend())?;

        Ok(note.into())
    }
}

#[derive(Default)]
pub struct NoteMutation;

#[Object]
impl NoteMutation {
    /// Create a note authored by the authenticated caller
    async fn new_note(&self, ctx: &Context<'_>, content: String) -> GraphQLResult<Note> {
        let identity = require_identity(ctx)?;

        if content.trim().is_empty() {
            return Err(async_graphql::Error::new("Note content must not be empty")
                .extend_with(|_, e| e.set("code", "BAD_USER_INPUT")));
        }

        let context = ctx.data::<ExecutionContext>()?;
        let note = context
            .store()
            .create(NewNote {
                content,
                author: identity.id.clone(),
            })
            .await
            .map_err(|e| e.extend())?;

        Ok(note.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_note() {
        let note: Note = store::Note {
            id: "n-1".to_string(),
            content: "hello".to_string(),
            author: "user-1".to_string(),
        }
        .into();

        assert_eq!(note.id, ID::from("n-1"));
        assert_eq!(note.author, "user-1");
    }
}
