//! Note storage collaborator
//!
//! Resolvers only see the `NoteStore` trait. The gateway ships an in-memory
//! adapter; persistence engines plug in behind the same trait.

use async_graphql::ErrorExtensions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A stored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub author: String,
}

/// Fields supplied when creating a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
    pub content: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Note store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}

impl ErrorExtensions for StoreError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All notes, oldest first
    async fn find(&self) -> Result<Vec<Note>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Note, StoreError>;

    async fn create(&self, fields: NewNote) -> Result<Note, StoreError>;
}

/// Process-local note store
#[derive(Debug, Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<Vec<Note>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing notes
    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes: RwLock::new(notes),
        }
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn find(&self) -> Result<Vec<Note>, StoreError> {
        Ok(self.notes.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Note, StoreError> {
        self.notes
            .read()
            .await
            .iter()
            .find(|note| note.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, fields: NewNote) -> Result<Note, StoreError> {
        let note = Note {
            id: Uuid::new_v4().to_string(),
            content: fields.content,
            author: fields.author,
        };

        self.notes.write().await.push(note.clone());
        debug!(note_id = %note.id, author = %note.author, "Note created");

        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_find() {
        let store = InMemoryNoteStore::new();
        let created = store
            .create(NewNote {
                content: "hello".to_string(),
                author: "user-1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(store.find().await.unwrap(), vec![created.clone()]);
        assert_eq!(store.find_by_id(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_find_by_unknown_id() {
        let store = InMemoryNoteStore::new();
        assert_eq!(
            store.find_by_id("missing").await,
            Err(StoreError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_find_preserves_insertion_order() {
        let store = InMemoryNoteStore::new();
        for content in ["first", "second", "third"] {
            store
                .create(NewNote {
                    content: content.to_string(),
                    author: "user-1".to_string(),
                })
                .await
                .unwrap();
        }

        let contents: Vec<_> = store
            .find()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_error_extension_code() {
        let err = StoreError::NotFound("abc".to_string()).extend();
        assert_eq!(err.message, "Note not found: abc");
        let code = err
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(async_graphql::Value::from("NOT_FOUND")));
    }
}
