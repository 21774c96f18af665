//! Notes and ownership scoping.
//!
//! Every scoped operation takes the [`Identity`] the auth gateway attached to
//! the request. There is no API that accepts a bare owner id from a caller,
//! so one user cannot name another user's notes through these paths.
//!
//! [`Notes::find_by_id_unscoped`] is the deliberate exception: it serves the
//! direct `/note/{id}` link and does not check the owner.

pub mod memory;
pub mod storage;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::auth::{Identity, StoreFuture};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
}

/// Persistence for notes. Owner filters must be applied by the backend
/// query, not by the caller after fetching.
pub trait NoteStore: Send + Sync {
    fn insert<'a>(&'a self, note: &'a Note) -> StoreFuture<'a, ()>;
    fn list_by_owner(&self, owner_id: Uuid) -> StoreFuture<'_, Vec<Note>>;
    fn find_by_owner_and_title<'a>(
        &'a self,
        owner_id: Uuid,
        title: &'a str,
    ) -> StoreFuture<'a, Vec<Note>>;
    fn find_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<Note>>;
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("note title is required")]
    InvalidInput,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub struct Notes {
    store: Arc<dyn NoteStore>,
}

impl Notes {
    #[must_use]
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Create a note owned by `owner`.
    ///
    /// # Errors
    /// `InvalidInput` for a blank title, `Storage` for backend failures.
    #[instrument(skip(self, owner, content), fields(owner_id = %owner.user_id))]
    pub async fn create(
        &self,
        owner: &Identity,
        title: &str,
        content: &str,
    ) -> Result<Note, NoteError> {
        if title.trim().is_empty() {
            return Err(NoteError::InvalidInput);
        }

        let note = Note {
            id: Uuid::new_v4(),
            owner_id: owner.user_id,
            title: title.to_string(),
            content: content.to_string(),
        };
        self.store.insert(&note).await?;
        debug!(note_id = %note.id, "note created");
        Ok(note)
    }

    /// All notes owned by `owner`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn list_mine(&self, owner: &Identity) -> Result<Vec<Note>, NoteError> {
        Ok(self.store.list_by_owner(owner.user_id).await?)
    }

    /// Notes owned by `owner` whose title equals `title` exactly.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn search_mine(&self, owner: &Identity, title: &str) -> Result<Vec<Note>, NoteError> {
        Ok(self
            .store
            .find_by_owner_and_title(owner.user_id, title)
            .await?)
    }

    /// Fetch a note by id for any caller, without an ownership check.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn find_by_id_unscoped(&self, id: Uuid) -> Result<Option<Note>, NoteError> {
        Ok(self.store.find_by_id(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use super::memory::MemoryNoteStore;

    fn identity(username: &str) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }

    fn notes() -> Notes {
        Notes::new(Arc::new(MemoryNoteStore::new()))
    }

    #[tokio::test]
    async fn notes_are_listed_only_for_their_owner() -> Result<()> {
        let notes = notes();
        let alice = identity("alice");
        let bob = identity("bob");

        let created = notes.create(&alice, "t1", "hello").await?;
        assert_eq!(created.owner_id, alice.user_id);

        assert_eq!(notes.list_mine(&alice).await?, vec![created]);
        assert!(notes.list_mine(&bob).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn search_filters_by_owner_and_exact_title() -> Result<()> {
        let notes = notes();
        let alice = identity("alice");
        let bob = identity("bob");

        let mine = notes.create(&alice, "groceries", "milk").await?;
        notes.create(&alice, "Groceries", "eggs").await?;
        notes.create(&bob, "groceries", "bread").await?;

        assert_eq!(notes.search_mine(&alice, "groceries").await?, vec![mine]);
        assert!(notes.search_mine(&alice, "grocer").await?.is_empty());
        let bobs = notes.search_mine(&bob, "groceries").await?;
        assert_eq!(bobs.len(), 1);
        assert!(bobs.iter().all(|note| note.owner_id == bob.user_id));
        Ok(())
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let notes = notes();
        let alice = identity("alice");
        assert!(matches!(
            notes.create(&alice, "  ", "content").await,
            Err(NoteError::InvalidInput)
        ));
        assert!(notes.list_mine(&alice).await.is_ok_and(|list| list.is_empty()));
    }

    #[tokio::test]
    async fn unscoped_lookup_ignores_owner() -> Result<()> {
        let notes = notes();
        let alice = identity("alice");
        let note = notes.create(&alice, "shared", "link me").await?;

        assert_eq!(notes.find_by_id_unscoped(note.id).await?, Some(note));
        assert_eq!(notes.find_by_id_unscoped(Uuid::new_v4()).await?, None);
        Ok(())
    }
}
