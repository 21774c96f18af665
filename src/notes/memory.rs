//! In-process note store, insertion ordered.

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Note, NoteStore};
use crate::auth::StoreFuture;

#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: RwLock<Vec<Note>>,
}

impl MemoryNoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoteStore for MemoryNoteStore {
    fn insert<'a>(&'a self, note: &'a Note) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.notes.write().await.push(note.clone());
            Ok(())
        })
    }

    fn list_by_owner(&self, owner_id: Uuid) -> StoreFuture<'_, Vec<Note>> {
        Box::pin(async move {
            Ok(self
                .notes
                .read()
                .await
                .iter()
                .filter(|note| note.owner_id == owner_id)
                .cloned()
                .collect())
        })
    }

    fn find_by_owner_and_title<'a>(
        &'a self,
        owner_id: Uuid,
        title: &'a str,
    ) -> StoreFuture<'a, Vec<Note>> {
        Box::pin(async move {
            Ok(self
                .notes
                .read()
                .await
                .iter()
                .filter(|note| note.owner_id == owner_id && note.title == title)
                .cloned()
                .collect())
        })
    }

    fn find_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<Note>> {
        Box::pin(async move {
            Ok(self
                .notes
                .read()
                .await
                .iter()
                .find(|note| note.id == id)
                .cloned())
        })
    }
}
