//! Postgres-backed note store.

use anyhow::Context;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{Note, NoteStore};
use crate::auth::StoreFuture;

#[derive(Clone, Debug)]
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn note_from_row(row: &PgRow) -> Result<Note, sqlx::Error> {
    Ok(Note {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
    })
}

impl NoteStore for PgNoteStore {
    fn insert<'a>(&'a self, note: &'a Note) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let query = "INSERT INTO notes (id, owner_id, title, content) VALUES ($1, $2, $3, $4)";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "INSERT",
                db.statement = query
            );
            sqlx::query(query)
                .bind(note.id)
                .bind(note.owner_id)
                .bind(&note.title)
                .bind(&note.content)
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to insert note")?;
            Ok(())
        })
    }

    fn list_by_owner(&self, owner_id: Uuid) -> StoreFuture<'_, Vec<Note>> {
        Box::pin(async move {
            let query = r"
                SELECT id, owner_id, title, content
                FROM notes
                WHERE owner_id = $1
                ORDER BY created_at ASC, id ASC
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let rows = sqlx::query(query)
                .bind(owner_id)
                .fetch_all(&self.pool)
                .instrument(span)
                .await
                .context("failed to list notes")?;

            rows.iter()
                .map(note_from_row)
                .collect::<Result<Vec<_>, _>>()
                .context("failed to decode note row")
        })
    }

    fn find_by_owner_and_title<'a>(
        &'a self,
        owner_id: Uuid,
        title: &'a str,
    ) -> StoreFuture<'a, Vec<Note>> {
        Box::pin(async move {
            let query = r"
                SELECT id, owner_id, title, content
                FROM notes
                WHERE owner_id = $1 AND title = $2
                ORDER BY created_at ASC, id ASC
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let rows = sqlx::query(query)
                .bind(owner_id)
                .bind(title)
                .fetch_all(&self.pool)
                .instrument(span)
                .await
                .context("failed to search notes")?;

            rows.iter()
                .map(note_from_row)
                .collect::<Result<Vec<_>, _>>()
                .context("failed to decode note row")
        })
    }

    fn find_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<Note>> {
        Box::pin(async move {
            let query = "SELECT id, owner_id, title, content FROM notes WHERE id = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let row = sqlx::query(query)
                .bind(id)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await
                .context("failed to lookup note")?;

            row.as_ref()
                .map(note_from_row)
                .transpose()
                .context("failed to decode note row")
        })
    }
}
