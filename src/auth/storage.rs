//! Postgres-backed user and session stores.

use anyhow::{anyhow, Context};
use sqlx::{Connection, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{
    credentials::{InsertOutcome, User, UserStore},
    session::{SessionRecord, SessionStore},
    utils::is_unique_violation,
    Identity, StoreFuture,
};

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for PgUserStore {
    fn insert<'a>(&'a self, user: &'a User) -> StoreFuture<'a, InsertOutcome> {
        Box::pin(async move {
            // The unique index on username is the arbiter for concurrent signups.
            let query = "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3)";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "INSERT",
                db.statement = query
            );
            let result = sqlx::query(query)
                .bind(user.id)
                .bind(&user.username)
                .bind(&user.password_hash)
                .execute(&self.pool)
                .instrument(span)
                .await;

            match result {
                Ok(_) => Ok(InsertOutcome::Created(user.clone())),
                Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
                Err(err) => Err(err).context("failed to insert user"),
            }
        })
    }

    fn find_by_username<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            let query = "SELECT id, username, password_hash FROM users WHERE username = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let row = sqlx::query(query)
                .bind(username)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await
                .context("failed to lookup user")?;

            row.map(|row| -> anyhow::Result<User> {
                Ok(User {
                    id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    password_hash: row.try_get("password_hash")?,
                })
            })
            .transpose()
            .context("failed to decode user row")
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Both identity columns are set or neither is; anything else is corrupt.
fn decode_identity(user_id: Option<Uuid>, username: Option<String>) -> anyhow::Result<Option<Identity>> {
    match (user_id, username) {
        (Some(user_id), Some(username)) => Ok(Some(Identity { user_id, username })),
        (None, None) => Ok(None),
        _ => Err(anyhow!("corrupt session record: partial identity")),
    }
}

impl SessionStore for PgSessionStore {
    fn load<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>> {
        Box::pin(async move {
            let query = r"
                SELECT user_id, username, created_at_unix, last_access_unix, expires_at_unix
                FROM sessions
                WHERE session_hash = $1
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let row = sqlx::query(query)
                .bind(key)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await
                .context("failed to lookup session")?;

            let Some(row) = row else {
                return Ok(None);
            };

            let identity = decode_identity(row.try_get("user_id")?, row.try_get("username")?)?;
            Ok(Some(SessionRecord {
                key: key.to_vec(),
                identity,
                created_at_unix: row.try_get("created_at_unix")?,
                last_access_unix: row.try_get("last_access_unix")?,
                expires_at_unix: row.try_get("expires_at_unix")?,
            }))
        })
    }

    fn save<'a>(&'a self, record: &'a SessionRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let query = r"
                INSERT INTO sessions
                    (session_hash, user_id, username, created_at_unix, last_access_unix, expires_at_unix)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (session_hash) DO UPDATE SET
                    user_id = EXCLUDED.user_id,
                    username = EXCLUDED.username,
                    last_access_unix = EXCLUDED.last_access_unix,
                    expires_at_unix = EXCLUDED.expires_at_unix
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "UPSERT",
                db.statement = query
            );
            sqlx::query(query)
                .bind(&record.key)
                .bind(record.identity.as_ref().map(|identity| identity.user_id))
                .bind(record.identity.as_ref().map(|identity| identity.username.as_str()))
                .bind(record.created_at_unix)
                .bind(record.last_access_unix)
                .bind(record.expires_at_unix)
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to save session")?;
            Ok(())
        })
    }

    fn touch<'a>(
        &'a self,
        key: &'a [u8],
        last_access_unix: i64,
        expires_at_unix: i64,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let query = r"
                UPDATE sessions
                SET last_access_unix = $2, expires_at_unix = $3
                WHERE session_hash = $1
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "UPDATE",
                db.statement = query
            );
            let result = sqlx::query(query)
                .bind(key)
                .bind(last_access_unix)
                .bind(expires_at_unix)
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to renew session")?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn delete<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let query = "DELETE FROM sessions WHERE session_hash = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "DELETE",
                db.statement = query
            );
            sqlx::query(query)
                .bind(key)
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to delete session")?;
            Ok(())
        })
    }

    fn purge_expired(&self, now_unix: i64) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let query = "DELETE FROM sessions WHERE expires_at_unix <= $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "DELETE",
                db.statement = query
            );
            let result = sqlx::query(query)
                .bind(now_unix)
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to purge expired sessions")?;
            Ok(result.rows_affected())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let acquire_span = info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            );
            let mut conn = self
                .pool
                .acquire()
                .instrument(acquire_span)
                .await
                .context("failed to acquire database connection")?;
            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            conn.ping()
                .instrument(ping_span)
                .await
                .context("failed to ping database")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_identity_requires_both_columns() {
        let id = Uuid::new_v4();
        assert!(matches!(
            decode_identity(Some(id), Some("alice".to_string())),
            Ok(Some(Identity { user_id, .. })) if user_id == id
        ));
        assert!(matches!(decode_identity(None, None), Ok(None)));
        assert!(decode_identity(Some(id), None).is_err());
        assert!(decode_identity(None, Some("alice".to_string())).is_err());
    }
}
