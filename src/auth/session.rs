//! Server-side sessions with rolling expiry.
//!
//! A [`Session`] is the typed per-request view of a session: its identifier,
//! the identity payload (if logged in), and its timestamps. A
//! [`SessionRecord`] is what a [`SessionStore`] persists, keyed by the
//! SHA-256 hash of the identifier.
//!
//! Anonymous sessions are created in memory and only reach the store when
//! they are saved. Resolving a stored session renews its deadline to
//! `now + ttl` and persists the renewal before the session is handed out.

use anyhow::{Context, Result};
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use super::{
    utils::{generate_session_token, hash_session_token, is_well_formed_session_token, now_unix_seconds},
    Identity, StoreFuture,
};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_REAP_INTERVAL_SECONDS: u64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    ttl_seconds: i64,
    cookie_secure: bool,
    reap_interval: Duration,
}

impl SessionConfig {
    /// Default config: one week rolling TTL, non-secure cookie, hourly reaping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
            reap_interval: Duration::from_secs(DEFAULT_REAP_INTERVAL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_reap_interval_seconds(mut self, seconds: u64) -> Self {
        self.reap_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    #[must_use]
    pub const fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub const fn reap_interval(&self) -> Duration {
        self.reap_interval
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque session identifier. `Debug` never prints the raw value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(generate_session_token())
    }

    /// Accept a cookie value only if it has the shape of a generated identifier.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        is_well_formed_session_token(raw).then(|| Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the store persists this session.
    #[must_use]
    pub fn storage_key(&self) -> Vec<u8> {
        hash_session_token(&self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(..)")
    }
}

/// Persisted form of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub key: Vec<u8>,
    pub identity: Option<Identity>,
    pub created_at_unix: i64,
    pub last_access_unix: i64,
    pub expires_at_unix: i64,
}

/// Durable keyed storage for session records.
///
/// `load` must return an error for records it cannot decode; the session
/// service treats that the same as a missing record.
pub trait SessionStore: Send + Sync {
    fn load<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>>;
    /// Insert or replace the record stored under `record.key`.
    fn save<'a>(&'a self, record: &'a SessionRecord) -> StoreFuture<'a, ()>;
    /// Move the deadline of an existing record. Never inserts; returns
    /// `false` when nothing is stored under `key`.
    fn touch<'a>(
        &'a self,
        key: &'a [u8],
        last_access_unix: i64,
        expires_at_unix: i64,
    ) -> StoreFuture<'a, bool>;
    fn delete<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, ()>;
    /// Remove every record whose deadline is at or before `now_unix`.
    fn purge_expired(&self, now_unix: i64) -> StoreFuture<'_, u64>;
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Per-request session state, attached to the request by the gateway.
#[derive(Clone, Debug)]
pub struct Session {
    id: SessionId,
    identity: Option<Identity>,
    created_at_unix: i64,
    last_access_unix: i64,
    expires_at_unix: i64,
    persisted: bool,
}

impl Session {
    fn from_record(id: SessionId, record: SessionRecord) -> Self {
        Self {
            id,
            identity: record.identity,
            created_at_unix: record.created_at_unix,
            last_access_unix: record.last_access_unix,
            expires_at_unix: record.expires_at_unix,
            persisted: true,
        }
    }

    fn to_record(&self) -> SessionRecord {
        SessionRecord {
            key: self.id.storage_key(),
            identity: self.identity.clone(),
            created_at_unix: self.created_at_unix,
            last_access_unix: self.last_access_unix,
            expires_at_unix: self.expires_at_unix,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The logged-in identity, or `None` for an anonymous session.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// True once the session exists in the store.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    #[must_use]
    pub fn created_at_unix(&self) -> i64 {
        self.created_at_unix
    }

    #[must_use]
    pub fn last_access_unix(&self) -> i64 {
        self.last_access_unix
    }

    #[must_use]
    pub fn expires_at_unix(&self) -> i64 {
        self.expires_at_unix
    }
}

pub struct Sessions {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl Sessions {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Allocate a fresh anonymous session. Nothing is written until `save`.
    #[must_use]
    pub fn create_anonymous(&self) -> Session {
        self.create_anonymous_at(now_unix_seconds())
    }

    #[must_use]
    pub fn create_anonymous_at(&self, now_unix: i64) -> Session {
        Session {
            id: SessionId::generate(),
            identity: None,
            created_at_unix: now_unix,
            last_access_unix: now_unix,
            expires_at_unix: now_unix.saturating_add(self.config.ttl_seconds),
            persisted: false,
        }
    }

    /// Load and renew a session by its raw identifier.
    ///
    /// Returns `None` when the identifier is malformed, unknown, expired,
    /// undecodable, or when the store cannot be reached.
    pub async fn resolve(&self, raw_id: &str) -> Option<Session> {
        self.resolve_at(raw_id, now_unix_seconds()).await
    }

    #[instrument(skip_all)]
    pub async fn resolve_at(&self, raw_id: &str, now_unix: i64) -> Option<Session> {
        let id = SessionId::parse(raw_id)?;
        let key = id.storage_key();

        let record = match self.store.load(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("session not found");
                return None;
            }
            Err(err) => {
                error!("Failed to load session: {err:#}");
                return None;
            }
        };

        if record.expires_at_unix <= now_unix {
            debug!("session expired");
            if let Err(err) = self.store.delete(&key).await {
                warn!("Failed to delete expired session: {err:#}");
            }
            return None;
        }

        let renewed = SessionRecord {
            last_access_unix: now_unix,
            expires_at_unix: now_unix.saturating_add(self.config.ttl_seconds),
            ..record
        };

        // Renewal only updates a row that still exists, so a concurrent
        // destroy or regenerate wins.
        match self
            .store
            .touch(&key, renewed.last_access_unix, renewed.expires_at_unix)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!("session removed before renewal");
                return None;
            }
            Err(err) => {
                error!("Failed to renew session: {err:#}");
                return None;
            }
        }

        Some(Session::from_record(id, renewed))
    }

    /// Attach a logged-in identity. The session must be saved before the
    /// client is told it is logged in.
    pub fn set_identity(&self, session: &mut Session, identity: Identity) {
        session.identity = Some(identity);
    }

    /// Persist the session, resetting its deadline to `now + ttl`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub async fn save(&self, session: &mut Session) -> Result<()> {
        self.save_at(session, now_unix_seconds()).await
    }

    /// # Errors
    /// Returns an error if the store rejects the write.
    pub async fn save_at(&self, session: &mut Session, now_unix: i64) -> Result<()> {
        session.last_access_unix = now_unix;
        session.expires_at_unix = now_unix.saturating_add(self.config.ttl_seconds);
        self.store
            .save(&session.to_record())
            .await
            .context("failed to save session")?;
        session.persisted = true;
        Ok(())
    }

    /// Swap the identifier for a new one, dropping the old record.
    /// Called on login so a pre-login identifier is never promoted.
    ///
    /// # Errors
    /// Returns an error if the old record cannot be deleted.
    pub async fn regenerate(&self, session: &mut Session) -> Result<()> {
        if session.persisted {
            self.store
                .delete(&session.id.storage_key())
                .await
                .context("failed to delete previous session")?;
        }
        session.id = SessionId::generate();
        session.persisted = false;
        Ok(())
    }

    /// Remove the session from the store. Later lookups with the same
    /// identifier resolve to `None`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the delete.
    pub async fn destroy(&self, session: &Session) -> Result<()> {
        self.store
            .delete(&session.id.storage_key())
            .await
            .context("failed to delete session")
    }

    /// # Errors
    /// Returns an error if the store rejects the purge.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.store.purge_expired(now_unix_seconds()).await
    }

    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

/// Periodically delete expired session records.
pub fn spawn_session_reaper(sessions: Arc<Sessions>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval = sessions.config().reap_interval();

        loop {
            sleep(interval).await;

            match sessions.purge_expired().await {
                Ok(0) => debug!("no expired sessions to purge"),
                Ok(purged) => info!(purged, "purged expired sessions"),
                Err(err) => error!("session purge failed: {err:#}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemorySessionStore;
    use uuid::Uuid;

    const NOW: i64 = 1_700_000_000;
    const TTL: i64 = 7 * 24 * 60 * 60;

    fn sessions() -> (Arc<MemorySessionStore>, Sessions) {
        let store = Arc::new(MemorySessionStore::new());
        let sessions = Sessions::new(store.clone(), SessionConfig::new().with_ttl_seconds(TTL));
        (store, sessions)
    }

    fn alice() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl_seconds(), 604_800);
        assert!(!config.cookie_secure());
        assert_eq!(config.reap_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn session_id_debug_is_redacted() {
        let id = SessionId::generate();
        let printed = format!("{id:?}");
        assert!(!printed.contains(id.as_str()));
    }

    #[tokio::test]
    async fn anonymous_session_is_not_persisted() -> Result<()> {
        let (store, sessions) = sessions();
        let session = sessions.create_anonymous_at(NOW);
        assert!(!session.is_authenticated());
        assert!(!session.is_persisted());
        assert_eq!(store.count().await, 0);
        assert!(sessions
            .resolve_at(session.id().as_str(), NOW)
            .await
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn identity_is_visible_only_after_save() -> Result<()> {
        let (_store, sessions) = sessions();
        let mut session = sessions.create_anonymous_at(NOW);
        let identity = alice();
        sessions.set_identity(&mut session, identity.clone());

        assert!(sessions
            .resolve_at(session.id().as_str(), NOW)
            .await
            .is_none());

        sessions.save_at(&mut session, NOW).await?;
        let resolved = sessions.resolve_at(session.id().as_str(), NOW + 1).await;
        assert_eq!(
            resolved.as_ref().and_then(Session::identity),
            Some(&identity)
        );
        Ok(())
    }

    #[tokio::test]
    async fn resolve_slides_expiry_forward() -> Result<()> {
        let (store, sessions) = sessions();
        let mut session = sessions.create_anonymous_at(NOW);
        sessions.set_identity(&mut session, alice());
        sessions.save_at(&mut session, NOW).await?;
        let id = session.id().as_str().to_string();

        // Valid right up to the deadline.
        let later = NOW + TTL - 1;
        let renewed = sessions.resolve_at(&id, later).await;
        assert_eq!(renewed.as_ref().map(Session::expires_at_unix), Some(later + TTL));
        assert_eq!(renewed.as_ref().map(Session::last_access_unix), Some(later));
        assert_eq!(renewed.as_ref().map(Session::created_at_unix), Some(NOW));

        // The renewal was persisted, so the original deadline no longer applies.
        let stored = store.get(&session.id().storage_key()).await;
        assert_eq!(stored.map(|record| record.expires_at_unix), Some(later + TTL));
        assert!(sessions.resolve_at(&id, NOW + TTL + 10).await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn expired_session_resolves_to_none_and_is_removed() -> Result<()> {
        let (store, sessions) = sessions();
        let mut session = sessions.create_anonymous_at(NOW);
        sessions.set_identity(&mut session, alice());
        sessions.save_at(&mut session, NOW).await?;

        assert!(sessions
            .resolve_at(session.id().as_str(), NOW + TTL)
            .await
            .is_none());
        assert_eq!(store.count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn destroy_invalidates_identifier() -> Result<()> {
        let (_store, sessions) = sessions();
        let mut session = sessions.create_anonymous_at(NOW);
        sessions.set_identity(&mut session, alice());
        sessions.save_at(&mut session, NOW).await?;

        sessions.destroy(&session).await?;
        assert!(sessions
            .resolve_at(session.id().as_str(), NOW + 1)
            .await
            .is_none());
        Ok(())
    }

    /// Deletes each record right after handing it out, as a logout racing
    /// with the current request would.
    struct RemovedAfterLoad {
        inner: Arc<MemorySessionStore>,
    }

    impl SessionStore for RemovedAfterLoad {
        fn load<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>> {
            Box::pin(async move {
                let record = self.inner.load(key).await?;
                self.inner.delete(key).await?;
                Ok(record)
            })
        }

        fn save<'a>(&'a self, record: &'a SessionRecord) -> StoreFuture<'a, ()> {
            self.inner.save(record)
        }

        fn touch<'a>(
            &'a self,
            key: &'a [u8],
            last_access_unix: i64,
            expires_at_unix: i64,
        ) -> StoreFuture<'a, bool> {
            self.inner.touch(key, last_access_unix, expires_at_unix)
        }

        fn delete<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, ()> {
            self.inner.delete(key)
        }

        fn purge_expired(&self, now_unix: i64) -> StoreFuture<'_, u64> {
            self.inner.purge_expired(now_unix)
        }

        fn ping(&self) -> StoreFuture<'_, ()> {
            self.inner.ping()
        }
    }

    #[tokio::test]
    async fn renewal_does_not_resurrect_a_destroyed_session() -> Result<()> {
        let inner = Arc::new(MemorySessionStore::new());
        let racing = Sessions::new(
            Arc::new(RemovedAfterLoad { inner: inner.clone() }),
            SessionConfig::new().with_ttl_seconds(TTL),
        );
        let plain = Sessions::new(inner.clone(), SessionConfig::new().with_ttl_seconds(TTL));

        let mut session = plain.create_anonymous_at(NOW);
        plain.set_identity(&mut session, alice());
        plain.save_at(&mut session, NOW).await?;
        let id = session.id().as_str().to_string();

        assert!(racing.resolve_at(&id, NOW + 1).await.is_none());
        assert_eq!(inner.count().await, 0);
        assert!(plain.resolve_at(&id, NOW + 2).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn regenerate_drops_previous_identifier() -> Result<()> {
        let (store, sessions) = sessions();
        let mut session = sessions.create_anonymous_at(NOW);
        sessions.save_at(&mut session, NOW).await?;
        let old_id = session.id().clone();

        sessions.regenerate(&mut session).await?;
        assert_ne!(session.id(), &old_id);
        assert!(!session.is_persisted());
        assert_eq!(store.count().await, 0);
        assert!(sessions.resolve_at(old_id.as_str(), NOW + 1).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_store_fails_closed() -> Result<()> {
        let (store, sessions) = sessions();
        let mut session = sessions.create_anonymous_at(NOW);
        sessions.set_identity(&mut session, alice());
        sessions.save_at(&mut session, NOW).await?;

        store.set_unavailable(true);
        assert!(sessions
            .resolve_at(session.id().as_str(), NOW + 1)
            .await
            .is_none());
        assert!(sessions.save_at(&mut session, NOW + 1).await.is_err());
        assert!(sessions.ping().await.is_err());

        store.set_unavailable(false);
        assert!(sessions
            .resolve_at(session.id().as_str(), NOW + 2)
            .await
            .is_some_and(|session| session.is_authenticated()));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_identifier_is_anonymous() {
        let (_store, sessions) = sessions();
        assert!(sessions.resolve_at("", NOW).await.is_none());
        assert!(sessions.resolve_at("garbage;value", NOW).await.is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_records() -> Result<()> {
        let (store, sessions) = sessions();
        let mut stale = sessions.create_anonymous_at(NOW - 2 * TTL);
        sessions.save_at(&mut stale, NOW - 2 * TTL).await?;
        let mut fresh = sessions.create_anonymous();
        sessions.save(&mut fresh).await?;

        assert_eq!(sessions.purge_expired().await?, 1);
        assert_eq!(store.count().await, 1);
        Ok(())
    }
}
