//! In-process user and session stores.
//!
//! These keep the same contracts as the Postgres stores (atomic username
//! uniqueness, keyed session records) but lose everything on restart, so the
//! server never uses them. They back the test suites and embedders that
//! bring their own durability.

use anyhow::anyhow;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::RwLock;

use super::{
    credentials::{InsertOutcome, User, UserStore},
    session::{SessionRecord, SessionStore},
    StoreFuture,
};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

impl UserStore for MemoryUserStore {
    fn insert<'a>(&'a self, user: &'a User) -> StoreFuture<'a, InsertOutcome> {
        Box::pin(async move {
            let mut users = self.users.write().await;
            if users.contains_key(&user.username) {
                return Ok(InsertOutcome::Conflict);
            }
            users.insert(user.username.clone(), user.clone());
            Ok(InsertOutcome::Created(user.clone()))
        })
    }

    fn find_by_username<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move { Ok(self.users.read().await.get(username).cloned()) })
    }
}

/// Session records keyed by identifier hash. `set_unavailable` simulates a
/// backend outage: every operation fails until it is cleared.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<Vec<u8>, SessionRecord>>,
    unavailable: AtomicBool,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn get(&self, key: &[u8]) -> Option<SessionRecord> {
        self.records.read().await.get(key).cloned()
    }

    fn check_available(&self) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(anyhow!("session store unavailable"))
        } else {
            Ok(())
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.records.read().await.get(key).cloned())
        })
    }

    fn save<'a>(&'a self, record: &'a SessionRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            self.records
                .write()
                .await
                .insert(record.key.clone(), record.clone());
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
            self.check_available()?;
            let mut records = self.records.write().await;
            let Some(record) = records.get_mut(key) else {
                return Ok(false);
            };
            record.last_access_unix = last_access_unix;
            record.expires_at_unix = expires_at_unix;
            Ok(true)
        })
    }

    fn delete<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            self.records.write().await.remove(key);
            Ok(())
        })
    }

    fn purge_expired(&self, now_unix: i64) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            self.check_available()?;
            let mut records = self.records.write().await;
            let before = records.len();
            records.retain(|_, record| record.expires_at_unix > now_unix);
            Ok(u64::try_from(before - records.len()).unwrap_or(u64::MAX))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_available() })
    }
}
