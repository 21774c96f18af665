//! Authentication and session handling.
//!
//! Flow Overview: every request passes through [`gateway::resolve_session`],
//! which turns the session cookie into a [`Session`] in the request
//! extensions (anonymous when the cookie is missing, expired, or the store is
//! unreachable). Protected routes additionally run [`gateway::require_login`],
//! which admits only sessions carrying an [`Identity`].
//!
//! Login goes through [`Credentials::authenticate`] and then promotes the
//! session: the identifier is regenerated, the identity written, and the
//! record saved before the response carrying the cookie is built.

pub mod cookie;
pub mod credentials;
pub mod gateway;
pub mod memory;
pub mod password;
pub mod session;
pub mod storage;
mod utils;

use std::{future::Future, pin::Pin};
use uuid::Uuid;

pub use credentials::{CredentialError, Credentials, InsertOutcome, User, UserStore};
pub use gateway::{AuthenticatedUser, Gate};
pub use password::PasswordHasher;
pub use session::{
    spawn_session_reaper, Session, SessionConfig, SessionId, SessionRecord, SessionStore, Sessions,
};

/// Boxed future returned by the storage traits so they stay object safe.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Who is logged in, as copied into the session at login time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}
