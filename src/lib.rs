//! # Notekeep
//!
//! `notekeep` is a small multi-user note keeping service. Users register,
//! log in, and manage personal text notes behind a login wall.
//!
//! ## Sessions
//!
//! Logging in produces a durable, server-side session addressed by an opaque
//! identifier carried in an `HttpOnly` cookie. Only the SHA-256 hash of the
//! identifier is stored. Sessions use a rolling expiry: every resolved request
//! pushes the deadline one TTL into the future (one week by default).
//!
//! ## Authorization
//!
//! There is a single privilege level: logged in or not. Protected routes run
//! behind the auth gateway, which redirects anonymous requests to
//! `/unauthorized` before any handler code executes.
//!
//! Notes are scoped by the identity the gateway attached to the request, never
//! by an owner id taken from the request itself. The one exception is the
//! direct `/note/{id}` lookup, which is intentionally unscoped so a note link
//! can be shared.
//!
//! ## Credentials
//!
//! Passwords are hashed with bcrypt. Unknown usernames and wrong passwords are
//! logged distinctly but answered identically to avoid username enumeration.

pub mod auth;
pub mod cli;
pub mod notekeep;
pub mod notes;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
