//! Route handlers.
//!
//! Handlers receive their collaborators as `Extension`s installed by the
//! router. Protected handlers take [`AuthenticatedUser`], which only exists
//! once the login wall admitted the request.
//!
//! [`AuthenticatedUser`]: crate::auth::AuthenticatedUser

pub mod health;
pub mod logout;
pub mod members;
pub mod notes;
pub mod root;
pub mod search;
pub mod user_login;
pub mod user_register;

pub const HOME_PATH: &str = "/";
pub const MEMBERS_PATH: &str = "/members-only";
pub const NOTE_LIST_PATH: &str = "/note";
