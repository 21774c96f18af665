//! Auth gateway: session resolution and the login wall.
//!
//! [`resolve_session`] runs on every route and always leaves a [`Session`] in
//! the request extensions. [`require_login`] runs on protected routes only,
//! after resolution and before the handler.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use std::sync::Arc;
use tracing::debug;

use crate::notekeep::error::AppError;

use super::{
    cookie::{clear_session_cookie, extract_session_token, session_cookie},
    session::{Session, Sessions},
    Identity,
};

pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Outcome of the login wall for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Gate {
    Admit(Identity),
    Deny,
}

/// Decide whether a resolved session may pass the login wall.
#[must_use]
pub fn decide(session: Option<&Session>) -> Gate {
    match session.and_then(Session::identity) {
        Some(identity) => Gate::Admit(identity.clone()),
        None => Gate::Deny,
    }
}

/// Attach the caller's session to the request.
///
/// A stored session gets its cookie refreshed on the way out so the browser
/// deadline slides with the server one. A cookie that no longer resolves is
/// cleared. Handlers that set their own cookie (login, logout) win.
pub async fn resolve_session(
    Extension(sessions): Extension<Arc<Sessions>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers());
    let resolved = match token.as_deref() {
        Some(token) => sessions.resolve(token).await,
        None => None,
    };

    let cookie = match &resolved {
        Some(session) => session_cookie(sessions.config(), session.id()).ok(),
        None if token.is_some() => {
            debug!("presented session did not resolve");
            clear_session_cookie(sessions.config()).ok()
        }
        None => None,
    };

    let session = resolved.unwrap_or_else(|| sessions.create_anonymous());
    request.extensions_mut().insert(session);

    let mut response = next.run(request).await;
    if let Some(cookie) = cookie {
        if !response.headers().contains_key(SET_COOKIE) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    response
}

/// Admit authenticated sessions; redirect everything else to `/unauthorized`
/// without running the handler.
pub async fn require_login(mut request: Request, next: Next) -> Response {
    match decide(request.extensions().get::<Session>()) {
        Gate::Admit(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Gate::Deny => {
            debug!("anonymous request to protected route");
            Redirect::to(UNAUTHORIZED_PATH).into_response()
        }
    }
}

/// Extractor for the identity admitted by [`require_login`]. Used outside the
/// login wall it rejects with `SessionInvalid`.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Self)
            .ok_or(AppError::SessionInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{memory::MemorySessionStore, session::SessionConfig};
    use anyhow::Result;
    use uuid::Uuid;

    fn sessions() -> Sessions {
        Sessions::new(Arc::new(MemorySessionStore::new()), SessionConfig::new())
    }

    #[test]
    fn missing_session_is_denied() {
        assert_eq!(decide(None), Gate::Deny);
    }

    #[test]
    fn anonymous_session_is_denied() {
        let session = sessions().create_anonymous();
        assert_eq!(decide(Some(&session)), Gate::Deny);
    }

    #[tokio::test]
    async fn session_with_identity_is_admitted() -> Result<()> {
        let sessions = sessions();
        let identity = Identity {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
        };
        let mut session = sessions.create_anonymous();
        sessions.set_identity(&mut session, identity.clone());
        sessions.save(&mut session).await?;
        assert_eq!(decide(Some(&session)), Gate::Admit(identity));
        Ok(())
    }
}
