use axum::{
    extract::Extension,
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, info};

use super::HOME_PATH;
use crate::{
    auth::{cookie::clear_session_cookie, Session, Sessions},
    notekeep::error::AppError,
};

#[utoipa::path(
    get,
    path= "/logout",
    responses (
        (status = 303, description = "Session destroyed, redirect to /"),
        (status = 500, description = "Session store unavailable; the cookie is still cleared"),
    ),
    tag= "auth"
)]
pub async fn logout(
    Extension(sessions): Extension<Arc<Sessions>>,
    Extension(session): Extension<Session>,
) -> Response {
    let destroyed = if session.is_persisted() {
        sessions.destroy(&session).await
    } else {
        Ok(())
    };

    let mut response = match destroyed {
        Ok(()) => {
            if session.is_authenticated() {
                info!("logged out");
            }
            Redirect::to(HOME_PATH).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    };

    match clear_session_cookie(sessions.config()) {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clear cookie: {err}"),
    }

    response
}
