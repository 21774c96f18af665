//! Request boundary error mapping.
//!
//! Domain failures become redirects back to a form or page. Only storage
//! failures surface as a 500, and the detail stays in the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{gateway::UNAUTHORIZED_PATH, CredentialError},
    notes::NoteError,
};

pub const LOGIN_PATH: &str = "/login";
pub const NOTE_CREATE_PATH: &str = "/note/create";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("required field is blank")]
    InvalidInput { redirect: &'static str },
    #[error("username is already taken")]
    UsernameTaken,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("session is missing or expired")]
    SessionInvalid,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput { redirect } => Redirect::to(redirect).into_response(),
            Self::UsernameTaken | Self::AuthenticationFailed => {
                Redirect::to(LOGIN_PATH).into_response()
            }
            Self::SessionInvalid => Redirect::to(UNAUTHORIZED_PATH).into_response(),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            Self::Internal(err) => {
                error!("request failed: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidInput => Self::InvalidInput {
                redirect: LOGIN_PATH,
            },
            CredentialError::UsernameTaken => Self::UsernameTaken,
            CredentialError::NotFound | CredentialError::WrongPassword => {
                Self::AuthenticationFailed
            }
            CredentialError::Storage(err) => Self::Internal(err),
        }
    }
}

impl From<NoteError> for AppError {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::InvalidInput => Self::InvalidInput {
                redirect: NOTE_CREATE_PATH,
            },
            NoteError::Storage(err) => Self::Internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::http::header::LOCATION;

    fn location(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    #[test]
    fn unknown_user_and_wrong_password_look_identical() {
        let not_found = AppError::from(CredentialError::NotFound).into_response();
        let wrong = AppError::from(CredentialError::WrongPassword).into_response();
        assert_eq!(not_found.status(), wrong.status());
        assert_eq!(location(&not_found), location(&wrong));
        assert_eq!(location(&wrong), Some(LOGIN_PATH));
    }

    #[test]
    fn registration_failures_redirect_to_login() {
        for err in [CredentialError::InvalidInput, CredentialError::UsernameTaken] {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), Some(LOGIN_PATH));
        }
    }

    #[test]
    fn blank_note_title_redirects_to_form() {
        let response = AppError::from(NoteError::InvalidInput).into_response();
        assert_eq!(location(&response), Some(NOTE_CREATE_PATH));
    }

    #[test]
    fn session_invalid_redirects_to_unauthorized() {
        let response = AppError::SessionInvalid.into_response();
        assert_eq!(location(&response), Some(UNAUTHORIZED_PATH));
    }

    #[test]
    fn storage_failures_are_hard_errors() {
        let response =
            AppError::from(CredentialError::Storage(anyhow!("connection refused"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(location(&response).is_none());
    }
}
