use anyhow::Context as _;
use axum::{
    extract::Extension,
    http::header::SET_COOKIE,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::MEMBERS_PATH;
use crate::{
    auth::{cookie::session_cookie, Credentials, Session, Sessions},
    notekeep::{
        error::AppError,
        render::{Context, Page, Renderer},
    },
};

#[derive(ToSchema, Deserialize, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[schema(format = Password)]
    pub password: String,
}

#[utoipa::path(
    get,
    path= "/login",
    responses (
        (status = 200, description = "Login form", body = String, content_type = "text/html"),
    ),
    tag= "auth"
)]
pub async fn login_form(Extension(renderer): Extension<Arc<Renderer>>) -> Html<String> {
    renderer.render(
        Page::Login,
        &Context::new().text("title", "Login").text("action", "/login"),
    )
}

#[utoipa::path(
    post,
    path= "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Redirect to /members-only with a new session cookie, or back to /login on failure"),
        (status = 500, description = "Credential or session store unavailable"),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(credentials): Extension<Arc<Credentials>>,
    Extension(sessions): Extension<Arc<Sessions>>,
    Extension(mut session): Extension<Session>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let password = SecretString::from(form.password);

    let user = match credentials.authenticate(&form.username, &password).await {
        Ok(user) => user,
        Err(err) => {
            if err.is_authentication_failure() {
                info!("login failed: {err}");
            }
            return Err(err.into());
        }
    };

    // New identifier before the identity is attached, then persist before
    // the client learns about it.
    sessions.regenerate(&mut session).await?;
    sessions.set_identity(&mut session, user.identity());
    sessions.save(&mut session).await?;

    let cookie = session_cookie(sessions.config(), session.id())
        .context("failed to build session cookie")?;

    info!(user_id = %user.id, "login succeeded");

    Ok(([(SET_COOKIE, cookie)], Redirect::to(MEMBERS_PATH)).into_response())
}
