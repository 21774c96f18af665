use axum::{
    extract::Extension,
    response::{Html, Redirect},
    Form,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::Credentials,
    notekeep::{
        error::{AppError, LOGIN_PATH},
        render::{Context, Page, Renderer},
    },
};

/// Sign-up form. Missing fields deserialize as blank and are rejected by
/// the credential store.
#[derive(ToSchema, Deserialize, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    #[schema(format = Password)]
    pub password: String,
}

#[utoipa::path(
    get,
    path= "/new",
    responses (
        (status = 200, description = "Registration form", body = String, content_type = "text/html"),
    ),
    tag= "auth"
)]
pub async fn register_form(Extension(renderer): Extension<Arc<Renderer>>) -> Html<String> {
    renderer.render(
        Page::Login,
        &Context::new().text("title", "Sign Up").text("action", "/new"),
    )
}

#[utoipa::path(
    post,
    path= "/new",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Registered, or rejected as blank or taken; either way redirect to /login"),
        (status = 500, description = "Credential store unavailable"),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(credentials): Extension<Arc<Credentials>>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    let password = SecretString::from(form.password);
    let user = credentials.register(&form.username, &password).await?;

    info!(user_id = %user.id, "user registered");

    Ok(Redirect::to(LOGIN_PATH))
}
