use axum::{extract::Extension, response::Html};
use std::sync::Arc;

use crate::{
    auth::AuthenticatedUser,
    notekeep::render::{Context, Page, Renderer},
};

#[utoipa::path(
    get,
    path= "/members-only",
    responses (
        (status = 200, description = "Greets the logged-in user", body = String, content_type = "text/html"),
        (status = 303, description = "Anonymous session, redirect to /unauthorized"),
    ),
    tag= "auth"
)]
pub async fn members_only(
    AuthenticatedUser(identity): AuthenticatedUser,
    Extension(renderer): Extension<Arc<Renderer>>,
) -> Html<String> {
    renderer.render(
        Page::Member,
        &Context::new().text("username", &identity.username),
    )
}
