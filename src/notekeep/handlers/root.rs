use axum::{
    extract::Extension,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;

use crate::notekeep::render::{Context, Page, Renderer};

#[utoipa::path(
    get,
    path= "/",
    responses (
        (status = 200, description = "Home page", body = String, content_type = "text/html"),
    ),
    tag= "notekeep"
)]
pub async fn home(Extension(renderer): Extension<Arc<Renderer>>) -> Html<String> {
    renderer.render(Page::Home, &Context::new())
}

#[utoipa::path(
    get,
    path= "/unauthorized",
    responses (
        (status = 401, description = "Refusal page for anonymous visitors", body = String, content_type = "text/html"),
    ),
    tag= "auth"
)]
pub async fn unauthorized(Extension(renderer): Extension<Arc<Renderer>>) -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        renderer.render(Page::Unauthorized, &Context::new()),
    )
}
