use axum::{
    extract::{Extension, Query},
    response::Html,
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{AuthenticatedUser, Identity},
    notekeep::{
        error::AppError,
        render::{note_items, Context, Page, Renderer},
    },
    notes::Notes,
};

/// Exact title to look up among the caller's notes. A blank title shows
/// the form without results.
#[derive(ToSchema, IntoParams, Deserialize, Default)]
#[into_params(parameter_in = Query)]
#[serde(default)]
pub struct SearchForm {
    pub title: String,
}

#[utoipa::path(
    get,
    path= "/search",
    params(SearchForm),
    responses (
        (status = 200, description = "Search form with matching notes", body = String, content_type = "text/html"),
        (status = 303, description = "Anonymous session, redirect to /unauthorized"),
    ),
    tag= "notes"
)]
pub async fn search_page(
    AuthenticatedUser(identity): AuthenticatedUser,
    Extension(notes): Extension<Arc<Notes>>,
    Extension(renderer): Extension<Arc<Renderer>>,
    Query(query): Query<SearchForm>,
) -> Result<Html<String>, AppError> {
    render_search(&identity, &notes, &renderer, &query.title).await
}

#[utoipa::path(
    post,
    path= "/search",
    request_body(content = SearchForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Search form with matching notes", body = String, content_type = "text/html"),
        (status = 303, description = "Anonymous session, redirect to /unauthorized"),
    ),
    tag= "notes"
)]
pub async fn search(
    AuthenticatedUser(identity): AuthenticatedUser,
    Extension(notes): Extension<Arc<Notes>>,
    Extension(renderer): Extension<Arc<Renderer>>,
    Form(form): Form<SearchForm>,
) -> Result<Html<String>, AppError> {
    render_search(&identity, &notes, &renderer, &form.title).await
}

async fn render_search(
    identity: &Identity,
    notes: &Notes,
    renderer: &Renderer,
    title: &str,
) -> Result<Html<String>, AppError> {
    let results = if title.trim().is_empty() {
        String::new()
    } else {
        let found = notes.search_mine(identity, title).await?;
        note_items(&found, "No matching notes.")
    };

    Ok(renderer.render(
        Page::Search,
        &Context::new().text("query", title).html("notes", results),
    ))
}
