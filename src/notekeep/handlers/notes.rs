use axum::{
    extract::{Extension, Path},
    response::{Html, Redirect},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::NOTE_LIST_PATH;
use crate::{
    auth::AuthenticatedUser,
    notekeep::{
        error::AppError,
        render::{note_items, Context, Page, Renderer},
    },
    notes::Notes,
};

#[derive(ToSchema, Deserialize, Default)]
#[serde(default)]
pub struct NoteForm {
    pub title: String,
    pub content: String,
}

#[utoipa::path(
    get,
    path= "/note/create",
    responses (
        (status = 200, description = "Note creation form", body = String, content_type = "text/html"),
        (status = 303, description = "Anonymous session, redirect to /unauthorized"),
    ),
    tag= "notes"
)]
pub async fn create_form(
    AuthenticatedUser(_identity): AuthenticatedUser,
    Extension(renderer): Extension<Arc<Renderer>>,
) -> Html<String> {
    renderer.render(Page::NoteCreate, &Context::new())
}

#[utoipa::path(
    post,
    path= "/note/create",
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Created, redirect to /note; blank title redirects back to the form"),
        (status = 500, description = "Note store unavailable"),
    ),
    tag= "notes"
)]
#[instrument(skip_all)]
pub async fn create(
    AuthenticatedUser(identity): AuthenticatedUser,
    Extension(notes): Extension<Arc<Notes>>,
    Form(form): Form<NoteForm>,
) -> Result<Redirect, AppError> {
    notes.create(&identity, &form.title, &form.content).await?;
    Ok(Redirect::to(NOTE_LIST_PATH))
}

#[utoipa::path(
    get,
    path= "/note",
    responses (
        (status = 200, description = "Notes owned by the logged-in user", body = String, content_type = "text/html"),
        (status = 303, description = "Anonymous session, redirect to /unauthorized"),
    ),
    tag= "notes"
)]
pub async fn list(
    AuthenticatedUser(identity): AuthenticatedUser,
    Extension(notes): Extension<Arc<Notes>>,
    Extension(renderer): Extension<Arc<Renderer>>,
) -> Result<Html<String>, AppError> {
    let mine = notes.list_mine(&identity).await?;
    Ok(renderer.render(
        Page::NoteList,
        &Context::new()
            .text("heading", &format!("Notes for {}", identity.username))
            .html("notes", note_items(&mine, "No notes yet.")),
    ))
}

/// Direct link to a note. Any visitor holding the id can read it; the
/// owner is not checked.
#[utoipa::path(
    get,
    path= "/note/{id}",
    params(
        ("id" = String, Path, description = "Note id (UUID)")
    ),
    responses (
        (status = 200, description = "The note", body = String, content_type = "text/html"),
        (status = 404, description = "No note with this id"),
    ),
    tag= "notes"
)]
pub async fn show(
    Path(id): Path<String>,
    Extension(notes): Extension<Arc<Notes>>,
    Extension(renderer): Extension<Arc<Renderer>>,
) -> Result<Html<String>, AppError> {
    let Ok(id) = Uuid::parse_str(&id) else {
        debug!("note id is not a uuid");
        return Err(AppError::NotFound);
    };

    let note = notes
        .find_by_id_unscoped(id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(renderer.render(
        Page::NoteDetail,
        &Context::new()
            .text("title", &note.title)
            .text("content", &note.content),
    ))
}
