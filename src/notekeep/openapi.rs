//! `OpenAPI` description of the HTTP surface, served at `/openapi.json`.

use axum::response::Json;
use utoipa::OpenApi;

use super::handlers::{
    health, logout, members, notes, root, search, user_login, user_register,
};

// Title, version, license and contact come from Cargo metadata.
#[derive(OpenApi)]
#[openapi(
    paths(
        root::home,
        root::unauthorized,
        health::health,
        user_register::register_form,
        user_register::register,
        user_login::login_form,
        user_login::login,
        logout::logout,
        members::members_only,
        notes::create_form,
        notes::create,
        notes::list,
        notes::show,
        search::search_page,
        search::search,
    ),
    components(schemas(
        health::Health,
        user_register::RegisterForm,
        user_login::LoginForm,
        notes::NoteForm,
        search::SearchForm,
    )),
    tags(
        (name = "notekeep", description = "Pages"),
        (name = "health", description = "Liveness and store reachability"),
        (name = "auth", description = "Registration, login and logout"),
        (name = "notes", description = "Notes scoped to the logged-in user"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}
