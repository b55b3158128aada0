use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::catalog;
use crate::error::AppError;
use crate::flash::respond;
use crate::form::BookForm;
use crate::store::BookStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookStore>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub genre: Option<String>,
}

// A non-numeric id can never match a book.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>().map_err(|_| AppError::NotFound)
}

pub async fn healthcheck() -> &'static str {
    "ok"
}

pub async fn index(jar: CookieJar) -> Response {
    respond(jar, catalog::index())
}

pub async fn book_actions(jar: CookieJar) -> Response {
    respond(jar, catalog::actions())
}

pub async fn book_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let outcome = catalog::list(state.store.as_ref(), params.genre.as_deref()).await?;
    Ok(respond(jar, outcome))
}

pub async fn book_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let outcome = catalog::detail(state.store.as_ref(), parse_id(&id)?).await?;
    Ok(respond(jar, outcome))
}

pub async fn create_form(jar: CookieJar) -> Response {
    respond(jar, catalog::create_form())
}

pub async fn create_book(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<BookForm>,
) -> Result<Response, AppError> {
    let outcome = catalog::create(state.store.as_ref(), form).await?;
    Ok(respond(jar, outcome))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let outcome = catalog::edit_form(state.store.as_ref(), parse_id(&id)?).await?;
    Ok(respond(jar, outcome))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<BookForm>,
) -> Result<Response, AppError> {
    let outcome = catalog::update(state.store.as_ref(), parse_id(&id)?, form).await?;
    Ok(respond(jar, outcome))
}

pub async fn confirm_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let outcome = catalog::confirm_delete(state.store.as_ref(), parse_id(&id)?).await?;
    Ok(respond(jar, outcome))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let outcome = catalog::delete(state.store.as_ref(), parse_id(&id)?).await?;
    Ok(respond(jar, outcome))
}

pub async fn toggle_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    let outcome = catalog::toggle(state.store.as_ref(), parse_id(&id)?, referer).await?;
    Ok(respond(jar, outcome))
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
