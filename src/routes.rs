use axum::{Router, routing::get};

use crate::handler::{self, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::index))
        .route("/healthz", get(handler::healthcheck))
        .route("/books/", get(handler::book_list))
        .route("/books/new/", get(handler::book_actions))
        .route("/books/create/", get(handler::create_form).post(handler::create_book))
        .route("/books/:id/", get(handler::book_detail))
        .route("/books/:id/edit/", get(handler::edit_form).post(handler::update_book))
        .route("/books/:id/delete/", get(handler::confirm_delete).post(handler::delete_book))
        .route("/books/:id/toggle/", get(handler::toggle_read).post(handler::toggle_read))
}
