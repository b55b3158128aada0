use std::error::Error;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::AppState;

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod form;
pub mod handler;
pub mod model;
pub mod render;
pub mod routes;
pub mod store;

/// Full application router: catalog routes, 404 fallback and request tracing.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .fallback(handler::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Display text of `err` followed by each of its sources, joined with ": ".
pub fn unpack_error(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut cause = err.source();
    while let Some(source) = cause {
        text.push_str(": ");
        text.push_str(&source.to_string());
        cause = source.source();
    }
    text
}
