use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::render::{self, RenderError};
use crate::store::StoreError;

/// Errors that end a request instead of being shown as a form message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let page = if status == StatusCode::NOT_FOUND {
            tracing::debug!(error = %self, "request for missing page");
            render::error_page("صفحه پیدا نشد", "صفحه یا کتاب مورد نظر وجود ندارد.")
        } else {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
            render::error_page("خطای سرور", &self.to_string())
        };

        match render::render(&page, &[]) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to render error page");
                (status, self.to_string()).into_response()
            }
        }
    }
}
