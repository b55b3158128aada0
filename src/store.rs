use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Book, BookFields};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book {0} does not exist")]
    NotFound(i64),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<libsql::Error> for StoreError {
    fn from(error: libsql::Error) -> Self {
        StoreError::Backend(Box::new(error))
    }
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books in id order, optionally restricted to one exact genre.
    async fn list_books(&self, genre: Option<&str>) -> StoreResult<Vec<Book>>;

    /// Distinct non-empty genres, sorted.
    async fn list_genres(&self) -> StoreResult<Vec<String>>;

    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>>;

    async fn title_exists(&self, title: &str) -> StoreResult<bool>;

    async fn create_book(&self, fields: BookFields) -> StoreResult<Book>;

    /// Overwrites every column of an existing book. `NotFound` if the id is gone.
    async fn update_book(&self, id: i64, fields: BookFields) -> StoreResult<()>;

    async fn delete_book(&self, id: i64) -> StoreResult<()>;

    async fn set_read(&self, id: i64, is_read: bool) -> StoreResult<()>;
}
