use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{Book, BookFields, DATE_FORMAT};

const CHECKBOX_ON: &str = "on";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_date: String,
    pub is_read: Option<String>,
}

impl BookForm {
    /// Browsers send `on` for a ticked checkbox and omit the field otherwise.
    pub fn is_read(&self) -> bool {
        self.is_read.as_deref() == Some(CHECKBOX_ON)
    }

    /// Trimmed title and author. Title is checked first; only the first failure is reported.
    pub fn required_fields(&self) -> Result<(String, String), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }

        let author = self.author.trim();
        if author.is_empty() {
            return Err(ValidationError::MissingAuthor);
        }

        Ok((title.to_string(), author.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("عنوان کتاب الزامی است!")]
    MissingTitle,

    #[error("نویسنده کتاب الزامی است!")]
    MissingAuthor,

    #[error("کتاب مورد نظر در حال حاضر در لیست کتاب‌ها وجود دارد! لطفاً عنوان دیگری انتخاب کنید.")]
    DuplicateTitle,

    #[error("تاریخ انتشار باید به صورت YYYY-MM-DD باشد!")]
    InvalidDate(String),
}

/// Values shown in the book form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_date: String,
    pub is_read: bool,
}

impl From<&BookForm> for FormValues {
    fn from(form: &BookForm) -> Self {
        FormValues {
            title: form.title.clone(),
            author: form.author.clone(),
            genre: form.genre.clone(),
            published_date: form.published_date.clone(),
            is_read: form.is_read(),
        }
    }
}

impl From<&Book> for FormValues {
    fn from(book: &Book) -> Self {
        FormValues {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            published_date: book.published_date_text(),
            is_read: book.is_read,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBookInput {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBookInput {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub is_read: bool,
}

impl TryFrom<&BookForm> for CreateBookInput {
    type Error = ValidationError;

    fn try_from(form: &BookForm) -> Result<Self, Self::Error> {
        let (title, author) = form.required_fields()?;
        Ok(CreateBookInput {
            title,
            author,
            genre: optional_text(&form.genre),
            published_date: parse_date(&form.published_date)?,
            is_read: form.is_read(),
        })
    }
}

impl TryFrom<&BookForm> for UpdateBookInput {
    type Error = ValidationError;

    fn try_from(form: &BookForm) -> Result<Self, Self::Error> {
        let (title, author) = form.required_fields()?;
        Ok(UpdateBookInput {
            title,
            author,
            genre: optional_text(&form.genre),
            published_date: parse_date(&form.published_date)?,
            is_read: form.is_read(),
        })
    }
}

impl From<CreateBookInput> for BookFields {
    fn from(input: CreateBookInput) -> Self {
        BookFields {
            title: input.title,
            author: input.author,
            genre: input.genre.unwrap_or_default(),
            published_date: input.published_date,
            is_read: input.is_read,
        }
    }
}

impl From<UpdateBookInput> for BookFields {
    fn from(input: UpdateBookInput) -> Self {
        BookFields {
            title: input.title,
            author: input.author,
            genre: input.genre.unwrap_or_default(),
            published_date: input.published_date,
            is_read: input.is_read,
        }
    }
}

fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_date(value: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}
