use crate::error::AppError;
use crate::flash::{Message, Outcome};
use crate::form::{BookForm, CreateBookInput, FormValues, UpdateBookInput, ValidationError};
use crate::model::{Book, ReadState};
use crate::render;
use crate::store::{BookStore, StoreError};
use crate::unpack_error;

pub const CREATE_FORM_TITLE: &str = "ایجاد کتاب جدید";
pub const EDIT_FORM_TITLE: &str = "ویرایش کتاب";

pub const LIST_PATH: &str = "/books/";
pub const CREATE_PATH: &str = "/books/create/";

pub fn detail_path(id: i64) -> String {
    format!("/books/{}/", id)
}

pub fn edit_path(id: i64) -> String {
    format!("/books/{}/edit/", id)
}

async fn load(store: &dyn BookStore, id: i64) -> Result<Book, AppError> {
    store.get_book(id).await?.ok_or(AppError::NotFound)
}

pub fn index() -> Outcome {
    Outcome::page(render::index())
}

pub fn actions() -> Outcome {
    Outcome::page(render::actions())
}

/// An empty or missing genre lists everything.
pub async fn list(store: &dyn BookStore, genre: Option<&str>) -> Result<Outcome, AppError> {
    let genre = genre.map(str::trim).filter(|g| !g.is_empty());
    let books = store.list_books(genre).await?;
    let genres = store.list_genres().await?;
    Ok(Outcome::page(render::book_list(&books, &genres, genre)))
}

pub async fn detail(store: &dyn BookStore, id: i64) -> Result<Outcome, AppError> {
    let book = load(store, id).await?;
    Ok(Outcome::page(render::book_detail(&book)))
}

pub fn create_form() -> Outcome {
    Outcome::page(render::book_form(
        CREATE_FORM_TITLE,
        CREATE_PATH,
        &FormValues::default(),
    ))
}

fn rejected_create(form: &BookForm, message: Message) -> Outcome {
    Outcome::page(render::book_form(
        CREATE_FORM_TITLE,
        CREATE_PATH,
        &FormValues::from(form),
    ))
    .with_message(message)
}

/// Checks run in order: title, author, duplicate title, publication date.
pub async fn create(store: &dyn BookStore, form: BookForm) -> Result<Outcome, AppError> {
    let title = match form.required_fields() {
        Ok((title, _)) => title,
        Err(e) => return Ok(rejected_create(&form, Message::error(e.to_string()))),
    };

    if store.title_exists(&title).await? {
        let message = Message::error(ValidationError::DuplicateTitle.to_string());
        return Ok(rejected_create(&form, message));
    }

    let input = match CreateBookInput::try_from(&form) {
        Ok(input) => input,
        Err(e) => return Ok(rejected_create(&form, Message::error(e.to_string()))),
    };

    match store.create_book(input.into()).await {
        Ok(book) => {
            tracing::info!(book_id = book.id, title = %book.title, "book created");
            Ok(Outcome::redirect(detail_path(book.id))
                .with_message(Message::success(format!("کتاب \"{}\" با موفقیت ایجاد شد!", book.title))))
        }
        Err(e) => {
            let reason = unpack_error(&e);
            tracing::error!(error = %reason, title = %form.title, "failed to create book");
            Ok(rejected_create(&form, Message::error(format!("خطا در ایجاد کتاب: {}", reason))))
        }
    }
}

pub async fn edit_form(store: &dyn BookStore, id: i64) -> Result<Outcome, AppError> {
    let book = load(store, id).await?;
    Ok(Outcome::page(render::book_form(
        EDIT_FORM_TITLE,
        &edit_path(id),
        &FormValues::from(&book),
    )))
}

fn rejected_update(id: i64, form: &BookForm, message: Message) -> Outcome {
    Outcome::page(render::book_form(
        EDIT_FORM_TITLE,
        &edit_path(id),
        &FormValues::from(form),
    ))
    .with_message(message)
}

/// Title uniqueness is not re-checked here; an edit may collide with another book's title.
pub async fn update(store: &dyn BookStore, id: i64, form: BookForm) -> Result<Outcome, AppError> {
    load(store, id).await?;

    let input = match UpdateBookInput::try_from(&form) {
        Ok(input) => input,
        Err(e) => return Ok(rejected_update(id, &form, Message::error(e.to_string()))),
    };
    let title = input.title.clone();

    match store.update_book(id, input.into()).await {
        Ok(()) => {
            tracing::info!(book_id = id, title = %title, "book updated");
            Ok(Outcome::redirect(detail_path(id))
                .with_message(Message::success(format!("کتاب \"{}\" با موفقیت ویرایش شد!", title))))
        }
        Err(StoreError::NotFound(_)) => Err(AppError::NotFound),
        Err(e) => {
            let reason = unpack_error(&e);
            tracing::error!(error = %reason, book_id = id, "failed to update book");
            Ok(rejected_update(id, &form, Message::error(format!("خطا در ویرایش کتاب: {}", reason))))
        }
    }
}

pub async fn confirm_delete(store: &dyn BookStore, id: i64) -> Result<Outcome, AppError> {
    let book = load(store, id).await?;
    Ok(Outcome::page(render::confirm_delete(&book)))
}

pub async fn delete(store: &dyn BookStore, id: i64) -> Result<Outcome, AppError> {
    let book = load(store, id).await?;

    match store.delete_book(id).await {
        Ok(()) => {
            tracing::info!(book_id = id, title = %book.title, "book deleted");
            Ok(Outcome::redirect(LIST_PATH)
                .with_message(Message::success(format!("کتاب \"{}\" با موفقیت حذف شد!", book.title))))
        }
        Err(StoreError::NotFound(_)) => Err(AppError::NotFound),
        Err(e) => {
            let reason = unpack_error(&e);
            tracing::error!(error = %reason, book_id = id, "failed to delete book");
            Ok(Outcome::redirect(detail_path(id))
                .with_message(Message::error(format!("خطا در حذف کتاب: {}", reason))))
        }
    }
}

/// Flips the read flag and goes back to `referer`, or to the list when there is none.
pub async fn toggle(store: &dyn BookStore, id: i64, referer: Option<&str>) -> Result<Outcome, AppError> {
    let book = load(store, id).await?;
    let is_read = !book.is_read;

    let message = match store.set_read(id, is_read).await {
        Ok(()) => {
            let state = ReadState::from_flag(is_read);
            tracing::info!(book_id = id, is_read, "book read state toggled");
            Message::success(format!(
                "وضعیت کتاب \"{}\" به \"{}\" تغییر کرد!",
                book.title,
                state.label()
            ))
        }
        Err(StoreError::NotFound(_)) => return Err(AppError::NotFound),
        Err(e) => {
            let reason = unpack_error(&e);
            tracing::error!(error = %reason, book_id = id, "failed to toggle read state");
            Message::error(format!("خطا در تغییر وضعیت کتاب: {}", reason))
        }
    };

    let back = referer.filter(|r| !r.is_empty()).unwrap_or(LIST_PATH);
    Ok(Outcome::redirect(back).with_message(message))
}
