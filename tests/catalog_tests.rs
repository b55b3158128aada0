//! Integration tests driving the catalog through its HTTP routes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode, header};
use axum_test::{TestResponse, TestServer};
use book_catalog::db::Database;
use book_catalog::handler::AppState;
use book_catalog::model::{Book, BookFields};
use book_catalog::store::{BookStore, StoreError, StoreResult};

const TITLE_REQUIRED: &str = "عنوان کتاب الزامی است!";
const AUTHOR_REQUIRED: &str = "نویسنده کتاب الزامی است!";
const DUPLICATE_TITLE: &str = "کتاب مورد نظر در حال حاضر در لیست کتاب‌ها وجود دارد!";

/// How a [`FaultyStore`] misbehaves. Anything not named here goes to the real database.
#[derive(Clone, Copy)]
enum Fault {
    /// Every write fails with a backend error.
    DiskFull,
    /// Every write reports the row as already gone.
    RowVanished,
    /// The duplicate-title lookup fails.
    LookupFails,
}

struct FaultyStore {
    inner: Arc<Database>,
    fault: Fault,
}

fn disk_full() -> StoreError {
    StoreError::Backend("database or disk is full".into())
}

impl FaultyStore {
    fn write_error(&self, id: i64) -> Option<StoreError> {
        match self.fault {
            Fault::DiskFull => Some(disk_full()),
            Fault::RowVanished => Some(StoreError::NotFound(id)),
            Fault::LookupFails => None,
        }
    }
}

#[async_trait]
impl BookStore for FaultyStore {
    async fn list_books(&self, genre: Option<&str>) -> StoreResult<Vec<Book>> {
        self.inner.list_books(genre).await
    }

    async fn list_genres(&self) -> StoreResult<Vec<String>> {
        self.inner.list_genres().await
    }

    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>> {
        self.inner.get_book(id).await
    }

    async fn title_exists(&self, title: &str) -> StoreResult<bool> {
        match self.fault {
            Fault::LookupFails => Err(StoreError::Backend("disk I/O error".into())),
            _ => self.inner.title_exists(title).await,
        }
    }

    async fn create_book(&self, fields: BookFields) -> StoreResult<Book> {
        match self.write_error(0) {
            Some(e) => Err(e),
            None => self.inner.create_book(fields).await,
        }
    }

    async fn update_book(&self, id: i64, fields: BookFields) -> StoreResult<()> {
        match self.write_error(id) {
            Some(e) => Err(e),
            None => self.inner.update_book(id, fields).await,
        }
    }

    async fn delete_book(&self, id: i64) -> StoreResult<()> {
        match self.write_error(id) {
            Some(e) => Err(e),
            None => self.inner.delete_book(id).await,
        }
    }

    async fn set_read(&self, id: i64, is_read: bool) -> StoreResult<()> {
        match self.write_error(id) {
            Some(e) => Err(e),
            None => self.inner.set_read(id, is_read).await,
        }
    }
}

async fn create_test_server() -> (TestServer, Arc<Database>) {
    let db = Arc::new(Database::in_memory().await.expect("Failed to open database"));
    let app = book_catalog::app(AppState { store: db.clone() });
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, db)
}

async fn create_faulty_server(db: Arc<Database>, fault: Fault) -> TestServer {
    let store: Arc<dyn BookStore> = Arc::new(FaultyStore { inner: db, fault });
    TestServer::new(book_catalog::app(AppState { store })).expect("Failed to create test server")
}

fn dune_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("title", "Dune"),
        ("author", "Frank Herbert"),
        ("genre", "sci-fi"),
        ("published_date", "1965-08-01"),
        ("is_read", "on"),
    ]
}

fn location(response: &TestResponse) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

async fn seed(db: &Database, title: &str, genre: &str) -> Book {
    db.create_book(BookFields {
        title: title.to_string(),
        author: "Somebody".to_string(),
        genre: genre.to_string(),
        published_date: None,
        is_read: false,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_index_and_action_pages() {
    let (server, _db) = create_test_server().await;

    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("کتابخانه شخصی"));

    let response = server.get("/books/new/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains(r#"href="/books/create/""#));
}

#[tokio::test]
async fn test_healthcheck() {
    let (server, _db) = create_test_server().await;
    let response = server.get("/healthz").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (server, _db) = create_test_server().await;
    let response = server.get("/shelves/").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_empty() {
    let (server, _db) = create_test_server().await;

    let response = server.get("/books/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("تعداد: 0"));
}

#[tokio::test]
async fn test_list_shows_books_and_distinct_genres() {
    let (server, db) = create_test_server().await;
    seed(&db, "Dune", "sci-fi").await;
    seed(&db, "Hyperion", "sci-fi").await;
    seed(&db, "Emma", "").await;

    let body = server.get("/books/").await.text();
    assert!(body.contains("Dune"));
    assert!(body.contains("Hyperion"));
    assert!(body.contains("Emma"));
    assert_eq!(body.matches(r#"href="/books/?genre=sci-fi""#).count(), 1);
    assert!(body.contains("تعداد: 3"));
}

#[tokio::test]
async fn test_list_filtered_by_genre() {
    let (server, db) = create_test_server().await;
    seed(&db, "Dune", "sci-fi").await;
    seed(&db, "Dracula", "horror").await;

    let body = server.get("/books/").add_query_param("genre", "horror").await.text();
    assert!(body.contains("Dracula"));
    assert!(!body.contains(">Dune<"));
    assert!(body.contains("تعداد: 1"));
    // The filter bar still offers every genre.
    assert!(body.contains(r#"href="/books/?genre=sci-fi""#));
}

#[tokio::test]
async fn test_detail_not_found() {
    let (server, _db) = create_test_server().await;

    assert_eq!(server.get("/books/99/").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/books/not-a-number/").await.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_form_is_blank() {
    let (server, _db) = create_test_server().await;

    let body = server.get("/books/create/").await.text();
    assert!(body.contains("ایجاد کتاب جدید"));
    assert!(body.contains(r#"name="title" value="""#));
    assert!(body.contains(r#"name="is_read">"#));
}

#[tokio::test]
async fn test_create_then_detail() {
    let (server, db) = create_test_server().await;

    let response = server.post("/books/create/").form(&dune_form()).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

    let books = db.list_books(None).await.unwrap();
    assert_eq!(books.len(), 1);
    let book = &books[0];
    assert_eq!(book.title, "Dune");
    assert_eq!(book.author, "Frank Herbert");
    assert_eq!(book.genre, "sci-fi");
    assert_eq!(book.published_date_text(), "1965-08-01");
    assert!(book.is_read);
    assert_eq!(location(&response), format!("/books/{}/", book.id));

    // The success message is shown once, on the next rendered page.
    let flash = response.cookie("flash");
    let detail = server.get(&location(&response)).add_cookie(flash).await;
    assert_eq!(detail.status_code(), StatusCode::OK);
    let body = detail.text();
    assert!(body.contains("Frank Herbert"));
    assert!(body.contains("با موفقیت ایجاد شد"));
    assert!(body.contains(r#"class="message success""#));
}

#[tokio::test]
async fn test_create_defaults_optional_fields() {
    let (server, db) = create_test_server().await;

    let response = server
        .post("/books/create/")
        .form(&[("title", "Emma"), ("author", "Jane Austen")])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

    let book = db.list_books(None).await.unwrap().remove(0);
    assert_eq!(book.genre, "");
    assert_eq!(book.published_date, None);
    assert!(!book.is_read);
}

#[tokio::test]
async fn test_create_duplicate_title() {
    let (server, db) = create_test_server().await;
    server.post("/books/create/").form(&dune_form()).await;

    let response = server
        .post("/books/create/")
        .form(&[
            ("title", "Dune"),
            ("author", "Brian Herbert"),
            ("genre", "epic"),
            ("published_date", "1999-01-01"),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains(DUPLICATE_TITLE));
    assert!(body.contains(r#"name="title" value="Dune""#));
    assert!(body.contains(r#"name="author" value="Brian Herbert""#));
    assert!(body.contains(r#"name="genre" value="epic""#));
    assert!(body.contains(r#"name="published_date" value="1999-01-01""#));

    let dunes = db
        .list_books(None)
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.title == "Dune")
        .count();
    assert_eq!(dunes, 1);
}

#[tokio::test]
async fn test_create_missing_title_keeps_input() {
    let (server, db) = create_test_server().await;

    let response = server
        .post("/books/create/")
        .form(&[
            ("title", ""),
            ("author", "Ursula K. Le Guin"),
            ("genre", "fantasy"),
            ("is_read", "on"),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains(TITLE_REQUIRED));
    assert!(!body.contains(AUTHOR_REQUIRED));
    assert!(body.contains(r#"name="author" value="Ursula K. Le Guin""#));
    assert!(body.contains(r#"name="genre" value="fantasy""#));
    assert!(body.contains(r#"name="is_read" checked>"#));
    assert!(db.list_books(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_missing_author() {
    let (server, db) = create_test_server().await;

    let response = server.post("/books/create/").form(&[("title", "Dune")]).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains(AUTHOR_REQUIRED));
    assert!(db.list_books(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_invalid_date() {
    let (server, db) = create_test_server().await;

    let response = server
        .post("/books/create/")
        .form(&[("title", "Dune"), ("author", "Frank Herbert"), ("published_date", "yesterday")])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains("YYYY-MM-DD"));
    assert!(body.contains(r#"name="published_date" value="yesterday""#));
    assert!(db.list_books(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_duplicate_title_reported_before_bad_date() {
    let (server, db) = create_test_server().await;
    server.post("/books/create/").form(&dune_form()).await;

    let response = server
        .post("/books/create/")
        .form(&[("title", "Dune"), ("author", "Frank Herbert"), ("published_date", "yesterday")])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains(DUPLICATE_TITLE));
    assert!(!body.contains("YYYY-MM-DD باشد"));
    assert_eq!(db.list_books(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_title_lookup_failure_is_server_error() {
    let (_server, db) = create_test_server().await;
    let server = create_faulty_server(db.clone(), Fault::LookupFails).await;

    let response = server.post("/books/create/").form(&dune_form()).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(db.list_books(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_store_failure_rerenders() {
    let (_server, db) = create_test_server().await;
    let server = create_faulty_server(db.clone(), Fault::DiskFull).await;

    let response = server.post("/books/create/").form(&dune_form()).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains("خطا در ایجاد کتاب: database or disk is full"));
    assert!(body.contains(r#"name="author" value="Frank Herbert""#));
    assert!(db.list_books(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_edit_form_prefilled() {
    let (server, db) = create_test_server().await;
    server.post("/books/create/").form(&dune_form()).await;
    let id = db.list_books(None).await.unwrap()[0].id;

    let body = server.get(&format!("/books/{}/edit/", id)).await.text();
    assert!(body.contains("ویرایش کتاب"));
    assert!(body.contains(r#"name="title" value="Dune""#));
    assert!(body.contains(r#"name="published_date" value="1965-08-01""#));
    assert!(body.contains(r#"name="is_read" checked>"#));
    assert!(body.contains(&format!(r#"action="/books/{}/edit/""#, id)));
}

#[tokio::test]
async fn test_update_clears_genre() {
    let (server, db) = create_test_server().await;
    server.post("/books/create/").form(&dune_form()).await;
    let id = db.list_books(None).await.unwrap()[0].id;

    let response = server
        .post(&format!("/books/{}/edit/", id))
        .form(&[("title", "Dune"), ("author", "Frank Herbert"), ("genre", ""), ("published_date", "")])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/books/{}/", id));

    let book = db.get_book(id).await.unwrap().unwrap();
    assert_eq!(book.genre, "");
    assert_eq!(book.published_date, None);
    assert!(!book.is_read);

    let body = server.get(&format!("/books/{}/edit/", id)).await.text();
    assert!(body.contains(r#"name="genre" value="""#));
    assert!(!body.contains("None"));
    assert!(!body.contains("null"));
}

#[tokio::test]
async fn test_update_validation_keeps_record() {
    let (server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;

    let response = server
        .post(&format!("/books/{}/edit/", book.id))
        .form(&[("title", "Dune Messiah"), ("author", "")])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains(AUTHOR_REQUIRED));
    assert!(body.contains(r#"name="title" value="Dune Messiah""#));
    assert_eq!(db.get_book(book.id).await.unwrap().unwrap().title, "Dune");
}

#[tokio::test]
async fn test_update_unknown_book() {
    let (server, _db) = create_test_server().await;

    let response = server.post("/books/5/edit/").form(&[("title", ""), ("author", "")]).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(!response.text().contains(TITLE_REQUIRED));
}

#[tokio::test]
async fn test_update_store_failure_keeps_submission() {
    let (_server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;
    let server = create_faulty_server(db.clone(), Fault::DiskFull).await;

    let response = server
        .post(&format!("/books/{}/edit/", book.id))
        .form(&[("title", "Dune Messiah"), ("author", "Frank Herbert")])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains("خطا در ویرایش کتاب: database or disk is full"));
    assert!(body.contains(r#"name="title" value="Dune Messiah""#));
}

#[tokio::test]
async fn test_delete_flow() {
    let (server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;
    let path = format!("/books/{}/delete/", book.id);

    let confirm = server.get(&path).await;
    assert_eq!(confirm.status_code(), StatusCode::OK);
    assert!(confirm.text().contains("Dune"));

    let response = server.post(&path).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books/");

    let list = server.get("/books/").add_cookie(response.cookie("flash")).await.text();
    assert!(list.contains("کتاب &quot;Dune&quot; با موفقیت حذف شد!"));

    let detail = server.get(&format!("/books/{}/", book.id)).await;
    assert_eq!(detail.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_store_failure_goes_back_to_detail() {
    let (_server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;
    let server = create_faulty_server(db.clone(), Fault::DiskFull).await;

    let response = server.post(&format!("/books/{}/delete/", book.id)).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/books/{}/", book.id));

    let detail = server
        .get(&location(&response))
        .add_cookie(response.cookie("flash"))
        .await
        .text();
    assert!(detail.contains("خطا در حذف کتاب: database or disk is full"));
    assert!(db.get_book(book.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_unknown_book() {
    let (server, _db) = create_test_server().await;
    assert_eq!(server.get("/books/3/delete/").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(server.post("/books/3/delete/").await.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_twice_round_trips() {
    let (server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;
    let path = format!("/books/{}/toggle/", book.id);

    let first = server.post(&path).await;
    assert_eq!(first.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&first), "/books/");
    assert!(db.get_book(book.id).await.unwrap().unwrap().is_read);
    let page = server.get("/books/").add_cookie(first.cookie("flash")).await.text();
    assert!(page.contains("به &quot;خوانده شده&quot; تغییر کرد!"));

    let second = server.get(&path).await;
    assert_eq!(second.status_code(), StatusCode::SEE_OTHER);
    assert!(!db.get_book(book.id).await.unwrap().unwrap().is_read);
    let page = server.get("/books/").add_cookie(second.cookie("flash")).await.text();
    assert!(page.contains("به &quot;خوانده نشده&quot; تغییر کرد!"));
}

#[tokio::test]
async fn test_toggle_returns_to_referer() {
    let (server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;
    let detail = format!("/books/{}/", book.id);

    let response = server
        .post(&format!("/books/{}/toggle/", book.id))
        .add_header(header::REFERER, HeaderValue::from_str(&detail).unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);
}

#[tokio::test]
async fn test_toggle_store_failure() {
    let (_server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;
    let server = create_faulty_server(db.clone(), Fault::DiskFull).await;

    let response = server.post(&format!("/books/{}/toggle/", book.id)).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books/");

    let page = server.get("/books/").add_cookie(response.cookie("flash")).await.text();
    assert!(page.contains("خطا در تغییر وضعیت کتاب: database or disk is full"));
    assert!(!db.get_book(book.id).await.unwrap().unwrap().is_read);
}

#[tokio::test]
async fn test_toggle_unknown_book() {
    let (server, _db) = create_test_server().await;
    assert_eq!(server.post("/books/8/toggle/").await.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_row_removed_during_write_is_not_found() {
    let (_server, db) = create_test_server().await;
    let book = seed(&db, "Dune", "sci-fi").await;
    let server = create_faulty_server(db.clone(), Fault::RowVanished).await;

    let update = server
        .post(&format!("/books/{}/edit/", book.id))
        .form(&[("title", "Dune Messiah"), ("author", "Frank Herbert")])
        .await;
    assert_eq!(update.status_code(), StatusCode::NOT_FOUND);

    let delete = server.post(&format!("/books/{}/delete/", book.id)).await;
    assert_eq!(delete.status_code(), StatusCode::NOT_FOUND);

    let toggle = server.post(&format!("/books/{}/toggle/", book.id)).await;
    assert_eq!(toggle.status_code(), StatusCode::NOT_FOUND);
    assert!(toggle.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_titles_are_escaped() {
    let (server, db) = create_test_server().await;
    let book = seed(&db, "<script>alert(1)</script>", "").await;

    let body = server.get(&format!("/books/{}/", book.id)).await.text();
    assert!(!body.contains("<script>alert(1)</script>"));
    assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}
