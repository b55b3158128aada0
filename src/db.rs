use crate::config::Config;
use crate::model::{Book, BookFields, DATE_FORMAT};
use crate::store::{BookStore, StoreError, StoreResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

// Applied unconditionally before anything else; it only ever creates the ledger table.
const LEDGER_SQL: &str = include_str!("migrations/system/000_migrations_table.sql");

struct Migration {
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_books.sql",
    sql: include_str!("migrations/001_books.sql"),
}];

const BOOK_COLUMNS: &str = "id, title, author, genre, published_date, is_read";

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    turso_url: Option<String>,
    turso_auth_token: Option<String>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn is_replica(turso_url: &Option<String>, turso_auth_token: &Option<String>) -> bool {
        turso_url.is_some() && turso_auth_token.is_some()
    }

    pub async fn sync(&self) -> Result<()> {
        if Self::is_replica(&self.turso_url, &self.turso_auth_token) {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    async fn applied_migrations(conn: &Connection) -> Result<HashSet<String>> {
        let mut rows = conn.query("SELECT name FROM _migrations", ()).await?;
        let mut names = HashSet::new();
        while let Some(row) = rows.next().await? {
            names.insert(row.get::<String>(0)?);
        }
        Ok(names)
    }

    /// Brings the schema up to date. Each migration commits together with its ledger row.
    async fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(LEDGER_SQL)
            .await
            .context("failed to create migrations ledger")?;
        let applied = Self::applied_migrations(conn).await?;

        for migration in MIGRATIONS.iter().filter(|m| !applied.contains(m.name)) {
            tracing::info!(migration = migration.name, "[db] applying migration");
            let tx = conn.transaction().await?;
            tx.execute_batch(migration.sql)
                .await
                .with_context(|| format!("migration {} failed", migration.name))?;
            tx.execute(
                "INSERT INTO _migrations (name, applied_at) VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                libsql::params![migration.name],
            )
            .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    /// Opens the configured database file under `data_dir`, as an embedded
    /// replica when Turso credentials are present.
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());
        let turso_url = cfg.app.turso_url.clone();
        let turso_auth_token = cfg.app.turso_auth_token.clone();

        let db = match (&turso_url, &turso_auth_token) {
            (Some(url), Some(token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                Builder::new_synced_database(&path, url.clone(), token.clone())
                    .sync_interval(sync_interval)
                    .build()
                    .await?
            }
            _ => {
                tracing::info!(path = ?path, "[db] running in local database mode");
                Builder::new_local(&path).build().await?
            }
        };

        Self::from_libsql(db, turso_url, turso_auth_token).await
    }

    /// Private in-memory database, used by tests and throwaway runs.
    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_libsql(db, None, None).await
    }

    async fn from_libsql(
        db: LibsqlDatabase,
        turso_url: Option<String>,
        turso_auth_token: Option<String>,
    ) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        Self::migrate(&conn).await?;

        Ok(Database {
            db,
            conn,
            turso_url,
            turso_auth_token,
        })
    }

    // Replica sync failures never fail the write itself; the next interval retries.
    async fn after_write(&self) {
        if let Err(e) = self.sync().await {
            tracing::warn!(error = %e, "failed to sync replica after write");
        }
    }

    fn row_to_book(row: &libsql::Row) -> StoreResult<Book> {
        let published_date = match row.get::<Option<String>>(4)? {
            Some(text) if !text.is_empty() => Some(
                NaiveDate::parse_from_str(&text, DATE_FORMAT)
                    .map_err(|e| StoreError::Corrupt(format!("published_date {text:?}: {e}")))?,
            ),
            _ => None,
        };

        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            genre: row.get::<Option<String>>(3)?.unwrap_or_default(),
            published_date,
            is_read: row.get::<i64>(5)? != 0,
        })
    }

    fn date_param(date: Option<NaiveDate>) -> Option<String> {
        date.map(|d| d.format(DATE_FORMAT).to_string())
    }
}

#[async_trait]
impl BookStore for Database {
    async fn list_books(&self, genre: Option<&str>) -> StoreResult<Vec<Book>> {
        let mut rows = match genre {
            Some(genre) => {
                let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE genre = ? ORDER BY id");
                self.conn.query(&query, libsql::params![genre]).await?
            }
            None => {
                let query = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id");
                self.conn.query(&query, ()).await?
            }
        };

        let mut books = vec![];
        while let Some(row) = rows.next().await? {
            books.push(Self::row_to_book(&row)?);
        }
        Ok(books)
    }

    async fn list_genres(&self) -> StoreResult<Vec<String>> {
        let query = "SELECT DISTINCT genre FROM books WHERE genre IS NOT NULL AND genre != '' ORDER BY genre";
        let mut rows = self.conn.query(query, ()).await?;

        let mut genres = vec![];
        while let Some(row) = rows.next().await? {
            genres.push(row.get::<String>(0)?);
        }
        Ok(genres)
    }

    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?");
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_book(&row)?)),
            None => Ok(None),
        }
    }

    async fn title_exists(&self, title: &str) -> StoreResult<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM books WHERE title = ? LIMIT 1", libsql::params![title])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn create_book(&self, fields: BookFields) -> StoreResult<Book> {
        let query = format!(
            r#"
            INSERT INTO books (title, author, genre, published_date, is_read)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {BOOK_COLUMNS}
        "#
        );

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![
                    fields.title,
                    fields.author,
                    fields.genre,
                    Self::date_param(fields.published_date),
                    fields.is_read as i64
                ],
            )
            .await?;

        let book = match rows.next().await? {
            Some(row) => Self::row_to_book(&row)?,
            None => return Err(StoreError::Corrupt("insert returned no row".to_string())),
        };

        self.after_write().await;
        Ok(book)
    }

    async fn update_book(&self, id: i64, fields: BookFields) -> StoreResult<()> {
        let query = r#"
            UPDATE books
            SET title = ?, author = ?, genre = ?, published_date = ?, is_read = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
        "#;

        let affected = self
            .conn
            .execute(
                query,
                libsql::params![
                    fields.title,
                    fields.author,
                    fields.genre,
                    Self::date_param(fields.published_date),
                    fields.is_read as i64,
                    id
                ],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.after_write().await;
        Ok(())
    }

    async fn delete_book(&self, id: i64) -> StoreResult<()> {
        let affected = self
            .conn
            .execute("DELETE FROM books WHERE id = ?", libsql::params![id])
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.after_write().await;
        Ok(())
    }

    async fn set_read(&self, id: i64, is_read: bool) -> StoreResult<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE books SET is_read = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
                libsql::params![is_read as i64, id],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.after_write().await;
        Ok(())
    }
}
