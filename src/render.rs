use rust_embed::Embed;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::flash::Message;
use crate::form::FormValues;
use crate::model::{Book, ReadState};

const LAYOUT: &str = "layout.html";

#[derive(Embed)]
#[folder = "templates"]
struct Templates;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {0} not found")]
    MissingTemplate(String),

    #[error("template {0} is not valid utf-8")]
    InvalidTemplate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Html(String),
}

/// A template identifier plus the context it will be filled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub template: &'static str,
    pub title: String,
    pub context: BTreeMap<&'static str, Value>,
}

impl Page {
    pub fn new(template: &'static str, title: impl Into<String>) -> Self {
        Page {
            template,
            title: title.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn text(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.insert(key, Value::Text(value.into()));
        self
    }

    pub fn html(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.insert(key, Value::Html(value.into()));
        self
    }

    /// Raw context value regardless of how it will be inserted.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(|v| match v {
            Value::Text(s) | Value::Html(s) => s.as_str(),
        })
    }
}

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn load(name: &str) -> Result<String, RenderError> {
    let file = Templates::get(name).ok_or_else(|| RenderError::MissingTemplate(name.to_string()))?;
    String::from_utf8(file.data.into_owned()).map_err(|_| RenderError::InvalidTemplate(name.to_string()))
}

fn fill(template: &str, context: &BTreeMap<&'static str, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);

        let key = rest[start + 2..start + len].trim();
        match context.get(key) {
            Some(Value::Text(s)) => out.push_str(&escape(s)),
            Some(Value::Html(s)) => out.push_str(s),
            None => tracing::debug!(key, "template placeholder has no value"),
        }
        rest = &rest[start + len + 2..];
    }

    out.push_str(rest);
    out
}

/// Renders `page` inside the shared layout, showing `messages` above the content.
pub fn render(page: &Page, messages: &[Message]) -> Result<String, RenderError> {
    let content = fill(&load(page.template)?, &page.context);

    let messages: String = messages
        .iter()
        .map(|m| format!(r#"<div class="message {}">{}</div>"#, m.level.as_str(), escape(&m.text)))
        .collect();

    let mut layout = BTreeMap::new();
    layout.insert("title", Value::Text(page.title.clone()));
    layout.insert("messages", Value::Html(messages));
    layout.insert("content", Value::Html(content));

    Ok(fill(&load(LAYOUT)?, &layout))
}

pub fn index() -> Page {
    Page::new("index.html", "خانه")
}

pub fn actions() -> Page {
    Page::new("actions.html", "کتاب جدید")
}

pub fn book_list(books: &[Book], genres: &[String], active_genre: Option<&str>) -> Page {
    let rows: String = books
        .iter()
        .map(|b| {
            format!(
                r#"<tr><td><a href="/books/{id}/">{title}</a></td><td>{author}</td><td>{genre}</td><td>{state}</td><td><form method="post" action="/books/{id}/toggle/"><button type="submit">تغییر وضعیت</button></form></td></tr>"#,
                id = b.id,
                title = escape(&b.title),
                author = escape(&b.author),
                genre = escape(&b.genre),
                state = ReadState::from_flag(b.is_read).label(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let genre_links: String = genres
        .iter()
        .map(|g| {
            let class = if active_genre == Some(g.as_str()) { "active" } else { "" };
            format!(
                r#"<a href="/books/?genre={}" class="{}">{}</a>"#,
                escape(&urlencoding::encode(g)),
                class,
                escape(g)
            )
        })
        .collect::<Vec<_>>()
        .join("\n    ");

    Page::new("book_list.html", "فهرست کتاب‌ها")
        .html("rows", rows)
        .html("genre_links", genre_links)
        .text("all_genres_class", if active_genre.is_none() { "active" } else { "" })
        .text("count", books.len().to_string())
}

pub fn book_detail(book: &Book) -> Page {
    let published = match book.published_date_text() {
        text if text.is_empty() => "—".to_string(),
        text => text,
    };

    Page::new("book_detail.html", book.title.clone())
        .text("id", book.id.to_string())
        .text("book_title", book.title.clone())
        .text("author", book.author.clone())
        .text("genre", book.genre.clone())
        .text("published_date", published)
        .text("read_state", ReadState::from_flag(book.is_read).label())
}

pub fn book_form(form_title: &str, action: &str, values: &FormValues) -> Page {
    Page::new("book_form.html", form_title)
        .text("form_title", form_title)
        .text("action", action)
        .text("title", values.title.clone())
        .text("author", values.author.clone())
        .text("genre", values.genre.clone())
        .text("published_date", values.published_date.clone())
        .html("is_read_checked", if values.is_read { " checked" } else { "" })
}

pub fn confirm_delete(book: &Book) -> Page {
    Page::new("book_confirm_delete.html", "حذف کتاب")
        .text("id", book.id.to_string())
        .text("book_title", book.title.clone())
        .text("author", book.author.clone())
}

pub fn error_page(heading: &str, detail: &str) -> Page {
    Page::new("error.html", heading)
        .text("heading", heading)
        .text("detail", detail)
}
