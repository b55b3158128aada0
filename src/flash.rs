use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::AppError;
use crate::render::{self, Page};

pub const FLASH_COOKIE: &str = "flash";

const MESSAGE_SEPARATOR: &str = "\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Level::Success),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn success(text: impl Into<String>) -> Self {
        Message {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Message {
            level: Level::Error,
            text: text.into(),
        }
    }

    // The jar percent-encodes cookie values, so the text is stored as-is.
    fn encode(&self) -> String {
        format!("{}:{}", self.level.as_str(), self.text.replace(MESSAGE_SEPARATOR, " "))
    }

    fn decode(raw: &str) -> Option<Self> {
        let (level, text) = raw.split_once(':')?;
        Some(Message {
            level: Level::from_str(level)?,
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Page(Page),
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub reply: Reply,
    pub message: Option<Message>,
}

impl Outcome {
    pub fn page(page: Page) -> Self {
        Outcome {
            reply: Reply::Page(page),
            message: None,
        }
    }

    pub fn redirect(to: impl Into<String>) -> Self {
        Outcome {
            reply: Reply::Redirect(to.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

fn pending(jar: &CookieJar) -> Vec<Message> {
    jar.get(FLASH_COOKIE)
        .map(|c| c.value().split(MESSAGE_SEPARATOR).filter_map(Message::decode).collect())
        .unwrap_or_default()
}

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn respond(jar: CookieJar, outcome: Outcome) -> Response {
    match outcome.reply {
        Reply::Redirect(to) => {
            let jar = match outcome.message {
                Some(message) => {
                    let mut queued: Vec<String> = pending(&jar).iter().map(Message::encode).collect();
                    queued.push(message.encode());
                    jar.add(flash_cookie(queued.join(MESSAGE_SEPARATOR)))
                }
                None => jar,
            };
            (jar, Redirect::to(&to)).into_response()
        }
        Reply::Page(page) => {
            let mut messages = pending(&jar);
            messages.extend(outcome.message);

            let jar = if jar.get(FLASH_COOKIE).is_some() {
                jar.remove(Cookie::build(FLASH_COOKIE).path("/").build())
            } else {
                jar
            };

            match render::render(&page, &messages) {
                Ok(html) => (jar, Html(html)).into_response(),
                Err(e) => AppError::from(e).into_response(),
            }
        }
    }
}
