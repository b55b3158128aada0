use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_date: Option<NaiveDate>,
    pub is_read: bool,
}

impl Book {
    /// `YYYY-MM-DD`, or an empty string when the date is unset.
    pub fn published_date_text(&self) -> String {
        self.published_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// Column values written on insert and on in-place update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_date: Option<NaiveDate>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Read,
    Unread,
}

impl ReadState {
    pub fn from_flag(is_read: bool) -> Self {
        if is_read { ReadState::Read } else { ReadState::Unread }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadState::Read => "خوانده شده",
            ReadState::Unread => "خوانده نشده",
        }
    }
}
