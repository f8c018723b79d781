use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::movie::{Movie, MovieResponse};

/// A (user, movie) visitation record; created once, never updated
#[derive(Debug, Clone, PartialEq)]
pub struct WatchHistoryEntry {
    pub id: i64,
    pub user: i64,
    pub movie: Movie,
    pub watched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WatchHistoryResponse {
    pub id: i64,
    pub movie: MovieResponse,
    pub watched_at: DateTime<Utc>,
}

impl From<&WatchHistoryEntry> for WatchHistoryResponse {
    fn from(entry: &WatchHistoryEntry) -> Self {
        Self {
            id: entry.id,
            movie: MovieResponse::from(&entry.movie),
            watched_at: entry.watched_at,
        }
    }
}

/// Who wrote a chat transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "bot" => Sender::Bot,
            _ => Sender::User,
        }
    }
}

impl Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the append-only chat transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    #[serde(skip)]
    pub user: i64,
    pub sender: Sender,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
