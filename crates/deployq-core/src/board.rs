//! The board service boundary.
//!
//! [`BoardGateway`] is a thin adapter: no policy, no retries. Every failure
//! goes back to the caller. [`crate::trello::TrelloBoard`] talks to the real
//! service; [`crate::memory::InMemoryBoard`] keeps everything in-process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::card::{Card, Comment};
use crate::error::Result;

/// Where a moved card lands in its destination list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Top,
    Bottom,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Top => "top",
            Position::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A list on the board, as returned by [`BoardGateway::list_lists`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait BoardGateway: Send + Sync {
    /// Open cards in `list_id`, in board order.
    async fn list_cards(&self, list_id: &str) -> Result<Vec<Card>>;

    /// Comments on `card_id`, newest first.
    async fn list_comments(&self, card_id: &str) -> Result<Vec<Comment>>;

    async fn add_card(&self, list_id: &str, name: &str) -> Result<Card>;

    /// Move a card. `None` leaves placement to the service (top of list).
    async fn move_card(&self, card_id: &str, list_id: &str, position: Option<Position>)
        -> Result<()>;

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<()>;

    async fn list_lists(&self, board_id: &str) -> Result<Vec<BoardList>>;
}
