//! In-memory board implementation.
//!
//! [`InMemoryBoard`] behaves like the hosted board closely enough to drive the
//! coordinator end to end: cards keep list order, comments come back newest
//! first, and every write bumps the card's last-activity timestamp.
//!
//! ## Limitations
//!
//! - Single process only; nothing is persisted.
//! - Timestamps come from [`InMemoryBoard::set_clock`] when set, otherwise
//!   from the wall clock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::board::{BoardGateway, BoardList, Position};
use crate::card::{Card, Comment};
use crate::error::{DeployqError, Result};

#[derive(Debug, Default)]
struct Inner {
    board_id: String,
    lists: Vec<BoardList>,
    cards: HashMap<String, Vec<Card>>,
    comments: HashMap<String, Vec<Comment>>,
    clock: Option<DateTime<Utc>>,
    next_id: u64,
    writes: usize,
    fail_next: usize,
    fail_writes: usize,
}

impl Inner {
    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn check_failure(&mut self, endpoint: &str) -> Result<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(DeployqError::BoardStatus {
                status: 503,
                endpoint: endpoint.to_string(),
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn check_write_failure(&mut self, endpoint: &str) -> Result<()> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(DeployqError::BoardStatus {
                status: 503,
                endpoint: endpoint.to_string(),
                body: "injected failure".to_string(),
            });
        }
        self.check_failure(endpoint)
    }

    fn list_mut(&mut self, list_id: &str) -> Result<&mut Vec<Card>> {
        self.cards
            .get_mut(list_id)
            .ok_or_else(|| DeployqError::CardNotFound(format!("list {list_id}")))
    }

    fn take_card(&mut self, card_id: &str) -> Result<Card> {
        for cards in self.cards.values_mut() {
            if let Some(idx) = cards.iter().position(|c| c.id == card_id) {
                return Ok(cards.remove(idx));
            }
        }
        Err(DeployqError::CardNotFound(card_id.to_string()))
    }

    fn touch(&mut self, card_id: &str) {
        let now = self.now();
        for card in self.cards.values_mut().flatten() {
            if card.id == card_id {
                card.date_last_activity = now;
            }
        }
    }

    fn insert(&mut self, list_id: &str, mut card: Card, position: Position) -> Result<()> {
        let cards = self.list_mut(list_id)?;
        match position {
            Position::Top => {
                card.pos = cards.first().map_or(1.0, |c| c.pos - 1.0);
                cards.insert(0, card);
            }
            Position::Bottom => {
                card.pos = cards.last().map_or(1.0, |c| c.pos + 1.0);
                cards.push(card);
            }
        }
        Ok(())
    }
}

/// Thread-safe in-process board.
#[derive(Debug, Default)]
pub struct InMemoryBoard {
    inner: Mutex<Inner>,
}

impl InMemoryBoard {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                board_id: board_id.into(),
                ..Inner::default()
            }),
        }
    }

    /// A board with one empty list per name, in order.
    pub fn with_lists(board_id: impl Into<String>, names: &[&str]) -> Self {
        let board = Self::new(board_id);
        for name in names {
            board.add_list(name);
        }
        board
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_list(&self, name: &str) -> String {
        let mut inner = self.lock();
        let id = inner.next_id("list");
        inner.lists.push(BoardList {
            id: id.clone(),
            name: name.to_string(),
        });
        inner.cards.insert(id.clone(), Vec::new());
        id
    }

    pub fn list_id(&self, name: &str) -> Option<String> {
        self.lock()
            .lists
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.id.clone())
    }

    /// Place a card without counting it as a write, as if someone had
    /// edited the board by hand.
    pub fn seed_card(&self, list_id: &str, name: &str) -> Result<Card> {
        let mut inner = self.lock();
        let card = Card {
            id: inner.next_id("card"),
            name: name.to_string(),
            date_last_activity: inner.now(),
            pos: 0.0,
        };
        inner.insert(list_id, card.clone(), Position::Bottom)?;
        Ok(card)
    }

    /// Append a comment without counting it as a write.
    pub fn seed_comment(&self, card_id: &str, text: &str) {
        let mut inner = self.lock();
        let comment = Comment {
            id: inner.next_id("comment"),
            text: text.to_string(),
            date: inner.now(),
        };
        inner
            .comments
            .entry(card_id.to_string())
            .or_default()
            .push(comment);
        inner.touch(card_id);
    }

    /// Snapshot of a list, in board order.
    pub fn cards(&self, list_id: &str) -> Vec<Card> {
        self.lock().cards.get(list_id).cloned().unwrap_or_default()
    }

    /// Comments on a card, newest first.
    pub fn comments(&self, card_id: &str) -> Vec<Comment> {
        let inner = self.lock();
        let mut comments = inner.comments.get(card_id).cloned().unwrap_or_default();
        comments.reverse();
        comments
    }

    /// Number of mutating calls served through [`BoardGateway`].
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Pin the clock used to stamp activity. Tests use this to control
    /// elapsed time deterministically.
    pub fn set_clock(&self, now: DateTime<Utc>) {
        self.lock().clock = Some(now);
    }

    /// Fail the next `n` gateway calls with a 503.
    pub fn fail_next(&self, n: usize) {
        self.lock().fail_next = n;
    }

    /// Fail the next `n` mutating calls with a 503; reads still succeed.
    pub fn fail_next_writes(&self, n: usize) {
        self.lock().fail_writes = n;
    }
}

#[async_trait]
impl BoardGateway for InMemoryBoard {
    async fn list_cards(&self, list_id: &str) -> Result<Vec<Card>> {
        let mut inner = self.lock();
        inner.check_failure("list_cards")?;
        Ok(inner.list_mut(list_id)?.clone())
    }

    async fn list_comments(&self, card_id: &str) -> Result<Vec<Comment>> {
        {
            let mut inner = self.lock();
            inner.check_failure("list_comments")?;
        }
        Ok(self.comments(card_id))
    }

    async fn add_card(&self, list_id: &str, name: &str) -> Result<Card> {
        let mut inner = self.lock();
        inner.check_write_failure("add_card")?;
        let card = Card {
            id: inner.next_id("card"),
            name: name.to_string(),
            date_last_activity: inner.now(),
            pos: 0.0,
        };
        inner.insert(list_id, card.clone(), Position::Bottom)?;
        inner.writes += 1;
        Ok(card)
    }

    async fn move_card(
        &self,
        card_id: &str,
        list_id: &str,
        position: Option<Position>,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.check_write_failure("move_card")?;
        if !inner.cards.contains_key(list_id) {
            return Err(DeployqError::CardNotFound(format!("list {list_id}")));
        }
        let mut card = inner.take_card(card_id)?;
        card.date_last_activity = inner.now();
        inner.insert(list_id, card, position.unwrap_or(Position::Top))?;
        inner.writes += 1;
        Ok(())
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.check_write_failure("add_comment")?;
        if !inner.cards.values().flatten().any(|c| c.id == card_id) {
            return Err(DeployqError::CardNotFound(card_id.to_string()));
        }
        let comment = Comment {
            id: inner.next_id("comment"),
            text: text.to_string(),
            date: inner.now(),
        };
        inner
            .comments
            .entry(card_id.to_string())
            .or_default()
            .push(comment);
        inner.touch(card_id);
        inner.writes += 1;
        Ok(())
    }

    async fn list_lists(&self, board_id: &str) -> Result<Vec<BoardList>> {
        let mut inner = self.lock();
        inner.check_failure("list_lists")?;
        if inner.board_id != board_id {
            return Err(DeployqError::BoardStatus {
                status: 404,
                endpoint: format!("board {board_id}"),
                body: "board not found".to_string(),
            });
        }
        Ok(inner.lists.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
