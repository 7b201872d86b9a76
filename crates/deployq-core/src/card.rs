//! Cards, comments, and the comment markers the coordinator reads back.
//!
//! The board is the only durable state. A card's newest comment tells the
//! coordinator whether the person at the front of the line has already been
//! pinged; [`CommentState`] is that comment decoded into something the
//! engine can match on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between people sharing one card ("alice+bob").
pub const USER_DELIMITER: char = '+';

const NOTIFIED_PREFIX: &str = "Notified ";
const GAVE_UP_PREFIX: &str = "Gave up on ";

pub const BEGIN_DEPLOY_COMMENT: &str = "Beginning deploy!";
pub const DEPLOY_SUCCEEDED_COMMENT: &str = "Deploy succeeded!";
pub const DEPLOY_FAILED_COMMENT: &str = "Deploy failed!";

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub date_last_activity: DateTime<Utc>,
    #[serde(default)]
    pub pos: f64,
}

impl Card {
    /// Users on this card, in the order they were written.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.name
            .split(USER_DELIMITER)
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    pub fn has_user(&self, user: &str) -> bool {
        let user = user.trim();
        self.users().any(|u| u == user)
    }

    /// Time since the board last saw activity on this card, zero if the
    /// card's timestamp is ahead of `now`.
    pub fn idle_for(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.date_last_activity).to_std().unwrap_or_default()
    }
}

/// First card in `cards` that carries `user`.
pub fn find_user<'a>(cards: &'a [Card], user: &str) -> Option<&'a Card> {
    cards.iter().find(|c| c.has_user(user))
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CommentState
// ---------------------------------------------------------------------------

/// What the newest comment on the front card says about notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentState {
    Unnotified,
    Notified,
    GivenUp,
}

impl CommentState {
    /// Decode the newest comment. Older comments are never consulted.
    pub fn from_latest(latest: Option<&Comment>) -> Self {
        match latest.map(|c| c.text.as_str()) {
            Some(text) if text.starts_with(NOTIFIED_PREFIX) => CommentState::Notified,
            Some(text) if text.starts_with(GAVE_UP_PREFIX) => CommentState::GivenUp,
            _ => CommentState::Unnotified,
        }
    }
}

impl fmt::Display for CommentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommentState::Unnotified => "unnotified",
            CommentState::Notified => "notified",
            CommentState::GivenUp => "given_up",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Marker text
// ---------------------------------------------------------------------------

pub fn notified_comment(name: &str) -> String {
    format!("{NOTIFIED_PREFIX}{name} they're up")
}

pub fn renotified_comment(name: &str) -> String {
    format!("{NOTIFIED_PREFIX}{name} again...")
}

pub fn gave_up_comment(name: &str) -> String {
    format!("{GAVE_UP_PREFIX}{name}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as CDur;

    fn card(name: &str) -> Card {
        Card {
            id: "c1".to_string(),
            name: name.to_string(),
            date_last_activity: Utc::now(),
            pos: 0.0,
        }
    }

    fn comment(text: &str) -> Comment {
        Comment {
            id: "a1".to_string(),
            text: text.to_string(),
            date: Utc::now(),
        }
    }

    #[test]
    fn users_split_on_delimiter() {
        let c = card("alice+bob + carol");
        let users: Vec<&str> = c.users().collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn has_user_matches_whole_tokens_only() {
        let c = card("alice+bob");
        assert!(c.has_user("bob"));
        assert!(c.has_user(" alice "));
        assert!(!c.has_user("al"));
        assert!(!c.has_user("alice+bob"));
    }

    #[test]
    fn find_user_first_match_wins() {
        let mut first = card("alice+bob");
        first.id = "first".to_string();
        let mut second = card("bob");
        second.id = "second".to_string();
        let cards = vec![first, second];
        assert_eq!(find_user(&cards, "bob").unwrap().id, "first");
        assert!(find_user(&cards, "dave").is_none());
    }

    #[test]
    fn idle_for_clamps_future_timestamps() {
        let c = card("alice");
        let earlier = c.date_last_activity - CDur::seconds(10);
        assert_eq!(c.idle_for(earlier), std::time::Duration::ZERO);
        let later = c.date_last_activity + CDur::seconds(90);
        assert_eq!(c.idle_for(later).as_secs(), 90);
    }

    #[test]
    fn comment_state_decodes_markers() {
        assert_eq!(CommentState::from_latest(None), CommentState::Unnotified);
        assert_eq!(
            CommentState::from_latest(Some(&comment(&notified_comment("alice")))),
            CommentState::Notified
        );
        assert_eq!(
            CommentState::from_latest(Some(&comment(&renotified_comment("alice")))),
            CommentState::Notified
        );
        assert_eq!(
            CommentState::from_latest(Some(&comment(&gave_up_comment("alice")))),
            CommentState::GivenUp
        );
        assert_eq!(
            CommentState::from_latest(Some(&comment(DEPLOY_FAILED_COMMENT))),
            CommentState::Unnotified
        );
    }

    #[test]
    fn card_parses_board_json() {
        let json = r#"{
            "id": "5f1a",
            "name": "alice+bob",
            "dateLastActivity": "2016-03-01T12:00:00.000Z",
            "pos": 16384,
            "closed": false
        }"#;
        let c: Card = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, "5f1a");
        assert!(c.has_user("bob"));
        assert_eq!(c.pos, 16384.0);
    }
}
