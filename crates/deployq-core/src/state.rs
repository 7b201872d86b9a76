//! Per-tick snapshot of the queue and the lookup that feeds it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::board::{BoardGateway, BoardList};
use crate::card::Card;
use crate::config::ListNames;
use crate::error::{DeployqError, Result};

// ---------------------------------------------------------------------------
// ListIds
// ---------------------------------------------------------------------------

/// Board ids for the three well-known lists. Resolved once at start-up and
/// never refreshed: a renamed list means a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListIds {
    pub queue: String,
    pub running: String,
    pub done: String,
}

impl ListIds {
    /// Map configured list names onto ids. A missing name is fatal.
    pub fn resolve(lists: &[BoardList], names: &ListNames) -> Result<Self> {
        let find = |name: &str| {
            lists
                .iter()
                .find(|l| l.name == name)
                .map(|l| l.id.clone())
                .ok_or_else(|| DeployqError::MissingList(name.to_string()))
        };
        Ok(Self {
            queue: find(&names.queue)?,
            running: find(&names.running)?,
            done: find(&names.done)?,
        })
    }

    /// Fetch the board's lists and resolve `names` against them.
    pub async fn load(
        board: &dyn BoardGateway,
        board_id: &str,
        names: &ListNames,
    ) -> Result<Self> {
        let lists = board.list_lists(board_id).await?;
        let ids = Self::resolve(&lists, names)?;
        tracing::info!(
            queue = %ids.queue,
            running = %ids.running,
            done = %ids.done,
            "resolved board lists"
        );
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// DeploymentState
// ---------------------------------------------------------------------------

/// Who is waiting and who is deploying, in board order. Built fresh for every
/// tick and command; never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub queue: Vec<Card>,
    pub running: Vec<Card>,
}

impl DeploymentState {
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running.is_empty()
    }

    /// Front of the line, but only when nobody is deploying.
    pub fn up_next(&self) -> Option<&Card> {
        if self.running.is_empty() {
            self.queue.first()
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// StateReader
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct StateReader {
    board: Arc<dyn BoardGateway>,
    ids: ListIds,
}

impl StateReader {
    pub fn new(board: Arc<dyn BoardGateway>, ids: ListIds) -> Self {
        Self { board, ids }
    }

    /// Read the queue and running lists concurrently.
    pub async fn deployment_state(&self) -> Result<DeploymentState> {
        let (queue, running) = tokio::try_join!(
            self.board.list_cards(&self.ids.queue),
            self.board.list_cards(&self.ids.running),
        )?;
        Ok(DeploymentState { queue, running })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBoard;

    fn lists(names: &[(&str, &str)]) -> Vec<BoardList> {
        names
            .iter()
            .map(|(id, name)| BoardList {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn resolve_maps_names_to_ids() {
        let ids = ListIds::resolve(
            &lists(&[("d", "Completed"), ("q", "In Line"), ("r", "Deploying"), ("x", "Other")]),
            &ListNames::default(),
        )
        .unwrap();
        assert_eq!(ids.queue, "q");
        assert_eq!(ids.running, "r");
        assert_eq!(ids.done, "d");
    }

    #[test]
    fn resolve_missing_list_is_fatal() {
        let err = ListIds::resolve(
            &lists(&[("q", "In Line"), ("r", "Deploying")]),
            &ListNames::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DeployqError::MissingList(name) if name == "Completed"));
    }

    #[test]
    fn up_next_only_when_nothing_running() {
        let card = |name: &str| Card {
            id: name.to_string(),
            name: name.to_string(),
            date_last_activity: chrono::Utc::now(),
            pos: 0.0,
        };
        let mut state = DeploymentState {
            queue: vec![card("alice"), card("bob")],
            running: vec![],
        };
        assert_eq!(state.up_next().unwrap().name, "alice");
        state.running.push(card("carol"));
        assert!(state.up_next().is_none());
        assert!(!state.is_idle());
    }

    #[tokio::test]
    async fn reader_preserves_list_order() {
        let board = Arc::new(InMemoryBoard::with_lists(
            "b1",
            &["In Line", "Deploying", "Completed"],
        ));
        let ids = ListIds::load(board.as_ref(), "b1", &ListNames::default())
            .await
            .unwrap();
        board.seed_card(&ids.queue, "alice").unwrap();
        board.seed_card(&ids.queue, "bob").unwrap();
        board.seed_card(&ids.running, "carol").unwrap();

        let reader = StateReader::new(board.clone(), ids);
        let state = reader.deployment_state().await.unwrap();
        let queue: Vec<&str> = state.queue.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(queue, vec!["alice", "bob"]);
        assert_eq!(state.running[0].name, "carol");
    }

    #[tokio::test]
    async fn reader_surfaces_board_failure() {
        let board = Arc::new(InMemoryBoard::with_lists(
            "b1",
            &["In Line", "Deploying", "Completed"],
        ));
        let ids = ListIds::load(board.as_ref(), "b1", &ListNames::default())
            .await
            .unwrap();
        board.fail_next(1);
        let reader = StateReader::new(board, ids);
        let err = reader.deployment_state().await.unwrap_err();
        assert!(err.is_board_failure());
    }
}
