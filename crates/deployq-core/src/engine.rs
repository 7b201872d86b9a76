//! The deploy-queue coordinator.
//!
//! A [`Coordinator`] owns everything the queue needs across ticks: the board
//! handle, the resolved list ids, the sink, the policy, and a little
//! in-process memory (last subject pushed, which slow deploys were already
//! called out). Everything else is read back from the board on every tick.
//!
//! # Tick
//!
//! ```text
//! read snapshot ──► up-next step ──► subject step ──► slow-deploy step ──► long-queue step
//!                  (board writes)    (sink only)      (sink only)          (sink only)
//! ```
//!
//! The up-next step decides from the newest comment on the front card:
//!
//! | newest comment | idle > notify patience | queue len | action                         |
//! |----------------|------------------------|-----------|--------------------------------|
//! | not a marker   | any                    | any       | LOW "you're up", mark Notified |
//! | Notified       | no                     | any       | nothing                        |
//! | Notified       | yes                    | 1         | HIGH nudge, mark Notified again |
//! | Notified       | yes                    | > 1       | HIGH notice, Gave up, rotate    |
//!
//! Each action writes its comment first and only then notifies and moves, so
//! a failed comment never produces a notification the board can't remember.
//! Two remote writes are never atomic: if a move fails after its comment
//! landed, the next tick works from whatever the board now says.
//!
//! Rotation is the exception to "the next tick retries". Once `Gave up on`
//! is on the card, a failed move leaves it at the front reading as
//! unnotified, so the next tick greets the same person with a fresh "you're
//! up" instead of rotating, and everyone behind waits another notify
//! patience.
//!
//! Ticks on one coordinator never overlap: `tick_at` holds an async guard
//! for the whole pass. Commands don't take it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::Instrument;

use crate::board::{BoardGateway, Position};
use crate::card::{self, Card, CommentState};
use crate::config::Config;
use crate::error::{DeployqError, Result};
use crate::sink::{Severity, Sink};
use crate::state::{DeploymentState, ListIds, StateReader};

pub const YOURE_UP: &str = "you're up!";
pub const STILL_CLEAR: &str = "hey, you know you're clear to deploy, right?";
pub const SENT_TO_BACK: &str = "sorry; there are others in the queue, so sending you to the back";
pub const LONG_QUEUE: &str = "this deploy queue's long... got simple commits? why not merge?";

const NOBODY_RUNNING: &str = " -- ";

pub fn slow_deploy_message(name: &str) -> String {
    format!("{name}'s deploy has been running for a while; everything ok?")
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Policy {
    pub notify_patience: Duration,
    pub deploy_patience: Duration,
    /// 0 disables the long-queue nudge.
    pub long_queue_threshold: usize,
    pub board_url: Option<String>,
}

impl Policy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            notify_patience: config.patience.notify(),
            deploy_patience: config.patience.deploy(),
            long_queue_threshold: config.long_queue_threshold,
            board_url: config.board_url.clone(),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_config(&Config::new(""))
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One thing a tick did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TickAction {
    Notified { card: String, name: String },
    Renotified { card: String, name: String },
    GaveUp { card: String, name: String },
    SubjectChanged { subject: String },
    SlowDeploy { card: String, name: String },
    LongQueue { length: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub actions: Vec<TickAction>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Queue,
    Running,
    Done,
}

/// What a command did to the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Created { card: Card, list: ListKind },
    Moved { card: Card, to: ListKind },
    AlreadyRunning { card: Card },
    NoMatch,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Memory {
    subject: Option<String>,
    slow_deploys: HashSet<String>,
    long_queue_warned: bool,
}

pub struct Coordinator {
    board: Arc<dyn BoardGateway>,
    reader: StateReader,
    ids: ListIds,
    sink: Sink,
    policy: Policy,
    memory: Mutex<Memory>,
    tick_guard: tokio::sync::Mutex<()>,
}

impl Coordinator {
    pub fn new(board: Arc<dyn BoardGateway>, ids: ListIds, sink: Sink, policy: Policy) -> Self {
        Self {
            reader: StateReader::new(board.clone(), ids.clone()),
            board,
            ids,
            sink,
            policy,
            memory: Mutex::new(Memory::default()),
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Resolve the configured list names and build a coordinator. Fails if
    /// any list is missing from the board.
    pub async fn connect(board: Arc<dyn BoardGateway>, config: &Config, sink: Sink) -> Result<Self> {
        let ids = ListIds::load(board.as_ref(), &config.board.id, &config.lists).await?;
        Ok(Self::new(board, ids, sink, Policy::from_config(config)))
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn ids(&self) -> &ListIds {
        &self.ids
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Last subject pushed to the sink, if any.
    pub fn current_subject(&self) -> Option<String> {
        self.memory().subject.clone()
    }

    fn memory(&self) -> MutexGuard<'_, Memory> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn deployment_state(&self) -> Result<DeploymentState> {
        self.reader.deployment_state().await
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Run one reconciliation pass as of `now`.
    ///
    /// A failure in the up-next step does not stop the sink-only steps; the
    /// first board error is returned after they have run. A concurrent call
    /// waits for the running pass to finish and then reads the board afresh.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let _guard = self.tick_guard.lock().await;
        async move {
            let state = self.reader.deployment_state().await?;
            let mut report = TickReport::default();

            let up_next = self.handle_up_next(&state, now, &mut report).await;
            if let Some(subject) = self.update_subject(&state) {
                report.actions.push(TickAction::SubjectChanged { subject });
            }
            self.check_slow_deploys(&state, now, &mut report);
            self.check_long_queue(&state, &mut report);

            up_next?;
            Ok(report)
        }
        .instrument(tracing::debug_span!("tick", %now))
        .await
    }

    async fn handle_up_next(
        &self,
        state: &DeploymentState,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let Some(front) = state.up_next() else {
            return Ok(());
        };

        let comments = self.board.list_comments(&front.id).await?;
        let marker = CommentState::from_latest(comments.first());
        let stalled = front.idle_for(now) > self.policy.notify_patience;
        tracing::debug!(card = %front.id, name = %front.name, %marker, stalled, "up next");

        match marker {
            CommentState::Notified if !stalled => {}
            CommentState::Notified if state.queue.len() == 1 => {
                self.board
                    .add_comment(&front.id, &card::renotified_comment(&front.name))
                    .await?;
                self.sink.notify(&front.name, STILL_CLEAR, Severity::High);
                tracing::info!(card = %front.id, name = %front.name, "re-notified idle deployer");
                report.actions.push(TickAction::Renotified {
                    card: front.id.clone(),
                    name: front.name.clone(),
                });
            }
            CommentState::Notified => {
                self.board
                    .add_comment(&front.id, &card::gave_up_comment(&front.name))
                    .await?;
                self.sink.notify(&front.name, SENT_TO_BACK, Severity::High);
                report.actions.push(TickAction::GaveUp {
                    card: front.id.clone(),
                    name: front.name.clone(),
                });
                self.board
                    .move_card(&front.id, &self.ids.queue, Some(Position::Bottom))
                    .await?;
                tracing::info!(card = %front.id, name = %front.name, "rotated to back of queue");
            }
            CommentState::Unnotified | CommentState::GivenUp => {
                self.board
                    .add_comment(&front.id, &card::notified_comment(&front.name))
                    .await?;
                self.sink.notify(&front.name, YOURE_UP, Severity::Low);
                tracing::info!(card = %front.id, name = %front.name, "notified up next");
                report.actions.push(TickAction::Notified {
                    card: front.id.clone(),
                    name: front.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Push the subject for `state` if it differs from the last one pushed.
    /// Returns the new subject when it was pushed.
    pub fn update_subject(&self, state: &DeploymentState) -> Option<String> {
        let subject = render_subject(state, self.policy.board_url.as_deref());
        {
            let mut memory = self.memory();
            if memory.subject.as_deref() == Some(subject.as_str()) {
                return None;
            }
            memory.subject = Some(subject.clone());
        }
        self.sink.set_subject(&subject);
        Some(subject)
    }

    fn check_slow_deploys(&self, state: &DeploymentState, now: DateTime<Utc>, report: &mut TickReport) {
        let slow: Vec<&Card> = {
            let mut memory = self.memory();
            memory
                .slow_deploys
                .retain(|id| state.running.iter().any(|c| &c.id == id));
            let reported = &mut memory.slow_deploys;
            let fresh: Vec<&Card> = state
                .running
                .iter()
                .filter(|c| c.idle_for(now) > self.policy.deploy_patience)
                .filter(|c| reported.insert(c.id.clone()))
                .collect();
            fresh
        };
        for card in slow {
            self.sink
                .notify(&card.name, &slow_deploy_message(&card.name), Severity::Medium);
            tracing::info!(card = %card.id, name = %card.name, "deploy running long");
            report.actions.push(TickAction::SlowDeploy {
                card: card.id.clone(),
                name: card.name.clone(),
            });
        }
    }

    fn check_long_queue(&self, state: &DeploymentState, report: &mut TickReport) {
        let threshold = self.policy.long_queue_threshold;
        if threshold == 0 {
            return;
        }
        let length = state.queue.len();
        {
            let mut memory = self.memory();
            if length <= threshold {
                memory.long_queue_warned = false;
                return;
            }
            if memory.long_queue_warned {
                return;
            }
            memory.long_queue_warned = true;
        }
        for card in &state.queue {
            self.sink.notify(&card.name, LONG_QUEUE, Severity::Medium);
        }
        tracing::info!(length, threshold, "deploy queue is backed up");
        report.actions.push(TickAction::LongQueue { length });
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Add `user` to the back of the queue. Callers are responsible for not
    /// enqueueing someone twice.
    pub async fn enqueue(&self, user: &str) -> Result<CommandOutcome> {
        let user = checked_user(user)?;
        let card = self.board.add_card(&self.ids.queue, user).await?;
        tracing::info!(card = %card.id, user = %user, "enqueued");
        Ok(CommandOutcome::Created {
            card,
            list: ListKind::Queue,
        })
    }

    /// Move `user`'s queue card to running, or create a running card when
    /// they never queued.
    pub async fn start_deploy(&self, user: &str) -> Result<CommandOutcome> {
        let user = checked_user(user)?;
        let state = self.deployment_state().await?;

        if let Some(card) = card::find_user(&state.running, user) {
            tracing::info!(card = %card.id, user = %user, "deploy already running");
            return Ok(CommandOutcome::AlreadyRunning { card: card.clone() });
        }

        match card::find_user(&state.queue, user) {
            Some(card) => {
                self.board
                    .add_comment(&card.id, card::BEGIN_DEPLOY_COMMENT)
                    .await?;
                self.board.move_card(&card.id, &self.ids.running, None).await?;
                tracing::info!(card = %card.id, user = %user, "deploy started");
                Ok(CommandOutcome::Moved {
                    card: card.clone(),
                    to: ListKind::Running,
                })
            }
            None => {
                let card = self.board.add_card(&self.ids.running, user).await?;
                tracing::info!(card = %card.id, user = %user, "deploy started without queueing");
                Ok(CommandOutcome::Created {
                    card,
                    list: ListKind::Running,
                })
            }
        }
    }

    /// Move `user`'s running card to done. No-op when they aren't running.
    pub async fn mark_success(&self, user: &str) -> Result<CommandOutcome> {
        self.finish(user, card::DEPLOY_SUCCEEDED_COMMENT, ListKind::Done)
            .await
    }

    /// Send `user`'s running card back to the head of the queue for another
    /// attempt. No-op when they aren't running.
    pub async fn mark_failure(&self, user: &str) -> Result<CommandOutcome> {
        self.finish(user, card::DEPLOY_FAILED_COMMENT, ListKind::Queue)
            .await
    }

    async fn finish(&self, user: &str, comment: &str, to: ListKind) -> Result<CommandOutcome> {
        let user = checked_user(user)?;
        let state = self.deployment_state().await?;
        let Some(card) = card::find_user(&state.running, user) else {
            tracing::info!(user = %user, "no running deploy to finish");
            return Ok(CommandOutcome::NoMatch);
        };

        let (list, position) = match to {
            ListKind::Done => (&self.ids.done, None),
            ListKind::Queue => (&self.ids.queue, Some(Position::Top)),
            ListKind::Running => (&self.ids.running, None),
        };
        self.board.add_comment(&card.id, comment).await?;
        self.board.move_card(&card.id, list, position).await?;
        tracing::info!(card = %card.id, user = %user, to = ?to, "deploy finished");
        Ok(CommandOutcome::Moved {
            card: card.clone(),
            to,
        })
    }
}

fn checked_user(user: &str) -> Result<&str> {
    let user = user.trim();
    if user.is_empty() {
        return Err(DeployqError::EmptyUser);
    }
    Ok(user)
}

/// `"{running} | [{queued, ...}]"`, plus a pointer to the board when known.
pub fn render_subject(state: &DeploymentState, board_url: Option<&str>) -> String {
    let running = if state.running.is_empty() {
        NOBODY_RUNNING.to_string()
    } else {
        join_names(&state.running)
    };
    let mut subject = format!("{running} | [{}]", join_names(&state.queue));
    if let Some(url) = board_url {
        subject.push_str(&format!(" (alter the queue manually at {url})"));
    }
    subject
}

fn join_names(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
