pub mod board;
pub mod card;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod sink;
pub mod state;
pub mod trello;

pub use board::{BoardGateway, BoardList, Position};
pub use card::{Card, Comment, CommentState};
pub use config::Config;
pub use engine::{CommandOutcome, Coordinator, ListKind, Policy, TickAction, TickReport};
pub use error::{DeployqError, Result};
pub use memory::InMemoryBoard;
pub use sink::{Severity, Sink};
pub use state::{DeploymentState, ListIds, StateReader};
pub use trello::TrelloBoard;
