pub mod deploys;
pub mod events;
pub mod state;
pub mod tick;
