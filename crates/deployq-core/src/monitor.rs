//! The periodic tick loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::engine::Coordinator;

// `interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Tick `coordinator` every `every` until `shutdown` resolves.
///
/// Ticks never overlap: each one is awaited before the timer is polled again,
/// and ticks missed while a slow one ran are skipped rather than bunched up.
/// A failed tick is logged and the loop carries on.
pub async fn run<F>(coordinator: Arc<Coordinator>, every: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut timer = tokio::time::interval(every.max(MIN_INTERVAL));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!(interval_ms = every.as_millis() as u64, "queue monitor started");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = timer.tick() => {}
        }
        match coordinator.tick().await {
            Ok(report) if !report.is_empty() => {
                tracing::debug!(actions = report.actions.len(), "tick done");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "tick failed"),
        }
    }
    tracing::info!("queue monitor stopped");
}

/// [`run`] on its own task.
pub fn spawn<F>(coordinator: Arc<Coordinator>, every: Duration, shutdown: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(run(coordinator, every, shutdown))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
