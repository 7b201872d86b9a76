use axum::extract::State;
use axum::Json;
use deployq_core::TickReport;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/tick: reconcile now instead of waiting for the monitor.
pub async fn run_tick(State(app): State<AppState>) -> Result<Json<TickReport>, AppError> {
    Ok(Json(app.coordinator.tick().await?))
}
