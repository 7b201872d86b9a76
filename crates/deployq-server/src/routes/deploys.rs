use axum::extract::{Path, State};
use axum::Json;
use deployq_core::CommandOutcome;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct EnqueueBody {
    pub user: String,
}

/// POST /api/queue: put a user at the back of the line.
pub async fn enqueue(
    State(app): State<AppState>,
    Json(body): Json<EnqueueBody>,
) -> Result<Json<CommandOutcome>, AppError> {
    Ok(Json(app.coordinator.enqueue(&body.user).await?))
}

/// POST /api/deploys/{user}/start
pub async fn start(
    State(app): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CommandOutcome>, AppError> {
    Ok(Json(app.coordinator.start_deploy(&user).await?))
}

/// POST /api/deploys/{user}/success
pub async fn success(
    State(app): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CommandOutcome>, AppError> {
    Ok(Json(app.coordinator.mark_success(&user).await?))
}

/// POST /api/deploys/{user}/failure: the card goes back to the head of the
/// queue.
pub async fn failure(
    State(app): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CommandOutcome>, AppError> {
    Ok(Json(app.coordinator.mark_failure(&user).await?))
}
