use axum::extract::State;
use axum::Json;
use deployq_core::engine::render_subject;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/state: the queue, the running deploy, and the subject line.
pub async fn get_state(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let state = app.coordinator.deployment_state().await?;
    let subject = render_subject(&state, app.coordinator.policy().board_url.as_deref());
    Ok(Json(serde_json::json!({
        "queue": state.queue,
        "running": state.running,
        "subject": subject,
    })))
}
