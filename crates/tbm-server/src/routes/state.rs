use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/state — the last committed engine snapshot.
pub async fn get_state(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = app.snapshot();
    Ok(Json(serde_json::to_value(&*snapshot)?))
}
