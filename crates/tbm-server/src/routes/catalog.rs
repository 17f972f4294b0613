use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/catalog — interlock, actuator and device definitions.
pub async fn get_catalog(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(&*app.catalog)?))
}
