use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config — read-only view of the running engine configuration,
/// with any validation warnings against the loaded catalog.
///
/// No PUT endpoint: policies are fixed for the life of the control loop.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let warnings = app.config.validate(Some(&app.catalog));
    Ok(Json(serde_json::json!({
        "config": &*app.config,
        "warnings": warnings,
    })))
}
