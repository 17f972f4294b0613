use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tbm_core::command::Command;
use tbm_core::paths::validate_id;
use tbm_core::TbmError;

use crate::error::AppError;
use crate::routes::interlocks::accept;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct SetActuatorBody {
    on: bool,
}

/// GET /api/actuators — commanded on/off state of every actuator.
pub async fn list_actuators(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = app.snapshot();
    Ok(Json(serde_json::to_value(&snapshot.actuators)?))
}

/// POST /api/actuators/{id} — body `{ "on": bool }`.
pub async fn set_actuator(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetActuatorBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    validate_id(&id)?;
    if !app.catalog.has_actuator(&id) {
        return Err(TbmError::UnknownActuator(id).into());
    }
    accept(&app, Command::SetActuator { id, on: body.on })
}
