use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tbm_core::command::Command;
use tbm_core::interlock::ResetPolicy;
use tbm_core::paths::validate_id;
use tbm_core::TbmError;

use crate::error::AppError;
use crate::state::AppState;

fn known_interlock(app: &AppState, id: &str) -> Result<(), TbmError> {
    validate_id(id)?;
    if app.catalog.has_interlock(id) {
        Ok(())
    } else {
        Err(TbmError::UnknownInterlock(id.to_string()))
    }
}

/// Queue `command` and answer 202 with the tick it will follow.
pub(crate) fn accept(
    app: &AppState,
    command: Command,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let body = serde_json::json!({
        "queued": &command,
        "after_tick": app.snapshot().tick,
    });
    app.enqueue(command)?;
    Ok((StatusCode::ACCEPTED, Json(body)))
}

/// GET /api/interlocks — every interlock with its state, in catalog order.
pub async fn list_interlocks(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = app.snapshot();
    Ok(Json(serde_json::to_value(&snapshot.interlocks)?))
}

/// GET /api/interlocks/{id}
pub async fn get_interlock(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    known_interlock(&app, &id)?;
    let snapshot = app.snapshot();
    let status = snapshot
        .interlock(&id)
        .ok_or_else(|| TbmError::UnknownInterlock(id.clone()))?;
    Ok(Json(serde_json::to_value(status)?))
}

/// POST /api/interlocks/{id}/trip
pub async fn trip_interlock(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    known_interlock(&app, &id)?;
    accept(&app, Command::ManualTrip { id })
}

/// POST /api/interlocks/{id}/reset
///
/// Under the guarded policy a reset of an interlock that the last snapshot
/// shows active is refused up front. The tick re-checks either way.
pub async fn reset_interlock(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    known_interlock(&app, &id)?;
    if app.config.reset_policy == ResetPolicy::Guarded {
        let active = app
            .snapshot()
            .interlock(&id)
            .is_some_and(|s| s.state.active);
        if active {
            return Err(TbmError::ResetWhileActive(id).into());
        }
    }
    accept(&app, Command::ManualReset { id })
}

/// POST /api/interlocks/{id}/clear — the field condition went away.
pub async fn clear_interlock(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    known_interlock(&app, &id)?;
    accept(&app, Command::ClearCondition { id })
}
