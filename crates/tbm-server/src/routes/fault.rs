use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tbm_core::command::Command;
use tbm_core::TbmError;

use crate::error::AppError;
use crate::routes::interlocks::accept;
use crate::state::AppState;

/// POST /api/fault/ack — acknowledge a held FAULT.
///
/// Refused with 409 while the last snapshot is unsafe and a fault is held.
pub async fn acknowledge_fault(
    State(app): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let snapshot = app.snapshot();
    if snapshot.fault_acknowledge_required && !snapshot.safety_ok {
        return Err(TbmError::AcknowledgeWhileUnsafe.into());
    }
    accept(&app, Command::AcknowledgeFault)
}
