use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tbm_core::error::TbmError;

// ---------------------------------------------------------------------------
// Internal sentinel for an unavailable control loop
// ---------------------------------------------------------------------------

/// Carries an explicit 503 through the `anyhow::Error` chain without
/// touching the `TbmError` enum.
#[derive(Debug)]
struct UnavailableError(String);

impl std::fmt::Display for UnavailableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UnavailableError {}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// 503: the control loop is no longer accepting commands.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self(UnavailableError(msg.into()).into())
    }
}

fn status_for(err: &TbmError) -> StatusCode {
    match err {
        TbmError::UnknownInterlock(_) | TbmError::UnknownActuator(_) => StatusCode::NOT_FOUND,
        TbmError::ResetWhileActive(_) | TbmError::AcknowledgeWhileUnsafe => StatusCode::CONFLICT,
        TbmError::InvalidOperator(_)
        | TbmError::InvalidId(_)
        | TbmError::DuplicateId(_)
        | TbmError::EmptyCatalog
        | TbmError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        TbmError::Io(_) | TbmError::Yaml(_) | TbmError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<UnavailableError>().is_some() {
            StatusCode::SERVICE_UNAVAILABLE
        } else if let Some(e) = self.0.downcast_ref::<TbmError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: TbmError) -> StatusCode {
        AppError(err.into()).into_response().status()
    }

    #[test]
    fn unknown_ids_map_to_404() {
        assert_eq!(
            status(TbmError::UnknownInterlock("Z9".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(TbmError::UnknownActuator("drill".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn guarded_reset_maps_to_409() {
        assert_eq!(
            status(TbmError::ResetWhileActive("A1".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status(TbmError::AcknowledgeWhileUnsafe), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        assert_eq!(
            status(TbmError::InvalidOperator("=>".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(TbmError::InvalidId("a b".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn io_error_maps_to_500() {
        let io_err = std::io::Error::other("disk full");
        assert_eq!(
            status(TbmError::Io(io_err)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn foreign_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unavailable_maps_to_503() {
        let err = AppError::unavailable("control loop stopped");
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(TbmError::UnknownInterlock("Z9".into()).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
