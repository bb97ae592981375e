use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kaizen_core::error::{ErrorKind, KaizenError};

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(KaizenError::Validation(msg.into()).into())
    }

    /// Construct a 403 error for a request that names no acting employee.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self(KaizenError::Unauthorized(msg.into()).into())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self
            .0
            .downcast_ref::<KaizenError>()
            .map(KaizenError::kind)
            .unwrap_or(ErrorKind::Internal);
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }

        let body = serde_json::json!({
            "error": self.0.to_string(),
            "kind": kind.as_str(),
        });
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
