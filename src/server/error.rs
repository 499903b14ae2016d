use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::errors::{CoreError, CoreErrorKind};

/// HTTP face of a [`CoreError`].
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            CoreErrorKind::Invalid => StatusCode::BAD_REQUEST,
            CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
            CoreErrorKind::AlreadyExists | CoreErrorKind::Conflict => StatusCode::CONFLICT,
            CoreErrorKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            CoreErrorKind::Canceled => StatusCode::REQUEST_TIMEOUT,
            CoreErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            CoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CoreError::invalid(format!("invalid request body: {}", rejection.body_text())))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(CoreError::invalid(format!("invalid query string: {}", rejection.body_text())))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(CoreError::invalid(format!("invalid path parameter: {}", rejection.body_text())))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let err = self.0;

        let message = match err.kind() {
            CoreErrorKind::Internal => {
                error!(error = ?err, source = ?std::error::Error::source(&err), "internal error");
                "internal server error".to_string()
            }
            CoreErrorKind::Unavailable => {
                warn!(error = ?err, source = ?std::error::Error::source(&err), "dependency unavailable");
                err.message().to_string()
            }
            _ => err.message().to_string(),
        };

        let body = json!({
            "error": err.kind().code(),
            "message": message,
            "fields": err.fields(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::invalid("x"), StatusCode::BAD_REQUEST),
            (CoreError::not_found("registered_model", "id"), StatusCode::NOT_FOUND),
            (CoreError::already_exists("x"), StatusCode::CONFLICT),
            (CoreError::conflict("x"), StatusCode::CONFLICT),
            (CoreError::precondition_failed("x"), StatusCode::PRECONDITION_FAILED),
            (CoreError::unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
            (CoreError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_message_is_redacted() {
        let response = ApiError(CoreError::internal("connection string leaked")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal");
        assert_eq!(body["message"], "internal server error");
    }
}
