use axum::{
    response::{IntoResponse, Response},
    Json,
};
use greenlight_types::ValidationErrors;
use http::StatusCode;
use serde::Serialize;
use tracing::{debug, error, warn};

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

pub const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
pub const EDIT_CONFLICT_MESSAGE: &str =
    "unable to update the record due to an edit conflict, please try again";
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("failed validation")]
    Validation(ValidationErrors),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    EditConflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::EditConflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Same as `From<dal::Error>`, but a missing record is the client's fault.
    ///
    /// Used on the update path, where the id was already accepted once.
    pub fn missing_as_bad_request(error: greenlight_dal::Error) -> Self {
        match error {
            greenlight_dal::Error::RecordNotFound(what) => {
                ApiError::BadRequest(format!("{what} does not exist"))
            }
            other => other.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {self}");
        } else if status == StatusCode::CONFLICT {
            warn!(status = status.as_u16(), "Conflict: {self}");
        } else {
            debug!(status = status.as_u16(), "Client error: {self}");
        }

        let message = self.to_string();
        let errors = match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        };
        (status, Json(ErrorBody { message, errors })).into_response()
    }
}

impl From<greenlight_dal::Error> for ApiError {
    fn from(error: greenlight_dal::Error) -> Self {
        match error {
            greenlight_dal::Error::RecordNotFound(_) => {
                ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())
            }
            greenlight_dal::Error::EditConflict { .. } => {
                ApiError::EditConflict(EDIT_CONFLICT_MESSAGE.to_string())
            }
            other => {
                error!(error = %other, "Store operation failed");
                ApiError::Unavailable(SERVER_ERROR_MESSAGE.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        let errors = report
            .iter()
            .map(|(path, error)| (path.to_string(), error.message().to_string()))
            .collect();
        ApiError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::to_bytes;
    use greenlight_dal::Error;
    use serde_json::{json, Value};

    use super::*;

    async fn body_json(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let mut errors = ValidationErrors::new();
        errors.insert("title".to_string(), "must be provided".to_string());
        let (status, body) = body_json(errors.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"message": "failed validation", "errors": {"title": "must be provided"}})
        );
    }

    #[tokio::test]
    async fn test_plain_envelope_has_no_errors() {
        let (status, body) = body_json(ApiError::RateLimitExceeded).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, json!({"message": "rate limit exceeded"}));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_store_failure_is_hidden() {
        let error: ApiError = Error::DatabaseError(sqlx_error()).into();
        let (status, body) = body_json(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], SERVER_ERROR_MESSAGE);
        assert!(logs_contain("Store operation failed"));
    }

    fn sqlx_error() -> greenlight_dal::SqlxError {
        greenlight_dal::SqlxError::PoolTimedOut
    }

    #[test]
    fn test_dal_mapping() {
        let e: ApiError = Error::RecordNotFound("Movie 1".into()).into();
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);

        let e: ApiError = Error::EditConflict { id: 1, version: 1 }.into();
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        assert_eq!(e.to_string(), EDIT_CONFLICT_MESSAGE);

        let e: ApiError = Error::Timeout(Duration::from_secs(3)).into();
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let e = ApiError::missing_as_bad_request(Error::RecordNotFound("Movie 7".into()));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "Movie 7 does not exist");

        let e = ApiError::missing_as_bad_request(Error::EditConflict { id: 1, version: 2 });
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
    }
}
