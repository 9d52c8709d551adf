use actix_web::{error, http::StatusCode, HttpRequest, HttpResponse};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::services::error::{AuthErrorCode, BackendError};
use crate::services::tracker::TrackerError;

/// Everything a handler can fail with, rendered as an [`ErrorResponse`]
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { error: &'static str, message: String },

    #[error("Missing or malformed bearer token")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl ApiError {
    pub fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            error,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { error, .. } => error,
            ApiError::Unauthorized => AuthErrorCode::InvalidToken.as_str(),
            ApiError::NotFound(_) => "not_found",
            ApiError::Backend(err) => err.code(),
            ApiError::Tracker(err) => match err {
                TrackerError::Backend(inner) => inner.code(),
                TrackerError::Validation(_) => "validation_failed",
                TrackerError::ProfileLoad => "profile_load_failed",
                TrackerError::Crypto(_) => "profile_save_failed",
                TrackerError::NotFound(_) | TrackerError::UnknownCollege(_) => "not_found",
                TrackerError::InvalidInput(_) => "invalid_input",
                TrackerError::Serialization(_) => "internal",
            },
        }
    }

    /// Message safe to show to the end user
    fn public_message(&self) -> String {
        match self {
            ApiError::Backend(err) | ApiError::Tracker(TrackerError::Backend(err)) => match err {
                BackendError::NotFound(_) => "Not found".to_string(),
                other => other.user_message().to_string(),
            },
            ApiError::Tracker(TrackerError::Crypto(_)) => "Failed to save profile data".to_string(),
            ApiError::Tracker(TrackerError::Serialization(_)) => {
                "An error occurred. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

fn backend_status(err: &BackendError) -> StatusCode {
    match err {
        BackendError::Auth(code) => match code {
            AuthErrorCode::InvalidEmail | AuthErrorCode::WeakPassword => StatusCode::BAD_REQUEST,
            AuthErrorCode::EmailAlreadyInUse => StatusCode::CONFLICT,
            AuthErrorCode::InvalidCredential
            | AuthErrorCode::UserNotFound
            | AuthErrorCode::WrongPassword
            | AuthErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthErrorCode::RequiresRecentLogin => StatusCode::FORBIDDEN,
        },
        BackendError::Token(_) => StatusCode::UNAUTHORIZED,
        BackendError::NotFound(_) => StatusCode::NOT_FOUND,
        BackendError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        BackendError::Request(_) => StatusCode::BAD_GATEWAY,
        BackendError::Api { .. }
        | BackendError::InvalidResponse(_)
        | BackendError::Serialization(_)
        | BackendError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Backend(err) => backend_status(err),
            ApiError::Tracker(err) => match err {
                TrackerError::Backend(inner) => backend_status(inner),
                TrackerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TrackerError::NotFound(_) | TrackerError::UnknownCollege(_) => StatusCode::NOT_FOUND,
                TrackerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                TrackerError::ProfileLoad | TrackerError::Crypto(_) | TrackerError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.error_code().to_string(),
            message: self.public_message(),
            status_code: status.as_u16(),
        })
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::bad_request("invalid_json", format!("Invalid JSON: {}", err)).into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request("invalid_query", format!("Invalid query: {}", err)).into()
}

/// Handle path segment errors
pub fn handle_path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request("invalid_path", format!("Invalid path: {}", err)).into()
}
