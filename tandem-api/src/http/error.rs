// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert tandem_core errors to HTTP errors
impl From<tandem_core::Error> for AppError {
    fn from(err: tandem_core::Error) -> Self {
        use tandem_core::Error;

        match &err {
            Error::RoomNotFound(_) | Error::PeerNotFound(_) | Error::TransportNotFound(_) => {
                Self::not_found(err.to_string())
            }
            Error::RoomFull(_)
            | Error::AlreadyMember(_)
            | Error::CannotConsume(_)
            | Error::RouterNotReady(_) => Self::conflict(err.to_string()),
            Error::NotInRoom(_) => Self::forbidden(err.to_string()),
            Error::Relay(e) => {
                tracing::error!("Relay error: {}", e);
                Self::bad_gateway("Media relay unavailable")
            }
            Error::TranslationUnavailable(e) => {
                tracing::error!("Translation error: {}", e);
                Self::internal_server_error("Translation unavailable")
            }
        }
    }
}
