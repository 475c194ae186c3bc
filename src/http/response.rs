//! Error responses.
//!
//! # Responsibilities
//! - Map protocol errors to HTTP status codes
//! - Render `{ "error": <category>, "message": <description> }` bodies
//!
//! # Design Decisions
//! - Only the category and message leave the process, never internal state
//! - Chain read failures are 502; the upstream node is at fault

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::quoting::ProtocolError;

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Failure of an API request.
#[derive(Debug)]
pub enum ApiError {
    /// The body did not deserialize into the expected request.
    BadRequest(String),
    Protocol(ProtocolError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Protocol(e) => match e {
                ProtocolError::InvalidAddress(_) | ProtocolError::InvalidHex(_) => {
                    StatusCode::BAD_REQUEST
                }
                ProtocolError::QuoteNotFound(_) => StatusCode::NOT_FOUND,
                ProtocolError::ChainReadFailure { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest(message) => ErrorBody {
                error: "InvalidRequest".to_string(),
                message: message.clone(),
            },
            ApiError::Protocol(e) => ErrorBody {
                error: e.category().to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl From<ProtocolError> for ApiError {
    fn from(e: ProtocolError) -> Self {
        ApiError::Protocol(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.body().message, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.body().message, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
