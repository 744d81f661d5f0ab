use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Terminal, user-visible outcomes of the redemption and session paths.
///
/// None of these are retried at the application layer; only the initial store
/// connection (see `db::connect_with_retry`) retries before surfacing
/// `StoreUnavailable`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid code format")]
    FormatInvalid,

    #[error("Unknown access code")]
    CodeNotFound,

    #[error("This code has already been activated")]
    CodeAlreadyUsed,

    #[error("This code has expired")]
    CodeExpired,

    #[error("Invalid or expired token")]
    TokenInvalid(#[from] jsonwebtoken::errors::Error),

    #[error("No active session")]
    SessionInvalid,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Bad request: {0}")]
    MalformedRequest(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable discriminator carried alongside the human message.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            AppError::FormatInvalid => Some("invalid_format"),
            AppError::CodeNotFound => Some("code_not_found"),
            AppError::CodeAlreadyUsed => Some("code_already_used"),
            AppError::CodeExpired => Some("code_expired"),
            AppError::TokenInvalid(_) => Some("invalid_token"),
            AppError::SessionInvalid => Some("session_invalid"),
            AppError::SessionExpired => Some("session_expired"),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreUnavailable(anyhow::Error::new(err))
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            reason: Option<&'static str>,
        }

        let reason = self.reason();
        let (status, error_message) = match &self {
            AppError::FormatInvalid
            | AppError::CodeNotFound
            | AppError::CodeAlreadyUsed
            | AppError::CodeExpired
            | AppError::SessionInvalid
            | AppError::SessionExpired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::TokenInvalid(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            AppError::MalformedRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StoreUnavailable(err) => {
                tracing::error!(error = %err, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Store unavailable".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                reason,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_unauthorized() {
        for err in [
            AppError::FormatInvalid,
            AppError::CodeNotFound,
            AppError::CodeAlreadyUsed,
            AppError::CodeExpired,
            AppError::SessionInvalid,
            AppError::SessionExpired,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn malformed_request_maps_to_bad_request() {
        let response =
            AppError::MalformedRequest("Missing required fields".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failure_maps_to_internal_error() {
        let response =
            AppError::StoreUnavailable(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
