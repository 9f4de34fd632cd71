//! HTTP mapping for library errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::CarteirinhaError;

/// Handler error: a [`CarteirinhaError`] rendered as
/// `{"success": false, "error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub CarteirinhaError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<CarteirinhaError> for ApiError {
    fn from(e: CarteirinhaError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(CarteirinhaError::Validation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CarteirinhaError::Validation(_) => StatusCode::BAD_REQUEST,
            CarteirinhaError::NotFound(_) => StatusCode::NOT_FOUND,
            CarteirinhaError::Invariant(_) | CarteirinhaError::MissingBackImage => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CarteirinhaError::ResourceLoad(_) => StatusCode::BAD_GATEWAY,
            CarteirinhaError::Backend(_)
            | CarteirinhaError::Image(_)
            | CarteirinhaError::Io(_)
            | CarteirinhaError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Internal error");
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CarteirinhaError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (CarteirinhaError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CarteirinhaError::Invariant("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CarteirinhaError::MissingBackImage, StatusCode::UNPROCESSABLE_ENTITY),
            (CarteirinhaError::ResourceLoad("x".into()), StatusCode::BAD_GATEWAY),
            (CarteirinhaError::Backend("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
