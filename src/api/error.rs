//! HTTP error mapping
//!
//! The error taxonomy of the API: validation failures answer 400 with a
//! field → message map, missing entities 404, anything the store or an
//! upstream service throws becomes a 500 carrying the error string.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;
use crate::validation::FieldErrors;

/// Error type returned by the route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation: `{"errors": {field: message}}`.
    Validation(FieldErrors),

    /// Malformed request (missing body field, bad identifier).
    BadRequest(String),

    /// The requested individual does not exist in the store.
    NotFound(String),

    /// Store or upstream failure.
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            Self::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            Self::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg })))
                    .into_response()
            }
        }
    }
}

/// Result alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Reject the request when the validator reported field errors.
pub fn ensure_valid(errors: FieldErrors) -> ApiResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_validation_maps_to_400() {
        let mut errors = FieldErrors::new();
        errors.insert("nom".into(), "Nom est requis".into());
        let response = ApiError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::not_found("Université non trouvée").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_error_maps_to_500() {
        let err: ApiError = StoreError::Status {
            status: 503,
            body: "down".into(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ensure_valid_passes_empty_map() {
        assert!(ensure_valid(FieldErrors::new()).is_ok());
    }
}
