// crates/compliance-server/src/error.rs
// ============================================================================
// Module: Ingestion Server Errors
// Description: Maps Auth Core, Ingestion Store, and request-validation
//              failures to HTTP status codes and a non-leaking JSON body.
// Purpose: One `IntoResponse` impl so handlers can use `?` throughout
//          instead of hand-building error responses.
// Dependencies: axum, compliance-auth, compliance-store, thiserror
// ============================================================================

//! ## Overview
//! Per §7, auth errors surface as HTTP status with a body of
//! `{error, message}` and never echo credentials or JWTs. `account_locked`
//! is 403; `token_reused` (`AuthError::RefreshTokenInvalid` after the
//! replay path already revoked the family) and every other auth failure is
//! 401. Storage and unexpected failures are 500.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use compliance_auth::AuthError;
use compliance_store::StoreError;
use serde::Serialize;

/// Failures an HTTP handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No credential was presented by any of the three auth paths.
    #[error("authentication required")]
    Unauthenticated,
    /// A credential was presented but does not satisfy the endpoint's
    /// required permission.
    #[error("insufficient permission")]
    Forbidden,
    /// The request body failed schema or business-rule validation.
    #[error("invalid request: {0}")]
    Validation(String),
    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,
    /// An Auth Core failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// An Ingestion Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The wire shape of every error response: `{error, message}`, never a
/// credential or token value.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            Self::Auth(AuthError::InvalidCredentials) => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            Self::Auth(AuthError::AccountLocked { .. }) => (StatusCode::FORBIDDEN, "account_locked"),
            Self::Auth(AuthError::InvalidToken(_)) => (StatusCode::UNAUTHORIZED, "token_invalid_signature"),
            Self::Auth(AuthError::StaleJwtVersion) => (StatusCode::UNAUTHORIZED, "jwt_version_mismatch"),
            Self::Auth(AuthError::TokenBlacklisted) => (StatusCode::UNAUTHORIZED, "token_blacklisted"),
            Self::Auth(AuthError::UnknownRefreshToken | AuthError::RefreshTokenInvalid) => (StatusCode::UNAUTHORIZED, "token_reused"),
            Self::Auth(AuthError::UnknownSubject) => (StatusCode::UNAUTHORIZED, "token_invalid_signature"),
            Self::Auth(AuthError::Store(_) | AuthError::Hash(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "io_failed"),
            Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_failed"),
        };
        let message = match &self {
            Self::Auth(AuthError::Store(_) | AuthError::Hash(_)) | Self::Store(_) => "internal error".to_owned(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: code, message })).into_response()
    }
}
