//! The HTTP edge's single error shape: an RFC-9457-flavored problem
//! detail, and the one place [`cloudpam_core::error::Kind`] is mapped to
//! an HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use cloudpam_core::error::{Error as CoreError, Kind};
use cloudpam_store::StoreError;

/// `{error, detail}`, matching the response envelope's error shape. The
/// `type`/`title` fields are the RFC-9457 parts the bare envelope doesn't
/// otherwise carry; they're included alongside `error`/`detail` rather than
/// instead of them, so existing clients reading `{error, detail}` keep
/// working.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: &'static str,
    pub title: &'static str,
    pub status: u16,
    pub error: &'static str,
    pub detail: String,
}

impl Problem {
    #[must_use]
    pub fn new(kind: Kind, detail: impl Into<String>) -> Self {
        let (status, error, problem_type, title) = kind_parts(kind);
        Self {
            problem_type,
            title,
            status: status.as_u16(),
            error,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn kind_parts(kind: Kind) -> (StatusCode, &'static str, &'static str, &'static str) {
    match kind {
        Kind::Validation => (StatusCode::BAD_REQUEST, "validation", "about:blank#validation", "Validation failed"),
        Kind::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", "about:blank#unauthenticated", "Authentication required"),
        Kind::Forbidden => (StatusCode::FORBIDDEN, "forbidden", "about:blank#forbidden", "Forbidden"),
        Kind::NotFound => (StatusCode::NOT_FOUND, "not_found", "about:blank#not-found", "Not found"),
        Kind::Conflict => (StatusCode::CONFLICT, "conflict", "about:blank#conflict", "Conflict"),
        Kind::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", "about:blank#rate-limited", "Too many requests"),
        Kind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal", "about:blank#internal", "Internal error"),
    }
}

impl From<CoreError> for Problem {
    fn from(e: CoreError) -> Self {
        if e.kind == Kind::Internal {
            tracing::error!(message = %e.message, "internal error surfaced at the HTTP edge");
        }
        Self::new(e.kind, e.message)
    }
}

impl From<StoreError> for Problem {
    fn from(e: StoreError) -> Self {
        CoreError::from(e).into()
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<T, Problem>;
