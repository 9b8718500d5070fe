// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The uniform JSON response envelope and the error-kind to HTTP status
//! mapping.
//!
//! Every response is `{success, data | error, warnings[]}`; errors carry
//! the stable taxonomy tag plus a human-readable string.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tidings_core::TidingsError;

/// Error payload within the envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Stable taxonomy tag (see the error kinds).
    pub kind: String,
    pub message: String,
}

/// The uniform response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// A successful response.
pub fn ok<T: Serialize>(data: T) -> Response {
    ok_with_warnings(data, Vec::new())
}

/// A successful response carrying degradation warnings.
pub fn ok_with_warnings<T: Serialize>(data: T, warnings: Vec<String>) -> Response {
    Json(Envelope {
        success: true,
        data: Some(data),
        error: None,
        warnings,
    })
    .into_response()
}

/// An error response with the taxonomy-mapped status code.
pub fn fail(error: &TidingsError) -> Response {
    let payload = Envelope::<()> {
        success: false,
        data: None,
        error: Some(ApiError {
            kind: error.kind().to_string(),
            message: user_facing_message(error),
        }),
        warnings: Vec::new(),
    };
    (status_for(error), Json(payload)).into_response()
}

/// Maps error kinds onto HTTP statuses.
fn status_for(error: &TidingsError) -> StatusCode {
    match error {
        TidingsError::Config(_) | TidingsError::ContextOverflow(_) => StatusCode::BAD_REQUEST,
        TidingsError::NotFound { .. } => StatusCode::NOT_FOUND,
        TidingsError::SessionBusy { .. } | TidingsError::BusyRetry { .. } => {
            StatusCode::TOO_MANY_REQUESTS
        }
        TidingsError::ProviderRateLimited { .. }
        | TidingsError::StoreUnavailable { .. }
        | TidingsError::IndexUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TidingsError::ProviderUnavailable { .. }
        | TidingsError::InvalidResponse { .. }
        | TidingsError::UnstructuredOutput(_) => StatusCode::BAD_GATEWAY,
        TidingsError::DeadlineExceeded { .. } | TidingsError::Cancelled => {
            StatusCode::GATEWAY_TIMEOUT
        }
        TidingsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Internal errors never leak their detail to users.
fn user_facing_message(error: &TidingsError) -> String {
    match error {
        TidingsError::Internal(_) => "internal error".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases: Vec<(TidingsError, StatusCode)> = vec![
            (TidingsError::Config("bad".into()), StatusCode::BAD_REQUEST),
            (
                TidingsError::NotFound {
                    entity: "run",
                    id: "r".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                TidingsError::BusyRetry { user_id: "u".into() },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                TidingsError::SessionBusy {
                    session_id: "s".into(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                TidingsError::ProviderUnavailable {
                    provider: "p".into(),
                    message: "m".into(),
                    source: None,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                TidingsError::StoreUnavailable {
                    source: Box::new(std::io::Error::other("down")),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                TidingsError::DeadlineExceeded { seconds: 300 },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                TidingsError::Internal("secret detail".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(status_for(&error), status, "{}", error.kind());
        }
    }

    #[test]
    fn internal_detail_is_not_user_facing() {
        let message = user_facing_message(&TidingsError::Internal("stack trace".into()));
        assert_eq!(message, "internal error");
    }
}
