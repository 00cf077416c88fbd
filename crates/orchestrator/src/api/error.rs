//! HTTP mapping for domain errors.
//!
//! Every mutating endpoint computes a trace id up front; failures return
//! the `{error_code, message, trace_id, retryable}` envelope with the
//! status below and log the trace id.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use codial_domain::error::{Error, ErrorEnvelope};

pub struct ApiError {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl ApiError {
    pub fn new(err: &Error, trace_id: &str) -> Self {
        let status = match err {
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::SessionNotFound(_) | Error::TurnNotFound(_) | Error::SubagentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::SessionEnded(_) => StatusCode::CONFLICT,
            Error::ProviderNotEnabled(_) | Error::IndexOutOfRange(_) => StatusCode::BAD_REQUEST,
            Error::QueueFull | Error::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(
            trace_id,
            error_code = err.wire_code(),
            status = status.as_u16(),
            error = %err,
            "request failed"
        );
        Self {
            status,
            envelope: ErrorEnvelope::new(err, trace_id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_for(err: Error) -> StatusCode {
        ApiError::new(&err, "t").status
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(status_for(Error::SessionNotFound("s".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(Error::SessionEnded("s".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(Error::ProviderNotEnabled("p".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(Error::SubagentNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(Error::QueueFull), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(Error::IndexOutOfRange(9)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
