//! Error-to-response mapping for the RPC surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::master::{MasterError, Status};

use super::types::ErrorBody;

/// Wrapper that turns a [`MasterError`] into an HTTP response.
///
/// The body always carries the stable numeric status code; the HTTP status
/// is a coarse mapping for generic clients.
#[derive(Debug)]
pub struct RpcError(pub MasterError);

impl From<MasterError> for RpcError {
    fn from(e: MasterError) -> Self {
        Self(e)
    }
}

impl RpcError {
    fn http_status(&self) -> StatusCode {
        match self.0.status() {
            Status::Ok => StatusCode::OK,
            Status::TableDoesntExist | Status::ObjectDoesntExist => StatusCode::NOT_FOUND,
            Status::ObjectExists => StatusCode::CONFLICT,
            Status::WrongVersion => StatusCode::PRECONDITION_FAILED,
            Status::SegmentRecoveryFailed | Status::TransportError => StatusCode::BAD_GATEWAY,
            Status::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let body = ErrorBody {
            status: status.code(),
            code: status.as_str().to_string(),
            message: self.0.to_string(),
            version: self.0.version(),
        };
        (self.http_status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::VERSION_NONEXISTENT;

    #[test]
    fn test_http_mapping() {
        assert_eq!(
            RpcError(MasterError::TableDoesntExist { table_id: 4 }).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RpcError(MasterError::WrongVersion { version: 1 }).http_status(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            RpcError(MasterError::ObjectExists { version: 1 }).http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RpcError(MasterError::SegmentRecoveryFailed { segment_id: 88 }).http_status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_reject_error_body_carries_version() {
        let error = RpcError(MasterError::ObjectDoesntExist {
            version: VERSION_NONEXISTENT,
        });
        assert_eq!(error.0.status().code(), 2);
        assert_eq!(error.0.version(), Some(VERSION_NONEXISTENT));
    }
}
