use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// `Error` rendered as `{ok: false, error, ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            Error::InvalidInput { field, reason } => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "error": "invalid input", "field": field, "reason": reason }),
            ),
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "ok": false, "error": "unauthorized" }),
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "ok": false, "error": "not found" }),
            ),
            Error::Conflict(msg) => (
                StatusCode::CONFLICT,
                json!({ "ok": false, "error": msg }),
            ),
            Error::Unavailable(msg) => {
                error!(%msg, "data store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "ok": false, "error": "data store unavailable" }),
                )
            }
            other => {
                error!(err = ?other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": "internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "ok": true, "data": data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let cases = [
            (Error::invalid("title", "required"), StatusCode::BAD_REQUEST),
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::Conflict("dup".into()), StatusCode::CONFLICT),
            (Error::Unavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
