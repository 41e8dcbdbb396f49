//! Domain errors rendered as HTTP responses.
//!
//! Every failure a handler returns, including a body that does not decode,
//! reaches the caller as the JSON form of [`Error`] with a status derived
//! from its code. Internal errors are logged in full and sent redacted.

use actix_web::error::JsonPayloadError;
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const REDACTED_MESSAGE: &str = "Internal server error";

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UnprocessableSchedule => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if let Some(trace_id) = self.trace_id() {
            response.insert_header((TRACE_ID_HEADER, trace_id.to_owned()));
        }
        if self.code() != ErrorCode::InternalError {
            return response.json(self);
        }

        error!(message = %self.message(), trace_id = ?self.trace_id(), "internal error");
        let redacted = match self.trace_id() {
            Some(trace_id) => Error::internal(REDACTED_MESSAGE).with_trace_id(trace_id),
            None => Error::internal(REDACTED_MESSAGE),
        };
        response.json(redacted)
    }
}

/// Map a rejected JSON body onto an `invalid_request` error.
fn reject_payload(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!(path = %req.path(), error = %err, "request body rejected");
    let reason = match &err {
        JsonPayloadError::ContentType => "content_type",
        JsonPayloadError::Deserialize(_) => "malformed_json",
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            "too_large"
        }
        _ => "unreadable",
    };
    Error::invalid_request(err.to_string())
        .with_details(json!({ "reason": reason }))
        .into()
}

/// JSON extractor settings shared by every handler.
///
/// Decode failures surface in the same shape as domain errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(reject_payload)
}

#[cfg(test)]
mod tests;
