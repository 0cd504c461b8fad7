//! Request extractors whose rejections answer with the `HandlerError` body.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use tracing::debug;

use crate::util::error::{HandlerError, HandlerErrorKind};

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(HandlerError))]
pub struct Json<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(HandlerError))]
pub struct Query<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(HandlerError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for HandlerError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected JSON body: {}", rejection.body_text());
        match rejection {
            JsonRejection::JsonDataError(e) => {
                HandlerError::new(HandlerErrorKind::Validation, "Validation error").with_details(e.body_text())
            }
            JsonRejection::JsonSyntaxError(e) => {
                HandlerError::bad_request("Malformed JSON body").with_details(e.body_text())
            }
            JsonRejection::MissingJsonContentType(_) => {
                HandlerError::bad_request("Expected a request with Content-Type: application/json")
            }
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                HandlerError::new(HandlerErrorKind::PayloadTooLarge, "Request body is too large")
            }
            other => HandlerError::bad_request("Invalid request body").with_details(other.body_text()),
        }
    }
}

impl From<QueryRejection> for HandlerError {
    fn from(rejection: QueryRejection) -> Self {
        HandlerError::bad_request("Invalid query string").with_details(rejection.body_text())
    }
}

impl From<PathRejection> for HandlerError {
    fn from(rejection: PathRejection) -> Self {
        HandlerError::bad_request("Invalid path parameter").with_details(rejection.body_text())
    }
}
