//! Transport-agnostic error taxonomy plus its Rocket mapping.
//!
//! `core::*` only ever returns `CoreError`. Nothing under `core/` knows
//! about HTTP status codes or WebSocket close frames; `routes::*` is the
//! only place that translates a `CoreError` into a transport response,
//! via the `Responder` impl below for HTTP and `CoreError::ws_error_frame`
//! for the realtime session.

use rocket::http::{Header, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("second factor required")]
    OtpRequired,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("history pruned")]
    HistoryPruned,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("internal: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "bad_request",
            CoreError::Unauthorized => "unauthorized",
            CoreError::OtpRequired => "otp_required",
            CoreError::Forbidden => "forbidden",
            CoreError::NotFound => "not_found",
            CoreError::Conflict(_) => "conflict",
            CoreError::HistoryPruned => "history_pruned",
            CoreError::PayloadTooLarge => "payload_too_large",
            CoreError::RateLimited { .. } => "rate_limited",
            CoreError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            CoreError::BadRequest(_) => Status::BadRequest,
            CoreError::Unauthorized | CoreError::OtpRequired => Status::Unauthorized,
            CoreError::Forbidden => Status::Forbidden,
            CoreError::NotFound => Status::NotFound,
            CoreError::Conflict(_) => Status::Conflict,
            CoreError::HistoryPruned => Status::new(410),
            CoreError::PayloadTooLarge => Status::PayloadTooLarge,
            CoreError::RateLimited { .. } => Status::TooManyRequests,
            CoreError::Internal(_) => Status::InternalServerError,
        }
    }

    /// The `{type:"error", ...}` frame sent over a WebSocket session.
    pub fn ws_error_frame(&self) -> serde_json::Value {
        json!({"type": "error", "code": self.code(), "message": self.to_string()})
    }
}

impl<'r> Responder<'r, 'static> for CoreError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let body = Json(json!({"error": {"code": self.code(), "message": self.to_string()}}));
        let mut builder = Response::build_from(body.respond_to(req)?);
        builder.status(self.status());
        if let CoreError::RateLimited { retry_after_secs } = self {
            builder.header(Header::new("Retry-After", retry_after_secs.to_string()));
        }
        builder.ok()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
