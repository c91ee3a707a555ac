//! Handler errors and the generic 500 response of the error boundary.

use std::any::Any;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Body returned for every unhandled failure. Details go to the log only.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors a handler may return instead of a response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    InvalidJson(#[from] JsonRejection),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Failure details attached to a 500 response for the logging middleware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub error: String,
    /// The error's source chain, outermost first, one per line.
    pub stack: String,
}

impl ErrorReport {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let chain: Vec<String> = std::iter::successors(Some(err), |e| e.source())
            .map(ToString::to_string)
            .collect();
        Self {
            error: err.to_string(),
            stack: chain.join("\n"),
        }
    }

    fn respond(self) -> Response {
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
        )
            .into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ErrorReport::from_error(&self).respond()
    }
}

pub(super) fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    };
    ErrorReport {
        stack: format!("panic: {message}"),
        error: message,
    }
    .respond()
}
