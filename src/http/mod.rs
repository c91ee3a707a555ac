//! HTTP request layer.
//!
//! Every request is logged on the way in; handler errors and panics are
//! turned into a generic 500 and logged once on the way out. Handlers log
//! their own route, api, and error events through the injected
//! [`LogEmitter`].

mod error;
mod request_log;
mod routes;

use axum::{Router, middleware};
use tower_http::catch_panic::CatchPanicLayer;

use crate::emitter::LogEmitter;

pub use error::{AppError, ErrorReport, INTERNAL_ERROR_MESSAGE};
pub use request_log::request_meta;
pub use routes::{NewUser, routes};

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub emitter: LogEmitter,
}

impl AppState {
    pub fn new(emitter: LogEmitter) -> Self {
        Self { emitter }
    }
}

/// The full application: routes, request logging, and the error boundary.
pub fn router(emitter: LogEmitter) -> Router {
    with_error_boundary(routes(), AppState::new(emitter))
}

/// Wrap `routes` with request logging and the error boundary.
///
/// Requests pass the logging middleware first, so the [`RequestMeta`]
/// extension is available to handlers and failures are reported with the
/// same metadata as the request record.
///
/// [`RequestMeta`]: crate::event::RequestMeta
pub fn with_error_boundary(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_log::log_requests,
        ))
        .with_state(state)
}
