//! Request metadata extraction and the request logging middleware.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::event::{LogEvent, RequestMeta};

use super::{AppState, error::ErrorReport};

/// Correlation metadata for `request`: method, path with query, peer IP
/// (when served with connect info), and user agent.
pub fn request_meta(request: &Request) -> RequestMeta {
    let url = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), |pq| pq.as_str().to_owned());
    let mut meta = RequestMeta::new(request.method().as_str(), url);
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        meta = meta.with_ip(addr.ip().to_string());
    }
    if let Some(agent) = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
    {
        meta = meta.with_user_agent(agent);
    }
    meta
}

pub(super) async fn log_requests(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let meta = request_meta(&request);
    state.emitter.log(LogEvent::request(&meta));
    request.extensions_mut().insert(meta.clone());

    let response = next.run(request).await;
    if let Some(report) = response.extensions().get::<ErrorReport>() {
        state
            .emitter
            .log(LogEvent::unhandled_error(&meta, &report.error, &report.stack));
    }
    response
}
