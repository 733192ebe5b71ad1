use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request identity, available to handlers and echoed on the response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag each request with a fresh id and echo it as `x-request-id`.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Log each response once its head is ready.
///
/// Error statuses are reported with the [`ErrorReport`] a handler attached.
/// A streamed page is logged before its body has finished rendering, so
/// failures inside the stream show up in the render task's own log line.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let delivery = delivery_param(request.uri().query());
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target: "rendition::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            delivery = delivery.as_deref().unwrap_or("default"),
            elapsed_ms,
            request_id = %request_id,
            "response head sent"
        );
        return response;
    }

    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target: "rendition::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            delivery = delivery.as_deref().unwrap_or("default"),
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            request_id = %request_id,
            "request failed"
        );
    } else {
        warn!(
            target: "rendition::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            delivery = delivery.as_deref().unwrap_or("default"),
            elapsed_ms,
            source,
            detail,
            request_id = %request_id,
            "client request error"
        );
    }

    response
}

fn delivery_param(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "delivery")
        .map(|(_, value)| value.to_string())
}
