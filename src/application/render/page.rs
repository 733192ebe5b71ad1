use std::{fmt, str::FromStr, sync::Arc};

use axum::{
    body::{Body, HttpBody},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument};

use super::{
    component::RenderCall,
    context::RenderContext,
    iterable::render_to_async_iterable,
    stream::render_to_readable_stream,
    string::render_to_string,
    types::{RenderError, RenderOutcome},
};

pub(crate) const METRIC_RENDER_TOTAL: &str = "rendition_render_total";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Which adapter produces the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DeliveryMode {
    /// Render fully, then send one body.
    String,
    /// Stream chunks as the tree writes them.
    #[default]
    Stream,
    /// Stream merged chunks as the body pulls them.
    Iterable,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::String => "string",
            DeliveryMode::Stream => "stream",
            DeliveryMode::Iterable => "iterable",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(DeliveryMode::String),
            "stream" => Ok(DeliveryMode::Stream),
            "iterable" => Ok(DeliveryMode::Iterable),
            other => Err(format!(
                "unknown delivery mode `{other}` (expected string, stream, or iterable)"
            )),
        }
    }
}

/// Render a page into an HTTP response using the requested delivery mode.
///
/// A short-circuit response from the entry component is returned untouched.
/// Failures after a streamed body has started surface as a body error.
#[instrument(skip_all, fields(mode = %mode))]
pub async fn render_page(
    ctx: Arc<RenderContext>,
    call: RenderCall,
    mode: DeliveryMode,
    status: StatusCode,
) -> Result<Response, RenderError> {
    let result = match mode {
        DeliveryMode::String => render_to_string(ctx, call)
            .await
            .map(|outcome| map_body(outcome, Body::from)),
        DeliveryMode::Stream => render_to_readable_stream(ctx, call)
            .await
            .map(|outcome| map_body(outcome, Body::from_stream)),
        DeliveryMode::Iterable => render_to_async_iterable(ctx, call)
            .await
            .map(|outcome| {
                map_body(outcome, |iterable| Body::from_stream(iterable.into_stream()))
            }),
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            counter!(METRIC_RENDER_TOTAL, "mode" => mode.as_str(), "outcome" => "error")
                .increment(1);
            return Err(err);
        }
    };

    match outcome {
        RenderOutcome::Response(response) => {
            debug!(status = response.status().as_u16(), "entry component short-circuited");
            counter!(METRIC_RENDER_TOTAL, "mode" => mode.as_str(), "outcome" => "response")
                .increment(1);
            Ok(response.into_response())
        }
        RenderOutcome::Body(body) => {
            counter!(METRIC_RENDER_TOTAL, "mode" => mode.as_str(), "outcome" => body_outcome(mode))
                .increment(1);
            Ok(html_response(body, status))
        }
    }
}

/// A string body is complete once it exists; a streamed one has only begun.
/// Streamed failures are counted as `failed` by the render task itself.
fn body_outcome(mode: DeliveryMode) -> &'static str {
    match mode {
        DeliveryMode::String => "body",
        DeliveryMode::Stream | DeliveryMode::Iterable => "started",
    }
}

fn map_body<T>(outcome: RenderOutcome<T>, to_body: impl FnOnce(T) -> Body) -> RenderOutcome<Body> {
    match outcome {
        RenderOutcome::Response(response) => RenderOutcome::Response(response),
        RenderOutcome::Body(body) => RenderOutcome::Body(to_body(body)),
    }
}

fn html_response(body: Body, status: StatusCode) -> Response {
    let length = body.size_hint().exact();
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    if let Some(length) = length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    response
}
