use std::str::FromStr;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, Uri, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{error::HttpError, render::DeliveryMode},
    config::RenderSettings,
    presentation::site,
};

use super::middleware::{log_responses, set_request_context};

const SOURCE: &str = "infra::http::public";

const SITE_CSS: &str = "body{font-family:system-ui,sans-serif;margin:2rem auto;max-width:40rem}\
footer{color:#666;margin-top:2rem}";

#[derive(Clone)]
pub struct HttpState {
    pub render: RenderSettings,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/_health", get(health))
        .route("/static/site.css", get(stylesheet))
        .route("/", get(render_route))
        .route("/{*path}", get(render_route))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeliveryQuery {
    delivery: Option<String>,
}

async fn render_route(
    State(state): State<HttpState>,
    Query(query): Query<DeliveryQuery>,
    uri: Uri,
) -> Response {
    let mode = match query.delivery.as_deref().map(DeliveryMode::from_str) {
        None => state.render.delivery,
        Some(Ok(mode)) => mode,
        Some(Err(reason)) => {
            return HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Unknown delivery mode",
                reason,
            )
            .into_response();
        }
    };

    let route = site::resolve(uri.path());
    match site::respond(route, &state.render, mode).await {
        Ok(response) => response,
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn stylesheet() -> Response {
    ([(CONTENT_TYPE, "text/css; charset=utf-8")], SITE_CSS).into_response()
}
