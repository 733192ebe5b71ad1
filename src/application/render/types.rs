use std::fmt;

use axum::{
    http::{HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Identifies the route being rendered so failures can point at its component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteData {
    /// Public route pattern, e.g. `/hello/{name}`.
    pub route: String,
    /// Component identity used as the diagnostic location.
    pub component: String,
}

impl RouteData {
    pub fn new(route: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            component: component.into(),
        }
    }
}

/// Out-of-band terminal response produced by a component instead of content.
pub struct ShortCircuit {
    response: Response,
}

impl ShortCircuit {
    pub fn from_response(response: Response) -> Self {
        Self { response }
    }

    /// Redirect to `location`. Non-redirect statuses fall back to `302 Found`.
    pub fn redirect(location: &str, status: StatusCode) -> Self {
        let status = if status.is_redirection() {
            status
        } else {
            StatusCode::FOUND
        };
        let mut response = status.into_response();
        match HeaderValue::from_str(location) {
            Ok(value) => {
                response.headers_mut().insert(LOCATION, value);
            }
            Err(err) => {
                warn!(location = ?location, error = %err, "redirect target is not a valid header value; sending without Location");
            }
        }
        Self { response }
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn location(&self) -> Option<&str> {
        self.response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

impl fmt::Debug for ShortCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortCircuit")
            .field("status", &self.status())
            .field("location", &self.location())
            .finish()
    }
}

impl IntoResponse for ShortCircuit {
    fn into_response(self) -> Response {
        self.response
    }
}

/// Result of driving an entry component through one of the delivery adapters.
#[derive(Debug)]
pub enum RenderOutcome<T> {
    /// The entry component short-circuited; nothing was rendered.
    Response(ShortCircuit),
    /// Rendered output in the adapter's protocol.
    Body(T),
}

impl<T> RenderOutcome<T> {
    pub fn into_body(self) -> Option<T> {
        match self {
            RenderOutcome::Body(body) => Some(body),
            RenderOutcome::Response(_) => None,
        }
    }

    pub fn into_response(self) -> Option<ShortCircuit> {
        match self {
            RenderOutcome::Response(response) => Some(response),
            RenderOutcome::Body(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderErrorKind {
    #[error(
        "route `{route}` returned {returned}; only a rendered template or a response may be returned"
    )]
    NotRenderable {
        route: String,
        returned: &'static str,
    },
    #[error("a response was sent after streaming had already begun")]
    ResponseAfterStreaming,
    #[error("component failed to render: {message}")]
    Component { message: String },
    #[error("render task aborted: {message}")]
    Aborted { message: String },
}

/// Failure surfaced by rendering. Carries a kind plus the component file it
/// was attributed to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct RenderError {
    kind: RenderErrorKind,
    location: Option<String>,
}

impl RenderError {
    pub fn new(kind: RenderErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn component(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Component {
            message: message.into(),
        })
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Aborted {
            message: message.into(),
        })
    }

    pub fn response_after_streaming() -> Self {
        Self::new(RenderErrorKind::ResponseAfterStreaming)
    }

    pub fn kind(&self) -> &RenderErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, file: impl Into<String>) {
        self.location = Some(file.into());
    }

    pub fn with_location(mut self, file: impl Into<String>) -> Self {
        self.set_location(file);
        self
    }

    /// Attribute the error to the route's component unless it already names one.
    pub fn locate(mut self, route: Option<&RouteData>) -> Self {
        self.location = self
            .location
            .or_else(|| route.map(|route| route.component.clone()));
        self
    }
}

impl From<askama::Error> for RenderError {
    fn from(error: askama::Error) -> Self {
        Self::component(error.to_string())
    }
}
