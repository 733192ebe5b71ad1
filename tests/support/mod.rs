#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use rendition::application::render::{
    Chunk, ComponentFactory, ComponentOutput, HeadAndContent, Propagator, Props, RenderCall,
    RenderContext, RenderDestination, RenderError, RenderInstruction, RenderTemplate, RouteData,
    ShortCircuit, Slots,
};
use serde_json::Value;

/// Writes a fixed sequence of markup chunks, optionally failing afterwards.
pub struct Scripted {
    chunks: Vec<&'static str>,
    fail_with: Option<&'static str>,
    yield_between: bool,
}

impl Scripted {
    pub fn new(chunks: &[&'static str]) -> Self {
        Self {
            chunks: chunks.to_vec(),
            fail_with: None,
            yield_between: false,
        }
    }

    pub fn failing(mut self, message: &'static str) -> Self {
        self.fail_with = Some(message);
        self
    }

    pub fn yielding(mut self) -> Self {
        self.yield_between = true;
        self
    }
}

#[async_trait]
impl RenderTemplate for Scripted {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        for chunk in &self.chunks {
            destination.write(Chunk::html(*chunk))?;
            if self.yield_between {
                tokio::task::yield_now().await;
            }
        }
        match self.fail_with {
            Some(message) => Err(RenderError::component(message)),
            None => Ok(()),
        }
    }
}

/// Writes markup, then a response chunk, then more markup.
pub struct LateRedirect;

#[async_trait]
impl RenderTemplate for LateRedirect {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        destination.write(Chunk::html("<p>before</p>"))?;
        destination.write(Chunk::Response(ShortCircuit::redirect(
            "/elsewhere",
            StatusCode::FOUND,
        )))?;
        destination.write(Chunk::html("<p>after</p>"))
    }
}

/// A head slot surrounded by markup.
pub struct HeadShell;

#[async_trait]
impl RenderTemplate for HeadShell {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        destination.write(Chunk::html("<html><head>"))?;
        destination.write(RenderInstruction::Head.into())?;
        destination.write(Chunk::html("</head><body>Hi</body></html>"))
    }
}

/// Factory that always returns the same template.
pub struct Returns(pub Arc<dyn RenderTemplate>);

impl Returns {
    pub fn template(template: impl RenderTemplate + 'static) -> Arc<Self> {
        Arc::new(Self(Arc::new(template)))
    }
}

#[async_trait]
impl ComponentFactory for Returns {
    async fn call(
        &self,
        _ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::Template(Arc::clone(&self.0)))
    }
}

/// Factory that answers with a redirect instead of a body.
pub struct Redirects;

#[async_trait]
impl ComponentFactory for Redirects {
    async fn call(
        &self,
        _ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::Response(ShortCircuit::redirect(
            "/login",
            StatusCode::FOUND,
        )))
    }
}

/// Factory that returns plain data.
pub struct ReturnsData;

#[async_trait]
impl ComponentFactory for ReturnsData {
    async fn call(
        &self,
        _ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::Data(Value::from(42)))
    }
}

/// Factory that registers head propagators before returning its template.
pub struct WithHead {
    pub fragments: Vec<&'static str>,
}

#[async_trait]
impl ComponentFactory for WithHead {
    async fn call(
        &self,
        ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        for fragment in &self.fragments {
            ctx.register_propagator(Arc::new(HeadFragment(*fragment)));
        }
        Ok(ComponentOutput::template(HeadShell))
    }
}

/// Propagator contributing one fixed head fragment.
pub struct HeadFragment(pub &'static str);

#[async_trait]
impl Propagator for HeadFragment {
    async fn init(&self, _ctx: &Arc<RenderContext>) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::HeadAndContent(HeadAndContent::new(
            self.0,
            ComponentOutput::Data(Value::Null),
        )))
    }
}

/// Page call for a template, attributed to `pages/test`.
pub fn page_call(template: impl RenderTemplate + 'static) -> RenderCall {
    RenderCall::page(Returns::template(template)).with_route(RouteData::new("/test", "pages/test"))
}

/// Nested component call for a template; never receives a doctype.
pub fn component_call(template: impl RenderTemplate + 'static) -> RenderCall {
    RenderCall::component(Returns::template(template))
        .with_route(RouteData::new("/test", "components/test"))
}

pub fn count_doctypes(html: &str) -> usize {
    html.to_ascii_lowercase().matches("<!doctype html").count()
}

/// Factory that wraps its `default` slot in a `<main>` element, with a
/// heading taken from the `title` prop.
pub struct Layout;

#[async_trait]
impl ComponentFactory for Layout {
    async fn call(
        &self,
        _ctx: &Arc<RenderContext>,
        props: &Props,
        slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        let title = props
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let body = slots
            .get("default")
            .cloned()
            .ok_or_else(|| RenderError::component("layout needs a default slot"))?;
        Ok(ComponentOutput::template(Wrapped { title, body }))
    }
}

struct Wrapped {
    title: String,
    body: Arc<dyn RenderTemplate>,
}

#[async_trait]
impl RenderTemplate for Wrapped {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        destination.write(Chunk::html("<main><h1>"))?;
        destination.write(Chunk::text(self.title.as_str()))?;
        destination.write(Chunk::html("</h1>"))?;
        self.body.render(destination).await?;
        destination.write(Chunk::html("</main>"))
    }
}
