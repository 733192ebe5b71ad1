//! Building blocks shared by the site's pages.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use serde_json::Value;

use crate::application::render::{
    Chunk, ComponentOutput, HeadAndContent, Propagator, RenderContext, RenderDestination,
    RenderError, RenderInstruction, RenderTemplate,
};

const BOOT_SCRIPT_ID: &str = "rendition:boot";
const BOOT_SCRIPT: &str = "document.documentElement.dataset.rendered=\"1\"";

/// Renders an askama template as a single markup chunk.
pub struct Markup<T>(pub T);

#[async_trait]
impl<T> RenderTemplate for Markup<T>
where
    T: Template + Send + Sync,
{
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        destination.write(Chunk::Html(self.0.render()?))
    }
}

/// Renders each child in order.
pub struct Fragment(pub Vec<Arc<dyn RenderTemplate>>);

#[async_trait]
impl RenderTemplate for Fragment {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        for child in &self.0 {
            child.render(destination).await?;
        }
        Ok(())
    }
}

/// Document shell. The head is filled from fragments hoisted by the head
/// pass; the body template renders in between.
pub struct Document {
    body: Arc<dyn RenderTemplate>,
}

impl Document {
    pub fn new(body: Arc<dyn RenderTemplate>) -> Self {
        Self { body }
    }
}

#[async_trait]
impl RenderTemplate for Document {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        destination.write(Chunk::html(
            "<html lang=\"en\"><head><meta charset=\"utf-8\">",
        ))?;
        destination.write(RenderInstruction::Head.into())?;
        destination.write(Chunk::html("</head><body>"))?;
        self.body.render(destination).await?;
        destination.write(
            RenderInstruction::Script {
                id: BOOT_SCRIPT_ID.to_string(),
                body: BOOT_SCRIPT.to_string(),
            }
            .into(),
        )?;
        destination.write(Chunk::html("</body></html>"))
    }
}

#[derive(Template)]
#[template(
    source = "<title>{{ title }}</title><meta name=\"description\" content=\"{{ description }}\">",
    ext = "html"
)]
struct SeoTemplate<'a> {
    title: &'a str,
    description: &'a str,
}

/// Contributes the page title and description to the document head.
pub struct SeoHead {
    title: String,
    description: String,
}

impl SeoHead {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            title: title.into(),
            description: description.into(),
        })
    }
}

#[async_trait]
impl Propagator for SeoHead {
    async fn init(&self, _ctx: &Arc<RenderContext>) -> Result<ComponentOutput, RenderError> {
        let head = SeoTemplate {
            title: &self.title,
            description: &self.description,
        }
        .render()?;
        Ok(ComponentOutput::HeadAndContent(HeadAndContent::new(
            head,
            ComponentOutput::Data(Value::Null),
        )))
    }
}

/// Contributes a stylesheet link to the document head.
pub struct Stylesheet {
    href: &'static str,
}

impl Stylesheet {
    pub fn new(href: &'static str) -> Arc<Self> {
        Arc::new(Self { href })
    }
}

#[async_trait]
impl Propagator for Stylesheet {
    async fn init(&self, _ctx: &Arc<RenderContext>) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::HeadAndContent(HeadAndContent::new(
            format!("<link rel=\"stylesheet\" href=\"{}\">", self.href),
            ComponentOutput::Data(Value::Null),
        )))
    }
}
