//! Route table and page components for the bundled site.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use axum::{http::StatusCode, response::Response};
use serde_json::Value;

use crate::{
    application::render::{
        Chunk, ComponentFactory, ComponentOutput, DeliveryMode, HeadAndContent, Props,
        RenderCall, RenderContext, RenderDestination, RenderError, RenderTemplate, RouteData,
        ShortCircuit, Slots, render_page,
    },
    config::RenderSettings,
};

use super::components::{Document, Fragment, Markup, SeoHead, Stylesheet};

const SITE_NAME: &str = "Rendition";
const STYLESHEET: &str = "/static/site.css";

/// A resolved request: what to call, and how.
#[derive(Debug)]
pub struct SiteRoute {
    pub call: RenderCall,
    pub partial: bool,
    pub status: StatusCode,
}

impl SiteRoute {
    fn page(route: &str, component: &str, factory: Arc<dyn ComponentFactory>) -> Self {
        Self {
            call: RenderCall::page(factory).with_route(RouteData::new(route, component)),
            partial: false,
            status: StatusCode::OK,
        }
    }

    fn with_prop(mut self, key: &str, value: &str) -> Self {
        self.call = self.call.with_prop(key, value);
        self
    }

    /// Build the render context this route needs.
    pub fn context(&self, settings: &RenderSettings) -> Arc<RenderContext> {
        Arc::new(RenderContext::new(self.partial, settings.compress_html))
    }
}

/// Map a request path onto the page that renders it. Unknown paths resolve to
/// the not-found page.
pub fn resolve(path: &str) -> SiteRoute {
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.as_slice() {
        [] => SiteRoute::page("/", "pages/index", Arc::new(HomePage)),
        ["hello", name] => {
            SiteRoute::page("/hello/{name}", "pages/hello", Arc::new(HelloPage)).with_prop("name", name)
        }
        ["old-home"] => SiteRoute::page("/old-home", "pages/old-home", Arc::new(LegacyRedirect)),
        ["fragments", "greeting", name] => SiteRoute {
            partial: true,
            ..SiteRoute::page(
                "/fragments/greeting/{name}",
                "fragments/greeting",
                Arc::new(GreetingFragment),
            )
            .with_prop("name", name)
        },
        ["broken"] => SiteRoute::page("/broken", "pages/broken", Arc::new(BrokenPage)),
        _ => SiteRoute {
            status: StatusCode::NOT_FOUND,
            ..SiteRoute::page("/404", "pages/404", Arc::new(NotFoundPage))
        },
    }
}

/// Render a resolved route into an HTTP response.
pub async fn respond(
    route: SiteRoute,
    settings: &RenderSettings,
    mode: DeliveryMode,
) -> Result<Response, RenderError> {
    let ctx = route.context(settings);
    render_page(ctx, route.call, mode, route.status).await
}

fn name_prop(props: &Props) -> &str {
    props
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or("world")
}

#[derive(Template)]
#[template(
    source = "<main><h1>{{ site }}</h1><p>Pages rendered on the server, delivered three ways.</p>\
              <ul>{% for (href, label) in links %}<li><a href=\"{{ href }}\">{{ label }}</a></li>{% endfor %}</ul></main>",
    ext = "html"
)]
struct HomeTemplate {
    site: &'static str,
    links: Vec<(&'static str, &'static str)>,
}

#[derive(Template)]
#[template(source = "<p class=\"greeting\">Hello, {{ name }}!</p>", ext = "html")]
struct GreetingTemplate {
    name: String,
}

#[derive(Template)]
#[template(
    source = "<main><h1>Not found</h1><p>Nothing lives here.</p><p><a href=\"/\">Back to home</a></p></main>",
    ext = "html"
)]
struct NotFoundTemplate;

struct HomePage;

#[async_trait]
impl ComponentFactory for HomePage {
    async fn call(
        &self,
        ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        ctx.register_propagator(SeoHead::new(SITE_NAME, "Server-rendered pages."));
        ctx.register_propagator(Stylesheet::new(STYLESHEET));
        let body = Markup(HomeTemplate {
            site: SITE_NAME,
            links: vec![
                ("/hello/world", "Say hello"),
                ("/fragments/greeting/world", "A fragment"),
                ("/old-home", "The old home page"),
            ],
        });
        Ok(ComponentOutput::template(Document::new(Arc::new(body))))
    }
}

struct HelloPage;

#[async_trait]
impl ComponentFactory for HelloPage {
    async fn call(
        &self,
        ctx: &Arc<RenderContext>,
        props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        let name = name_prop(props);
        ctx.register_propagator(SeoHead::new(
            format!("Hello, {name} | {SITE_NAME}"),
            format!("A greeting for {name}."),
        ));
        ctx.register_propagator(Stylesheet::new(STYLESHEET));

        let body = Fragment(vec![
            Arc::new(Markup(GreetingTemplate {
                name: name.to_string(),
            })) as Arc<dyn RenderTemplate>,
            Arc::new(Signature),
        ]);
        let page = ComponentOutput::template(Document::new(Arc::new(body)));
        Ok(ComponentOutput::HeadAndContent(HeadAndContent::new(
            String::new(),
            page,
        )))
    }
}

/// Footer line written as escaped text between two markup chunks.
struct Signature;

#[async_trait]
impl RenderTemplate for Signature {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        destination.write(Chunk::html("<footer>"))?;
        destination.write(Chunk::text("<rendered by rendition>"))?;
        destination.write(Chunk::html("</footer>"))
    }
}

struct LegacyRedirect;

#[async_trait]
impl ComponentFactory for LegacyRedirect {
    async fn call(
        &self,
        _ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::Response(ShortCircuit::redirect(
            "/",
            StatusCode::MOVED_PERMANENTLY,
        )))
    }
}

struct GreetingFragment;

#[async_trait]
impl ComponentFactory for GreetingFragment {
    async fn call(
        &self,
        _ctx: &Arc<RenderContext>,
        props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::template(Markup(GreetingTemplate {
            name: name_prop(props).to_string(),
        })))
    }
}

struct BrokenPage;

#[async_trait]
impl ComponentFactory for BrokenPage {
    async fn call(
        &self,
        _ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        Ok(ComponentOutput::template(BrokenBody))
    }
}

/// Writes the opening of a document, then fails.
struct BrokenBody;

#[async_trait]
impl RenderTemplate for BrokenBody {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError> {
        destination.write(Chunk::html("<html><body><p>Starting…</p>"))?;
        Err(RenderError::component("this page always fails part-way"))
    }
}

struct NotFoundPage;

#[async_trait]
impl ComponentFactory for NotFoundPage {
    async fn call(
        &self,
        ctx: &Arc<RenderContext>,
        _props: &Props,
        _slots: &Slots,
    ) -> Result<ComponentOutput, RenderError> {
        ctx.register_propagator(SeoHead::new(
            format!("Not found | {SITE_NAME}"),
            "The requested page does not exist.",
        ));
        Ok(ComponentOutput::template(Document::new(Arc::new(Markup(
            NotFoundTemplate,
        )))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_to_routes() {
        let home = resolve("/");
        assert_eq!(home.call.route.as_ref().map(|r| r.route.as_str()), Some("/"));
        assert_eq!(home.status, StatusCode::OK);

        let hello = resolve("/hello/ada/");
        assert_eq!(
            hello.call.props.get("name"),
            Some(&Value::String("ada".to_string()))
        );

        let fragment = resolve("/fragments/greeting/ada");
        assert!(fragment.partial);
        assert!(fragment.call.is_page);

        let missing = resolve("/nope/nope/nope/nope");
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn empty_name_falls_back_to_world() {
        let mut props = Props::new();
        props.insert("name".to_string(), Value::String(String::new()));
        assert_eq!(name_prop(&props), "world");
    }
}
