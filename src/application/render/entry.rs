use std::sync::Arc;

use super::{
    component::{ComponentOutput, RenderCall, RenderTemplate},
    context::RenderContext,
    types::{RenderError, RenderErrorKind, RouteData, ShortCircuit},
};

/// Classified top-level result of an entry component.
pub enum Entry {
    Response(ShortCircuit),
    Template(Arc<dyn RenderTemplate>),
}

/// Invoke the entry factory and classify its result.
///
/// A short-circuit response is returned as-is; head and content is unwrapped
/// to its content; anything that is not a template is a configuration error.
pub async fn call_component(
    ctx: &Arc<RenderContext>,
    call: &RenderCall,
) -> Result<Entry, RenderError> {
    let output = call
        .factory
        .call(ctx, &call.props, &call.slots)
        .await
        .map_err(|err| err.locate(call.route.as_ref()))?;

    match output {
        ComponentOutput::Response(response) => Ok(Entry::Response(response)),
        ComponentOutput::Template(template) => Ok(Entry::Template(template)),
        ComponentOutput::HeadAndContent(pair) => match *pair.content {
            ComponentOutput::Template(template) => Ok(Entry::Template(template)),
            other => Err(not_renderable(call.route.as_ref(), &other)),
        },
        other @ ComponentOutput::Data(_) => Err(not_renderable(call.route.as_ref(), &other)),
    }
}

fn not_renderable(route: Option<&RouteData>, output: &ComponentOutput) -> RenderError {
    let kind = RenderErrorKind::NotRenderable {
        route: route.map(|route| route.route.clone()).unwrap_or_default(),
        returned: output.describe(),
    };
    RenderError::new(kind).locate(route)
}
