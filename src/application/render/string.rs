use std::sync::Arc;

use tracing::debug;

use super::{
    chunk::{Chunk, chunk_to_string},
    component::RenderCall,
    context::RenderContext,
    destination::{ChunkSink, PageDestination},
    entry::{Entry, call_component},
    propagation::buffer_head_content,
    types::{RenderError, RenderOutcome},
};

/// Accumulates converted chunks into one string.
#[derive(Debug, Default)]
struct StringSink {
    html: String,
}

impl ChunkSink for StringSink {
    fn accept(&mut self, ctx: &RenderContext, chunk: Chunk) -> Result<(), RenderError> {
        if chunk.is_response() {
            // No channel left to deliver it through once rendering has begun.
            debug!("dropping response written mid-render");
            return Ok(());
        }
        self.html.push_str(&chunk_to_string(ctx, &chunk));
        Ok(())
    }
}

/// Render the entry component into a single string.
pub async fn render_to_string(
    ctx: Arc<RenderContext>,
    call: RenderCall,
) -> Result<RenderOutcome<String>, RenderError> {
    let template = match call_component(&ctx, &call).await? {
        Entry::Response(response) => return Ok(RenderOutcome::Response(response)),
        Entry::Template(template) => template,
    };

    if call.is_page {
        buffer_head_content(&ctx)
            .await
            .map_err(|err| err.locate(call.route.as_ref()))?;
    }

    let mut destination = PageDestination::new(ctx, call.is_page, StringSink::default());
    template
        .render(&mut destination)
        .await
        .map_err(|err| err.locate(call.route.as_ref()))?;

    Ok(RenderOutcome::Body(destination.into_sink().html))
}
