use std::sync::Arc;

use super::{
    chunk::{Chunk, doctype},
    context::RenderContext,
    types::RenderError,
};

/// Write-only target the component tree pushes chunks into.
///
/// `write` is synchronous and never awaits. An `Err` aborts the render; the
/// tree is expected to propagate it unchanged.
pub trait RenderDestination: Send {
    fn write(&mut self, chunk: Chunk) -> Result<(), RenderError>;
}

/// Per-adapter policy for what happens to each forwarded chunk.
pub trait ChunkSink: Send {
    fn accept(&mut self, ctx: &RenderContext, chunk: Chunk) -> Result<(), RenderError>;
}

/// Single-use destination that inserts the doctype ahead of the first chunk
/// of a full page render, then hands every chunk to its sink.
pub struct PageDestination<S> {
    ctx: Arc<RenderContext>,
    is_page: bool,
    rendered_first_chunk: bool,
    sink: S,
}

impl<S: ChunkSink> PageDestination<S> {
    pub fn new(ctx: Arc<RenderContext>, is_page: bool, sink: S) -> Self {
        Self {
            ctx,
            is_page,
            rendered_first_chunk: false,
            sink,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: ChunkSink> RenderDestination for PageDestination<S> {
    fn write(&mut self, chunk: Chunk) -> Result<(), RenderError> {
        if self.is_page && !self.rendered_first_chunk {
            self.rendered_first_chunk = true;
            if !self.ctx.is_partial() && !chunk.contains_doctype() {
                let unit = Chunk::html(doctype(&self.ctx));
                self.sink.accept(&self.ctx, unit)?;
            }
        }
        self.sink.accept(&self.ctx, chunk)
    }
}
