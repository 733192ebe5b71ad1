//! Component-tree rendering and its three delivery adapters.
//!
//! The tree pushes chunks into a [`RenderDestination`] as it runs. Each
//! adapter wraps the same doctype-injecting [`PageDestination`] around its own
//! [`ChunkSink`]: a string accumulator, a byte stream fed from a detached
//! task, or a pull iterator that drains a shared buffer.

mod chunk;
mod component;
mod context;
mod destination;
mod entry;
mod iterable;
mod page;
mod propagation;
mod stream;
mod string;
mod types;

pub use chunk::{Chunk, RenderInstruction, chunk_to_bytes, chunk_to_string, doctype};
pub use component::{
    ComponentFactory, ComponentOutput, HeadAndContent, Propagator, Props, RenderCall,
    RenderTemplate, Slots,
};
pub use context::RenderContext;
pub use destination::{ChunkSink, PageDestination, RenderDestination};
pub use entry::{Entry, call_component};
pub use iterable::{IterChunk, RenderIterable, render_to_async_iterable};
pub use page::{DeliveryMode, render_page};
pub(crate) use page::METRIC_RENDER_TOTAL;
pub use propagation::buffer_head_content;
pub use stream::{RenderStream, StreamController, render_to_readable_stream};
pub use string::render_to_string;
pub use types::{RenderError, RenderErrorKind, RenderOutcome, RouteData, ShortCircuit};
