//! Push-to-pull bridge onto a consumer-driven iterator.
//!
//! Writes append to an unbounded buffer and raise a single-slot "data ready"
//! signal; each pull waits for that signal, then drains the whole buffer as
//! one contiguous chunk. A slow consumer never blocks the render.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use metrics::counter;
use tokio::sync::Notify;
use tracing::warn;

use super::{
    chunk::{Chunk, chunk_to_bytes},
    component::RenderCall,
    context::RenderContext,
    destination::{ChunkSink, PageDestination},
    entry::{Entry, call_component},
    page::METRIC_RENDER_TOTAL,
    propagation::buffer_head_content,
    types::{RenderError, RenderOutcome},
};

/// One pull result. `done` is set only once rendering has finished and
/// nothing is left to deliver, in which case `value` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterChunk {
    pub done: bool,
    pub value: Bytes,
}

#[derive(Debug, Default)]
struct IterState {
    buffer: Vec<Bytes>,
    error: Option<RenderError>,
    complete: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<IterState>,
    ready: Notify,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, IterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, bytes: Bytes) {
        self.state().buffer.push(bytes);
        self.ready.notify_one();
    }

    fn finish(&self, error: Option<RenderError>) {
        {
            let mut state = self.state();
            if state.complete {
                return;
            }
            state.complete = true;
            state.error = error;
        }
        self.ready.notify_one();
    }
}

/// Pull-driven view over a background render.
#[derive(Debug)]
pub struct RenderIterable {
    shared: Arc<Shared>,
}

impl RenderIterable {
    /// Wait for buffered output (or completion) and return everything
    /// buffered so far as one chunk. A recorded render failure is returned
    /// on this and every later pull.
    pub async fn next(&mut self) -> Result<IterChunk, RenderError> {
        loop {
            let ready = self.shared.ready.notified();
            {
                let mut state = self.shared.state();
                if let Some(error) = &state.error {
                    return Err(error.clone());
                }
                if !state.buffer.is_empty() || state.complete {
                    let value = merge(&mut state.buffer);
                    return Ok(IterChunk {
                        done: value.is_empty() && state.complete,
                        value,
                    });
                }
            }
            ready.await;
        }
    }

    /// Adapt into a stream of non-empty byte chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, RenderError>> + Send {
        let mut iterable = self;
        try_stream! {
            loop {
                let chunk = iterable.next().await?;
                if chunk.done {
                    break;
                }
                yield chunk.value;
            }
        }
    }
}

fn merge(buffer: &mut Vec<Bytes>) -> Bytes {
    if buffer.len() == 1 {
        return buffer.pop().unwrap_or_default();
    }
    let length = buffer.iter().map(Bytes::len).sum();
    let mut merged = BytesMut::with_capacity(length);
    for bytes in buffer.drain(..) {
        merged.extend_from_slice(&bytes);
    }
    merged.freeze()
}

struct IterSink {
    shared: Arc<Shared>,
}

impl ChunkSink for IterSink {
    fn accept(&mut self, ctx: &RenderContext, chunk: Chunk) -> Result<(), RenderError> {
        if chunk.is_response() {
            return Err(RenderError::response_after_streaming());
        }
        let bytes = chunk_to_bytes(ctx, chunk);
        if !bytes.is_empty() {
            self.shared.push(bytes);
        }
        Ok(())
    }
}

/// Marks the render finished if the task ends without reaching completion,
/// so a pending pull cannot wait forever.
struct CompletionGuard {
    shared: Arc<Shared>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.shared.finish(Some(RenderError::aborted(
            "render task ended before completing",
        )));
    }
}

/// Render the entry component into a pull-driven iterator.
pub async fn render_to_async_iterable(
    ctx: Arc<RenderContext>,
    call: RenderCall,
) -> Result<RenderOutcome<RenderIterable>, RenderError> {
    let template = match call_component(&ctx, &call).await? {
        Entry::Response(response) => return Ok(RenderOutcome::Response(response)),
        Entry::Template(template) => template,
    };

    if call.is_page {
        buffer_head_content(&ctx)
            .await
            .map_err(|err| err.locate(call.route.as_ref()))?;
    }

    let shared = Arc::new(Shared::default());
    let sink = IterSink {
        shared: Arc::clone(&shared),
    };
    let guard = CompletionGuard {
        shared: Arc::clone(&shared),
    };
    let RenderCall { is_page, route, .. } = call;

    tokio::spawn(async move {
        let mut destination = PageDestination::new(ctx, is_page, sink);
        let result = template.render(&mut destination).await;
        match result {
            Ok(()) => guard.shared.finish(None),
            Err(err) => {
                let err = err.locate(route.as_ref());
                warn!(error = %err, location = err.location().unwrap_or(""), "iterable render failed");
                counter!(METRIC_RENDER_TOTAL, "mode" => "iterable", "outcome" => "failed")
                    .increment(1);
                guard.shared.finish(Some(err));
            }
        }
        drop(guard);
    });

    Ok(RenderOutcome::Body(RenderIterable { shared }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iterable() -> (Arc<Shared>, RenderIterable) {
        let shared = Arc::new(Shared::default());
        let iterable = RenderIterable {
            shared: Arc::clone(&shared),
        };
        (shared, iterable)
    }

    #[tokio::test]
    async fn buffered_chunks_merge_into_one_pull() {
        let (shared, mut iterable) = iterable();
        shared.push(Bytes::from_static(b"ab"));
        shared.push(Bytes::from_static(b"cd"));

        let first = iterable.next().await.expect("pull");
        assert_eq!(
            first,
            IterChunk {
                done: false,
                value: Bytes::from_static(b"abcd"),
            }
        );

        shared.finish(None);
        let last = iterable.next().await.expect("pull");
        assert!(last.done);
        assert!(last.value.is_empty());
    }

    #[tokio::test]
    async fn pull_waits_for_a_write() {
        let (shared, mut iterable) = iterable();
        let pull = tokio::spawn(async move { iterable.next().await });

        tokio::task::yield_now().await;
        shared.push(Bytes::from_static(b"late"));

        let chunk = pull.await.expect("join").expect("pull");
        assert_eq!(chunk.value, Bytes::from_static(b"late"));
        assert!(!chunk.done);
    }

    #[tokio::test]
    async fn recorded_error_is_rethrown_on_every_pull() {
        let (shared, mut iterable) = iterable();
        shared.push(Bytes::from_static(b"lost"));
        shared.finish(Some(RenderError::component("boom")));

        assert_eq!(iterable.next().await, Err(RenderError::component("boom")));
        assert_eq!(iterable.next().await, Err(RenderError::component("boom")));
    }

    #[tokio::test]
    async fn empty_writes_do_not_wake_the_consumer() {
        let shared = Arc::new(Shared::default());
        let mut sink = IterSink {
            shared: Arc::clone(&shared),
        };
        let ctx = RenderContext::new(false, false);

        sink.accept(&ctx, Chunk::html("")).expect("write");
        assert!(shared.state().buffer.is_empty());
    }

    #[tokio::test]
    async fn guard_unblocks_pulls_when_the_task_dies() {
        let (shared, mut iterable) = iterable();
        drop(CompletionGuard { shared });

        let error = iterable.next().await.unwrap_err();
        assert!(matches!(
            error.kind(),
            crate::application::render::RenderErrorKind::Aborted { .. }
        ));
    }
}
