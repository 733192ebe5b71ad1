//! Push-to-pull bridge onto a byte stream.
//!
//! The component tree runs in a detached task and enqueues every converted
//! chunk immediately; flow control is left to whoever polls the stream.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{
    Stream, StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
};
use metrics::counter;
use tracing::{debug, warn};

use super::{
    chunk::{Chunk, chunk_to_bytes},
    component::RenderCall,
    context::RenderContext,
    destination::{ChunkSink, PageDestination},
    entry::{Entry, call_component},
    page::METRIC_RENDER_TOTAL,
    propagation::buffer_head_content,
    types::{RenderError, RenderOutcome, RouteData},
};

type StreamItem = Result<Bytes, RenderError>;

/// Write side of a [`RenderStream`].
#[derive(Debug, Clone)]
pub struct StreamController {
    sender: UnboundedSender<StreamItem>,
}

impl StreamController {
    /// Queue bytes for the consumer. Bytes sent after the consumer has gone
    /// away are discarded; the render itself keeps running.
    pub fn enqueue(&self, bytes: Bytes) {
        if self.sender.unbounded_send(Ok(bytes)).is_err() {
            debug!("render stream consumer detached; discarding chunk");
        }
    }

    /// Finish the stream successfully.
    pub fn close(&self) {
        self.sender.close_channel();
    }

    /// Report a failure to the consumer and finish the stream.
    pub fn error(&self, error: RenderError) {
        if self.sender.unbounded_send(Err(error)).is_err() {
            debug!("render stream consumer detached; discarding error");
        }
        self.sender.close_channel();
    }
}

/// Pull side: yields rendered bytes in document order, then either ends or
/// yields a single error.
#[derive(Debug)]
pub struct RenderStream {
    receiver: UnboundedReceiver<StreamItem>,
}

impl RenderStream {
    pub fn channel() -> (StreamController, RenderStream) {
        let (sender, receiver) = unbounded();
        (StreamController { sender }, RenderStream { receiver })
    }
}

impl Stream for RenderStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

struct StreamSink {
    controller: StreamController,
}

impl ChunkSink for StreamSink {
    fn accept(&mut self, ctx: &RenderContext, chunk: Chunk) -> Result<(), RenderError> {
        if chunk.is_response() {
            return Err(RenderError::response_after_streaming());
        }
        self.controller.enqueue(chunk_to_bytes(ctx, chunk));
        Ok(())
    }
}

/// Ends the stream with an abort error if the render task stops before
/// closing it, as when the template panics.
struct StreamGuard {
    controller: Option<StreamController>,
    route: Option<RouteData>,
}

impl StreamGuard {
    fn new(controller: StreamController, route: Option<RouteData>) -> Self {
        Self {
            controller: Some(controller),
            route,
        }
    }

    fn close(mut self) {
        if let Some(controller) = self.controller.take() {
            controller.close();
        }
    }

    fn error(mut self, error: RenderError) {
        if let Some(controller) = self.controller.take() {
            controller.error(error);
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Some(controller) = self.controller.take() {
            let error = RenderError::aborted("render task ended before completing")
                .locate(self.route.as_ref());
            warn!(error = %error, "streamed render aborted");
            controller.error(error);
        }
    }
}

/// Render the entry component into a byte stream.
///
/// The head pass completes before the stream is returned, so no body chunk
/// can reach the consumer ahead of it.
pub async fn render_to_readable_stream(
    ctx: Arc<RenderContext>,
    call: RenderCall,
) -> Result<RenderOutcome<RenderStream>, RenderError> {
    let template = match call_component(&ctx, &call).await? {
        Entry::Response(response) => return Ok(RenderOutcome::Response(response)),
        Entry::Template(template) => template,
    };

    if call.is_page {
        buffer_head_content(&ctx)
            .await
            .map_err(|err| err.locate(call.route.as_ref()))?;
    }

    let (controller, stream) = RenderStream::channel();
    let sink = StreamSink {
        controller: controller.clone(),
    };
    let RenderCall { is_page, route, .. } = call;
    let guard = StreamGuard::new(controller, route);

    tokio::spawn(async move {
        let mut destination = PageDestination::new(ctx, is_page, sink);
        match template.render(&mut destination).await {
            Ok(()) => guard.close(),
            Err(err) => {
                let err = err.locate(guard.route.as_ref());
                warn!(error = %err, location = err.location().unwrap_or(""), "streamed render failed");
                counter!(METRIC_RENDER_TOTAL, "mode" => "stream", "outcome" => "failed")
                    .increment(1);
                // Let chunks written before the failure reach the consumer first.
                tokio::task::yield_now().await;
                guard.error(err);
            }
        }
    });

    Ok(RenderOutcome::Body(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn controller_error_follows_enqueued_bytes_and_ends_the_stream() {
        let (controller, mut stream) = RenderStream::channel();
        controller.enqueue(Bytes::from_static(b"<p>"));
        controller.error(RenderError::component("boom"));
        controller.enqueue(Bytes::from_static(b"late"));

        assert_eq!(stream.next().await, Some(Ok(Bytes::from_static(b"<p>"))));
        assert_eq!(stream.next().await, Some(Err(RenderError::component("boom"))));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn abandoned_render_task_ends_the_stream_with_an_abort() {
        let (controller, mut stream) = RenderStream::channel();
        controller.enqueue(Bytes::from_static(b"<p>"));
        let guard = StreamGuard::new(controller, Some(RouteData::new("/test", "pages/test")));
        drop(guard);

        assert_eq!(stream.next().await, Some(Ok(Bytes::from_static(b"<p>"))));
        let error = stream.next().await.expect("item").unwrap_err();
        assert!(matches!(
            error.kind(),
            crate::application::render::RenderErrorKind::Aborted { .. }
        ));
        assert_eq!(error.location(), Some("pages/test"));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn closed_guard_ends_the_stream_cleanly() {
        let (controller, mut stream) = RenderStream::channel();
        StreamGuard::new(controller, None).close();

        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn dropped_consumer_does_not_fail_writes() {
        let (controller, stream) = RenderStream::channel();
        drop(stream);

        let mut sink = StreamSink { controller };
        let ctx = RenderContext::new(false, false);
        assert!(sink.accept(&ctx, Chunk::html("<p>")).is_ok());
    }

    #[tokio::test]
    async fn responses_mid_stream_are_rejected() {
        let (controller, _stream) = RenderStream::channel();
        let mut sink = StreamSink { controller };
        let ctx = RenderContext::new(false, false);
        let response = crate::application::render::ShortCircuit::redirect(
            "/",
            axum::http::StatusCode::FOUND,
        );

        let error = sink.accept(&ctx, Chunk::Response(response)).unwrap_err();
        assert_eq!(error, RenderError::response_after_streaming());
    }
}
