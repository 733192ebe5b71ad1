use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::component::Propagator;

/// State threaded through one top-level render.
///
/// A context belongs to exactly one render invocation. It is shared by
/// reference count only because streaming adapters drive the component tree
/// from a background task.
#[derive(Debug, Default)]
pub struct RenderContext {
    partial: bool,
    compress_html: bool,
    metadata: Mutex<RenderMetadata>,
}

#[derive(Default)]
struct RenderMetadata {
    propagators: Vec<Arc<dyn Propagator>>,
    extra_head: Vec<String>,
    has_rendered_head: bool,
    rendered_scripts: HashSet<String>,
}

impl std::fmt::Debug for RenderMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderMetadata")
            .field("propagators", &self.propagators.len())
            .field("extra_head", &self.extra_head)
            .field("has_rendered_head", &self.has_rendered_head)
            .field("rendered_scripts", &self.rendered_scripts)
            .finish()
    }
}

impl RenderContext {
    pub fn new(partial: bool, compress_html: bool) -> Self {
        Self {
            partial,
            compress_html,
            metadata: Mutex::new(RenderMetadata::default()),
        }
    }

    /// Context for a full document render.
    pub fn page(compress_html: bool) -> Arc<Self> {
        Arc::new(Self::new(false, compress_html))
    }

    /// Context for a fragment render; no doctype is ever emitted.
    pub fn partial(compress_html: bool) -> Arc<Self> {
        Arc::new(Self::new(true, compress_html))
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn compress_html(&self) -> bool {
        self.compress_html
    }

    /// Register a deferred head contributor. Registering the same instance
    /// twice is a no-op; returns whether the propagator was newly added.
    pub fn register_propagator(&self, propagator: Arc<dyn Propagator>) -> bool {
        let mut metadata = self.metadata();
        let candidate = Arc::as_ptr(&propagator).cast::<()>();
        let known = metadata
            .propagators
            .iter()
            .any(|existing| Arc::as_ptr(existing).cast::<()>() == candidate);
        if known {
            return false;
        }
        metadata.propagators.push(propagator);
        true
    }

    pub fn propagator_count(&self) -> usize {
        self.metadata().propagators.len()
    }

    /// Head fragments collected so far, in collection order.
    pub fn extra_head(&self) -> Vec<String> {
        self.metadata().extra_head.clone()
    }

    pub fn push_extra_head(&self, fragment: impl Into<String>) {
        self.metadata().extra_head.push(fragment.into());
    }

    pub(crate) fn propagator_at(&self, index: usize) -> Option<Arc<dyn Propagator>> {
        self.metadata().propagators.get(index).cloned()
    }

    /// Markup for the collected head fragments, or `None` once it has already
    /// been emitted during this render.
    pub(crate) fn take_head_markup(&self) -> Option<String> {
        let mut metadata = self.metadata();
        if metadata.has_rendered_head {
            return None;
        }
        metadata.has_rendered_head = true;
        let separator = if self.compress_html { "" } else { "\n" };
        Some(metadata.extra_head.join(separator))
    }

    /// Returns true the first time `id` is seen in this render.
    pub(crate) fn claim_script(&self, id: &str) -> bool {
        self.metadata().rendered_scripts.insert(id.to_string())
    }

    fn metadata(&self) -> MutexGuard<'_, RenderMetadata> {
        self.metadata.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::render::{ComponentOutput, RenderError};

    struct Title;

    #[async_trait]
    impl Propagator for Title {
        async fn init(&self, _ctx: &Arc<RenderContext>) -> Result<ComponentOutput, RenderError> {
            Ok(ComponentOutput::Data(serde_json::Value::Null))
        }
    }

    #[test]
    fn propagators_are_deduplicated_by_instance() {
        let ctx = RenderContext::page(false);
        let title: Arc<dyn Propagator> = Arc::new(Title);

        assert!(ctx.register_propagator(Arc::clone(&title)));
        assert!(!ctx.register_propagator(Arc::clone(&title)));
        assert!(ctx.register_propagator(Arc::new(Title)));
        assert_eq!(ctx.propagator_count(), 2);
    }

    #[test]
    fn head_markup_is_taken_once() {
        let ctx = RenderContext::page(false);
        ctx.push_extra_head("<title>a</title>");
        ctx.push_extra_head("<meta charset=\"utf-8\">");

        assert_eq!(
            ctx.take_head_markup().as_deref(),
            Some("<title>a</title>\n<meta charset=\"utf-8\">")
        );
        assert_eq!(ctx.take_head_markup(), None);
    }

    #[test]
    fn compressed_head_markup_has_no_separator() {
        let ctx = RenderContext::page(true);
        ctx.push_extra_head("<title>a</title>");
        ctx.push_extra_head("<link rel=\"icon\">");

        assert_eq!(
            ctx.take_head_markup().as_deref(),
            Some("<title>a</title><link rel=\"icon\">")
        );
    }
}
