use std::sync::Arc;

use tracing::debug;

use super::{
    component::ComponentOutput,
    context::RenderContext,
    types::RenderError,
};

/// Resolve every registered propagator and hoist the head fragments they
/// produce into the context, in registration order.
///
/// Propagators registered while this pass runs are visited by the same pass.
pub async fn buffer_head_content(ctx: &Arc<RenderContext>) -> Result<(), RenderError> {
    let mut index = 0;
    while let Some(propagator) = ctx.propagator_at(index) {
        index += 1;
        if let ComponentOutput::HeadAndContent(output) = propagator.init(ctx).await? {
            ctx.push_extra_head(output.head);
        }
    }
    debug!(propagators = index, "head content buffered");
    Ok(())
}
