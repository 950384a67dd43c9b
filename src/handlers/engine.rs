//! Event dispatch engine.
//!
//! Events are replayed strictly in (block number, log index) order, one at a
//! time. Handlers therefore never need their own concurrency control. A
//! handler failure aborts the batch; the checkpoint is only advanced after a
//! fully processed range, so reruns are safe.

use crate::events::DecodedEvent;

use super::context::HandlerContext;
use super::error::HandlerError;
use super::registry::HandlerRegistry;

pub struct Engine {
    registry: HandlerRegistry,
}

impl Engine {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Dispatch a batch of decoded events to their handlers.
    /// Returns the number of handler invocations.
    pub async fn process(
        &self,
        ctx: &HandlerContext<'_>,
        mut events: Vec<DecodedEvent>,
    ) -> Result<usize, HandlerError> {
        events.sort_by_key(|event| (event.block_number, event.log_index));

        let mut dispatched = 0;
        for event in &events {
            for handler in self.registry.handlers_for(&event.source, &event.name) {
                tracing::debug!(
                    handler = handler.name(),
                    event = %event.name,
                    block = event.block_number,
                    log_index = event.log_index,
                    "dispatching event"
                );
                handler.handle(ctx, event).await?;
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }
}
