//! Core traits for event handlers.
//!
//! Handlers receive decoded events one at a time and update entities
//! through the store in the handler context.

use async_trait::async_trait;

use crate::events::DecodedEvent;

use super::context::HandlerContext;
use super::error::HandlerError;

/// Core trait that all event handlers implement.
///
/// Handlers are registered at startup and invoked for every decoded
/// event matching one of their triggers, in (block, log index) order.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Unique name for this handler (used in logging).
    fn name(&self) -> &'static str;

    /// Event triggers this handler responds to.
    fn triggers(&self) -> Vec<EventTrigger>;

    /// Process a single decoded event.
    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError>;
}

/// Trigger for event-based handlers.
#[derive(Debug, Clone)]
pub struct EventTrigger {
    /// Source kind from the event catalog (e.g., "VToken").
    pub source: String,
    /// Event signature (e.g., "Mint(address,uint256,uint256,uint256)").
    pub event_signature: String,
}

impl EventTrigger {
    pub fn new(source: impl Into<String>, event_signature: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            event_signature: event_signature.into(),
        }
    }
}
