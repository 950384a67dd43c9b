//! Handler registration system.
//!
//! The registry maintains a mapping from event triggers to their handlers.

use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{EventHandler, EventTrigger};

/// Registry of all event handlers, built at startup.
pub struct HandlerRegistry {
    /// Event handlers indexed by (source, event_name) for fast lookup
    event_handlers: HashMap<(String, String), Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            event_handlers: HashMap::new(),
        }
    }

    /// Register an event handler.
    ///
    /// The handler will be invoked for all events matching its triggers.
    pub fn register<H: EventHandler + 'static>(&mut self, handler: H) {
        let handler = Arc::new(handler);
        for trigger in handler.triggers() {
            let key = (
                trigger.source.clone(),
                extract_event_name(&trigger.event_signature),
            );
            self.event_handlers
                .entry(key)
                .or_default()
                .push(handler.clone());
        }
    }

    /// Get handlers for a specific event.
    pub fn handlers_for(&self, source: &str, event_name: &str) -> Vec<Arc<dyn EventHandler>> {
        let key = (source.to_string(), event_name.to_string());
        self.event_handlers.get(&key).cloned().unwrap_or_default()
    }

    pub fn handler_count(&self) -> usize {
        self.event_handlers.values().map(Vec::len).sum()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the event name from a signature like "Mint(address,uint256)".
fn extract_event_name(signature: &str) -> String {
    signature
        .split('(')
        .next()
        .unwrap_or(signature)
        .to_string()
}

/// Build the registry with every handler wired in.
pub fn build_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    super::pool_registry::register_handlers(&mut registry);
    super::vtoken::register_handlers(&mut registry);
    super::rewards::register_handlers(&mut registry);
    super::shortfall::register_handlers(&mut registry);
    registry
}
