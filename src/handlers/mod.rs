//! Event handling: per-event handlers, the dispatch engine, and the
//! get-or-create entity accessors they share.

mod context;
mod engine;
mod error;
pub mod operations;
mod pool_registry;
mod registry;
mod rewards;
mod shortfall;
mod traits;
mod vtoken;

pub use context::{HandlerContext, ProtocolAddresses};
pub use engine::Engine;
pub use error::HandlerError;
pub use registry::{build_registry, HandlerRegistry};
pub use traits::{EventHandler, EventTrigger};
