//! Handler context passed to every event handler.

use alloy::primitives::{Address, U256};

use crate::chain::ChainReader;
use crate::events::DecodedEvent;
use crate::store::EntityStore;

use super::error::HandlerError;

/// Protocol contract addresses from the indexer configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolAddresses {
    pub pool_registry: Address,
    pub oracle: Address,
}

/// Context provided to handlers: entity store, chain reads, and the
/// configured protocol addresses.
pub struct HandlerContext<'a> {
    pub store: &'a EntityStore,
    pub chain: &'a dyn ChainReader,
    pub addresses: ProtocolAddresses,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        store: &'a EntityStore,
        chain: &'a dyn ChainReader,
        addresses: ProtocolAddresses,
    ) -> Self {
        Self {
            store,
            chain,
            addresses,
        }
    }
}

/// Get a required address parameter from a decoded event.
pub fn require_address(event: &DecodedEvent, name: &str) -> Result<Address, HandlerError> {
    event
        .try_get(name)
        .ok_or_else(|| HandlerError::MissingField(format!("{}.{}", event.name, name)))?
        .as_address()
        .ok_or_else(|| {
            HandlerError::TypeConversion(format!("{}.{} is not an address", event.name, name))
        })
}

/// Get a required uint256 parameter from a decoded event.
pub fn require_uint(event: &DecodedEvent, name: &str) -> Result<U256, HandlerError> {
    event
        .try_get(name)
        .ok_or_else(|| HandlerError::MissingField(format!("{}.{}", event.name, name)))?
        .as_uint256()
        .ok_or_else(|| {
            HandlerError::TypeConversion(format!("{}.{} is not a uint256", event.name, name))
        })
}
