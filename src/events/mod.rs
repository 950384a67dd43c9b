//! Decoded event model and the tracked signature catalog.

mod catalog;
mod parsing;

use std::collections::HashMap;

use alloy::primitives::{Address, B256, U256};

pub use catalog::{EventCatalog, SOURCE_POOL_REGISTRY, SOURCE_REWARDS_DISTRIBUTOR, SOURCE_SHORTFALL, SOURCE_VTOKEN};
pub use parsing::{EventParseError, ParsedEvent};

/// A decoded value from an event parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Address(Address),
    Uint256(U256),
    Bool(bool),
    String(String),
    Array(Vec<DecodedValue>),
}

impl DecodedValue {
    pub fn as_address(&self) -> Option<Address> {
        match self {
            DecodedValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint256(&self) -> Option<U256> {
        match self {
            DecodedValue::Uint256(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DecodedValue::Uint256(v) => (*v).try_into().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DecodedValue]> {
        match self {
            DecodedValue::Array(values) => Some(values),
            _ => None,
        }
    }
}

/// A decoded event ready for handler dispatch.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
    /// Emitting contract address.
    pub address: Address,
    /// Source kind from the catalog ("VToken", "PoolRegistry", ...).
    pub source: String,
    /// Event name (e.g., "Mint", "AccrueInterest").
    pub name: String,
    /// Decoded parameter values keyed by field name.
    pub params: HashMap<String, DecodedValue>,
}

impl DecodedEvent {
    /// Try to get a parameter by name.
    pub fn try_get(&self, name: &str) -> Option<&DecodedValue> {
        self.params.get(name)
    }
}
