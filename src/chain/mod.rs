//! Read-only contract access.
//!
//! Handlers reach the chain only through the `ChainReader` trait, so tests
//! can substitute canned responses for every contract read.

mod abi;
mod error;
mod reader;
mod rpc_reader;
#[cfg(test)]
pub mod stub;

pub use error::ChainError;
pub use reader::{AccountSnapshot, ChainReader, PoolMetadata};
pub use rpc_reader::RpcChainReader;
