use thiserror::Error;

use crate::rpc::RpcError;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Decode error: {0}")]
    Decode(String),
}
