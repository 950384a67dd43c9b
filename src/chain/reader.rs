use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use super::ChainError;

/// Return tuple of a vToken's `getAccountSnapshot(address)` call.
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    pub error: U256,
    pub vtoken_balance: U256,
    pub borrow_balance: U256,
    pub exchange_rate_mantissa: U256,
}

/// Return tuple of the pool registry's `getPoolByID(uint256)` call.
#[derive(Debug, Clone)]
pub struct PoolMetadata {
    pub index: U256,
    pub name: String,
    pub creator: Address,
    pub comptroller: Address,
    pub block_posted: u64,
    pub timestamp_posted: u64,
}

/// Read-only contract calls the handlers depend on.
///
/// One method per fixed ABI read. The production implementation goes over
/// JSON-RPC; tests use `stub::StubChainReader`.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn comptroller(&self, vtoken: Address) -> Result<Address, ChainError>;

    async fn token_name(&self, token: Address) -> Result<String, ChainError>;

    async fn token_symbol(&self, token: Address) -> Result<String, ChainError>;

    async fn token_decimals(&self, token: Address) -> Result<u32, ChainError>;

    async fn underlying(&self, vtoken: Address) -> Result<Address, ChainError>;

    async fn interest_rate_model(&self, vtoken: Address) -> Result<Address, ChainError>;

    async fn reserve_factor_mantissa(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn accrual_block_number(&self, vtoken: Address) -> Result<u64, ChainError>;

    async fn total_supply(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn exchange_rate_stored(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn borrow_index(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn total_reserves(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn total_borrows(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn get_cash(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn borrow_rate_per_block(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn supply_rate_per_block(&self, vtoken: Address) -> Result<U256, ChainError>;

    async fn balance_of(&self, vtoken: Address, account: Address) -> Result<U256, ChainError>;

    async fn get_account_snapshot(
        &self,
        vtoken: Address,
        account: Address,
    ) -> Result<AccountSnapshot, ChainError>;

    async fn get_underlying_price(
        &self,
        oracle: Address,
        vtoken: Address,
    ) -> Result<U256, ChainError>;

    async fn get_pool_by_id(
        &self,
        registry: Address,
        index: U256,
    ) -> Result<PoolMetadata, ChainError>;
}
