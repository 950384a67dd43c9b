//! Canned-response `ChainReader` for handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use super::reader::{AccountSnapshot, ChainReader, PoolMetadata};
use super::ChainError;

#[derive(Default)]
struct StubState {
    comptrollers: HashMap<Address, Address>,
    names: HashMap<Address, String>,
    symbols: HashMap<Address, String>,
    decimals: HashMap<Address, u32>,
    underlyings: HashMap<Address, Address>,
    interest_rate_models: HashMap<Address, Address>,
    reserve_factors: HashMap<Address, U256>,
    accrual_block_numbers: HashMap<Address, u64>,
    total_supplies: HashMap<Address, U256>,
    exchange_rates: HashMap<Address, U256>,
    borrow_indexes: HashMap<Address, U256>,
    total_reserves: HashMap<Address, U256>,
    total_borrows: HashMap<Address, U256>,
    cash: HashMap<Address, U256>,
    borrow_rates: HashMap<Address, U256>,
    supply_rates: HashMap<Address, U256>,
    balances: HashMap<(Address, Address), U256>,
    snapshots: HashMap<(Address, Address), AccountSnapshot>,
    prices: HashMap<Address, U256>,
    pools: HashMap<U256, PoolMetadata>,
}

/// Every read returns whatever was last set; unset reads return zero-valued
/// defaults, mirroring a market with no activity.
#[derive(Default)]
pub struct StubChainReader {
    state: Mutex<StubState>,
}

impl StubChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_comptroller(&self, vtoken: Address, comptroller: Address) {
        self.lock().comptrollers.insert(vtoken, comptroller);
    }

    pub fn set_token(&self, token: Address, name: &str, symbol: &str, decimals: u32) {
        let mut state = self.lock();
        state.names.insert(token, name.to_string());
        state.symbols.insert(token, symbol.to_string());
        state.decimals.insert(token, decimals);
    }

    pub fn set_underlying(&self, vtoken: Address, underlying: Address) {
        self.lock().underlyings.insert(vtoken, underlying);
    }

    pub fn set_interest_rate_model(&self, vtoken: Address, model: Address) {
        self.lock().interest_rate_models.insert(vtoken, model);
    }

    pub fn set_reserve_factor(&self, vtoken: Address, value: U256) {
        self.lock().reserve_factors.insert(vtoken, value);
    }

    pub fn set_accrual_block_number(&self, vtoken: Address, value: u64) {
        self.lock().accrual_block_numbers.insert(vtoken, value);
    }

    pub fn set_total_supply(&self, vtoken: Address, value: U256) {
        self.lock().total_supplies.insert(vtoken, value);
    }

    pub fn set_exchange_rate(&self, vtoken: Address, value: U256) {
        self.lock().exchange_rates.insert(vtoken, value);
    }

    pub fn set_borrow_index(&self, vtoken: Address, value: U256) {
        self.lock().borrow_indexes.insert(vtoken, value);
    }

    pub fn set_total_reserves(&self, vtoken: Address, value: U256) {
        self.lock().total_reserves.insert(vtoken, value);
    }

    pub fn set_total_borrows(&self, vtoken: Address, value: U256) {
        self.lock().total_borrows.insert(vtoken, value);
    }

    pub fn set_cash(&self, vtoken: Address, value: U256) {
        self.lock().cash.insert(vtoken, value);
    }

    pub fn set_borrow_rate(&self, vtoken: Address, value: U256) {
        self.lock().borrow_rates.insert(vtoken, value);
    }

    pub fn set_supply_rate(&self, vtoken: Address, value: U256) {
        self.lock().supply_rates.insert(vtoken, value);
    }

    pub fn set_balance_of(&self, vtoken: Address, account: Address, value: U256) {
        self.lock().balances.insert((vtoken, account), value);
    }

    pub fn set_account_snapshot(&self, vtoken: Address, account: Address, snapshot: AccountSnapshot) {
        self.lock().snapshots.insert((vtoken, account), snapshot);
    }

    pub fn set_underlying_price(&self, vtoken: Address, value: U256) {
        self.lock().prices.insert(vtoken, value);
    }

    pub fn set_pool(&self, index: U256, metadata: PoolMetadata) {
        self.lock().pools.insert(index, metadata);
    }
}

#[async_trait]
impl ChainReader for StubChainReader {
    async fn comptroller(&self, vtoken: Address) -> Result<Address, ChainError> {
        Ok(self.lock().comptrollers.get(&vtoken).copied().unwrap_or_default())
    }

    async fn token_name(&self, token: Address) -> Result<String, ChainError> {
        Ok(self.lock().names.get(&token).cloned().unwrap_or_default())
    }

    async fn token_symbol(&self, token: Address) -> Result<String, ChainError> {
        Ok(self.lock().symbols.get(&token).cloned().unwrap_or_default())
    }

    async fn token_decimals(&self, token: Address) -> Result<u32, ChainError> {
        Ok(self.lock().decimals.get(&token).copied().unwrap_or(18))
    }

    async fn underlying(&self, vtoken: Address) -> Result<Address, ChainError> {
        Ok(self.lock().underlyings.get(&vtoken).copied().unwrap_or_default())
    }

    async fn interest_rate_model(&self, vtoken: Address) -> Result<Address, ChainError> {
        Ok(self
            .lock()
            .interest_rate_models
            .get(&vtoken)
            .copied()
            .unwrap_or_default())
    }

    async fn reserve_factor_mantissa(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().reserve_factors.get(&vtoken).copied().unwrap_or_default())
    }

    async fn accrual_block_number(&self, vtoken: Address) -> Result<u64, ChainError> {
        Ok(self
            .lock()
            .accrual_block_numbers
            .get(&vtoken)
            .copied()
            .unwrap_or_default())
    }

    async fn total_supply(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().total_supplies.get(&vtoken).copied().unwrap_or_default())
    }

    async fn exchange_rate_stored(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().exchange_rates.get(&vtoken).copied().unwrap_or_default())
    }

    async fn borrow_index(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().borrow_indexes.get(&vtoken).copied().unwrap_or_default())
    }

    async fn total_reserves(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().total_reserves.get(&vtoken).copied().unwrap_or_default())
    }

    async fn total_borrows(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().total_borrows.get(&vtoken).copied().unwrap_or_default())
    }

    async fn get_cash(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().cash.get(&vtoken).copied().unwrap_or_default())
    }

    async fn borrow_rate_per_block(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().borrow_rates.get(&vtoken).copied().unwrap_or_default())
    }

    async fn supply_rate_per_block(&self, vtoken: Address) -> Result<U256, ChainError> {
        Ok(self.lock().supply_rates.get(&vtoken).copied().unwrap_or_default())
    }

    async fn balance_of(&self, vtoken: Address, account: Address) -> Result<U256, ChainError> {
        Ok(self
            .lock()
            .balances
            .get(&(vtoken, account))
            .copied()
            .unwrap_or_default())
    }

    async fn get_account_snapshot(
        &self,
        vtoken: Address,
        account: Address,
    ) -> Result<AccountSnapshot, ChainError> {
        Ok(self
            .lock()
            .snapshots
            .get(&(vtoken, account))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_underlying_price(
        &self,
        _oracle: Address,
        vtoken: Address,
    ) -> Result<U256, ChainError> {
        Ok(self.lock().prices.get(&vtoken).copied().unwrap_or_default())
    }

    async fn get_pool_by_id(
        &self,
        _registry: Address,
        index: U256,
    ) -> Result<PoolMetadata, ChainError> {
        self.lock()
            .pools
            .get(&index)
            .cloned()
            .ok_or_else(|| ChainError::Decode(format!("no pool registered at index {}", index)))
    }
}
