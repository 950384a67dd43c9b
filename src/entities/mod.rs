//! Persisted entity records.
//!
//! Every entity is keyed by a deterministic string id (see `crate::ids`) and
//! stored as a JSON document under its kind's table. Numeric wei fields keep
//! the raw on-chain integers; `*-rate`, index, and price fields carry the
//! truncated decimal strings produced by `crate::numeric`.

use alloy::primitives::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A storable record with a fixed kind (doubles as the table name).
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// A lending pool, keyed by its comptroller address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub risk_rating: String,
    pub block_posted: u64,
    pub timestamp_posted: u64,
    /// Member market ids, in registration order.
    pub markets: Vec<String>,
}

impl Entity for Pool {
    const KIND: &'static str = "pools";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A vToken market, keyed by the vToken address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub pool: String,
    pub name: String,
    pub symbol: String,
    pub underlying_address: String,
    pub underlying_name: String,
    pub underlying_symbol: String,
    pub underlying_decimals: u32,
    pub underlying_price: String,
    pub interest_rate_model_address: String,
    pub access_control_manager: Option<String>,
    pub reserve_factor_mantissa: U256,
    pub exchange_rate: String,
    pub borrow_index: String,
    pub borrow_rate: String,
    pub supply_rate: String,
    pub cash: String,
    pub reserves_wei: U256,
    pub treasury_total_supply_wei: U256,
    pub treasury_total_borrows_wei: U256,
    pub bad_debt_wei: U256,
    pub supplier_count: u64,
    pub borrower_count: u64,
    pub accrual_block_number: u64,
    pub block_timestamp: u64,
}

impl Entity for Market {
    const KIND: &'static str = "markets";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A chain participant, keyed by wallet address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub count_liquidated: u64,
    pub count_liquidator: u64,
    pub has_borrowed: bool,
}

impl Entity for Account {
    const KIND: &'static str = "accounts";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One account's position in one market, keyed by `market-account`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountVToken {
    pub id: String,
    pub symbol: String,
    pub account: String,
    pub market: String,
    pub entered_market: bool,
    pub accrual_block_number: u64,
    pub user_supply_balance_wei: U256,
    pub user_borrow_balance_wei: U256,
    pub total_underlying_redeemed_wei: U256,
    pub total_underlying_repaid_wei: U256,
    pub account_borrow_index: String,
}

impl Entity for AccountVToken {
    const KIND: &'static str = "account_vtokens";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Mint,
    Redeem,
    Borrow,
    Repay,
    Liquidate,
    Transfer,
}

/// Immutable record of a single market action, keyed by `txhash-logindex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub from: String,
    pub to: String,
    /// Normalized amount: vToken units for mint/redeem/liquidate/transfer,
    /// underlying units for borrow/repay.
    pub amount: String,
    pub underlying_amount: Option<String>,
    pub underlying_repay_amount: Option<String>,
    pub block_number: u64,
    pub block_timestamp: u64,
}

impl Entity for Transaction {
    const KIND: &'static str = "transactions";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Links a position to a transaction that touched it, keyed by
/// `account-txhash-logindex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountVTokenTransaction {
    pub id: String,
    /// AccountVToken id of the touched position.
    pub account_vtoken: String,
    pub tx_hash: String,
    pub timestamp: u64,
    pub block: u64,
    pub log_index: u64,
}

impl Entity for AccountVTokenTransaction {
    const KIND: &'static str = "account_vtoken_transactions";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One bad-debt accrual against a position, keyed by `txhash-logindex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountVTokenBadDebt {
    pub id: String,
    /// AccountVToken id of the defaulted position.
    pub account: String,
    pub amount: U256,
    pub block: u64,
    pub timestamp: u64,
}

impl Entity for AccountVTokenBadDebt {
    const KIND: &'static str = "account_vtoken_bad_debts";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Per-market reward emission rates, keyed by `distributor-market`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSpeed {
    pub id: String,
    pub rewards_distributor: String,
    pub market: String,
    pub supply_speed_per_block_mantissa: U256,
    pub borrow_speed_per_block_mantissa: U256,
}

impl Entity for RewardSpeed {
    const KIND: &'static str = "reward_speeds";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    NotStarted,
    Started,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionKind {
    LargePoolDebt,
    LargeRiskFund,
}

/// Shortfall auction lifecycle for a pool, keyed by comptroller address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub id: String,
    pub status: AuctionStatus,
    pub kind: AuctionKind,
    pub start_block: u64,
    pub seized_risk_fund: U256,
    pub start_bid_bps: U256,
    pub markets: Vec<String>,
    pub markets_debt: Vec<U256>,
}

impl Entity for Auction {
    const KIND: &'static str = "auctions";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Indexer progress marker, keyed by network name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub last_processed_block: u64,
}

impl Entity for Checkpoint {
    const KIND: &'static str = "checkpoints";

    fn id(&self) -> &str {
        &self.id
    }
}
