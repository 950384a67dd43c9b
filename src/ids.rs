//! Deterministic entity id composition.
//!
//! Ids are pure functions of on-chain identifiers so replays are idempotent.
//! All addresses render as lowercase 0x-prefixed hex; composite ids join
//! their parts with '-'. These must stay stable across versions.

use alloy::primitives::{Address, B256};

pub fn pool_id(comptroller: Address) -> String {
    format!("{comptroller:#x}")
}

pub fn market_id(vtoken: Address) -> String {
    format!("{vtoken:#x}")
}

pub fn account_id(account: Address) -> String {
    format!("{account:#x}")
}

pub fn account_vtoken_id(market: Address, account: Address) -> String {
    format!("{market:#x}-{account:#x}")
}

pub fn transaction_id(tx_hash: B256, log_index: u64) -> String {
    format!("{tx_hash:#x}-{log_index}")
}

pub fn account_vtoken_transaction_id(account: Address, tx_hash: B256, log_index: u64) -> String {
    format!("{account:#x}-{tx_hash:#x}-{log_index}")
}

pub fn bad_debt_event_id(tx_hash: B256, log_index: u64) -> String {
    format!("{tx_hash:#x}-{log_index}")
}

pub fn reward_speed_id(distributor: Address, market: Address) -> String {
    format!("{distributor:#x}-{market:#x}")
}

pub fn auction_id(comptroller: Address) -> String {
    format!("{comptroller:#x}")
}
