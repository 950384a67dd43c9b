//! Get-or-create entity accessors.
//!
//! Lookup by composed id, constructing defaults on a miss. Creation is the
//! only place entities read from the chain; afterwards every field is driven
//! by events. Absence is never an error.

use alloy::primitives::{Address, U256};

use crate::constants::MANTISSA_DECIMALS;
use crate::entities::{
    Account, AccountVToken, AccountVTokenTransaction, Auction, AuctionKind, AuctionStatus, Market,
    Pool, RewardSpeed,
};
use crate::events::DecodedEvent;
use crate::ids;
use crate::numeric::mantissa_to_decimal;

use super::context::HandlerContext;
use super::error::HandlerError;

/// Price oracle values are scaled so that `price / 10^(36 - decimals)` is the
/// USD price of one whole token.
const PRICE_MANTISSA_DECIMALS: u32 = 36;

/// Load a pool, creating it from the registry metadata at `index` on a miss.
/// New pools are persisted immediately.
pub async fn get_or_create_pool(
    ctx: &HandlerContext<'_>,
    comptroller: Address,
    index: U256,
) -> Result<Pool, HandlerError> {
    let id = ids::pool_id(comptroller);
    if let Some(pool) = ctx.store.get::<Pool>(&id).await? {
        return Ok(pool);
    }

    let metadata = ctx
        .chain
        .get_pool_by_id(ctx.addresses.pool_registry, index)
        .await?;

    let pool = Pool {
        id,
        name: metadata.name,
        creator: format!("{:#x}", metadata.creator),
        risk_rating: "MINIMAL_RISK".to_string(),
        block_posted: metadata.block_posted,
        timestamp_posted: metadata.timestamp_posted,
        markets: Vec::new(),
    };
    ctx.store.save(&pool).await?;
    Ok(pool)
}

/// Load a market, creating it from one-time chain reads on a miss.
///
/// `comptroller` is read from the vToken when the caller does not supply it.
/// New markets are persisted immediately.
pub async fn get_or_create_market(
    ctx: &HandlerContext<'_>,
    vtoken: Address,
    comptroller: Option<Address>,
    block_timestamp: u64,
) -> Result<Market, HandlerError> {
    let id = ids::market_id(vtoken);
    if let Some(market) = ctx.store.get::<Market>(&id).await? {
        return Ok(market);
    }

    let comptroller = match comptroller {
        Some(address) => address,
        None => ctx.chain.comptroller(vtoken).await?,
    };

    let name = ctx.chain.token_name(vtoken).await?;
    let symbol = ctx.chain.token_symbol(vtoken).await?;
    let underlying = ctx.chain.underlying(vtoken).await?;
    let underlying_name = ctx.chain.token_name(underlying).await?;
    let underlying_symbol = ctx.chain.token_symbol(underlying).await?;
    let underlying_decimals = ctx.chain.token_decimals(underlying).await?;
    let interest_rate_model = ctx.chain.interest_rate_model(vtoken).await?;
    let reserve_factor_mantissa = ctx.chain.reserve_factor_mantissa(vtoken).await?;
    let underlying_price = ctx
        .chain
        .get_underlying_price(ctx.addresses.oracle, vtoken)
        .await?;

    let market = Market {
        id,
        pool: ids::pool_id(comptroller),
        name,
        symbol,
        underlying_address: format!("{underlying:#x}"),
        underlying_name,
        underlying_symbol,
        underlying_decimals,
        underlying_price: mantissa_to_decimal(
            underlying_price,
            PRICE_MANTISSA_DECIMALS - underlying_decimals,
        ),
        interest_rate_model_address: format!("{interest_rate_model:#x}"),
        access_control_manager: None,
        reserve_factor_mantissa,
        exchange_rate: "0".to_string(),
        borrow_index: "0".to_string(),
        borrow_rate: "0".to_string(),
        supply_rate: "0".to_string(),
        cash: "0".to_string(),
        reserves_wei: U256::ZERO,
        treasury_total_supply_wei: U256::ZERO,
        treasury_total_borrows_wei: U256::ZERO,
        bad_debt_wei: U256::ZERO,
        supplier_count: 0,
        borrower_count: 0,
        accrual_block_number: 0,
        block_timestamp,
    };
    ctx.store.save(&market).await?;
    Ok(market)
}

/// Load an account, creating a zero-valued one on a miss.
/// New accounts are persisted immediately.
pub async fn get_or_create_account(
    ctx: &HandlerContext<'_>,
    address: Address,
) -> Result<Account, HandlerError> {
    let id = ids::account_id(address);
    if let Some(account) = ctx.store.get::<Account>(&id).await? {
        return Ok(account);
    }

    let account = Account {
        id,
        count_liquidated: 0,
        count_liquidator: 0,
        has_borrowed: false,
    };
    ctx.store.save(&account).await?;
    Ok(account)
}

/// Load an account position, seeding balances from the live account snapshot
/// on a miss. Persistence is left to the caller, which always follows up with
/// event-driven field updates.
pub async fn get_or_create_account_vtoken(
    ctx: &HandlerContext<'_>,
    market_symbol: &str,
    account: Address,
    market: Address,
    entered_market: bool,
) -> Result<AccountVToken, HandlerError> {
    let id = ids::account_vtoken_id(market, account);
    if let Some(position) = ctx.store.get::<AccountVToken>(&id).await? {
        return Ok(position);
    }

    // Seed with real on-chain balances so positions opened before the
    // collection start block are still accurate.
    let snapshot = ctx.chain.get_account_snapshot(market, account).await?;

    Ok(AccountVToken {
        id,
        symbol: market_symbol.to_string(),
        account: ids::account_id(account),
        market: ids::market_id(market),
        entered_market,
        accrual_block_number: 0,
        user_supply_balance_wei: snapshot.vtoken_balance,
        user_borrow_balance_wei: snapshot.borrow_balance,
        total_underlying_redeemed_wei: U256::ZERO,
        total_underlying_repaid_wei: U256::ZERO,
        account_borrow_index: "0".to_string(),
    })
}

/// Record the link between a position and the transaction that touched it.
/// Idempotent per (account, tx, log index); persisted immediately.
pub async fn get_or_create_account_vtoken_transaction(
    ctx: &HandlerContext<'_>,
    account: Address,
    market: Address,
    event: &DecodedEvent,
) -> Result<AccountVTokenTransaction, HandlerError> {
    let id = ids::account_vtoken_transaction_id(account, event.transaction_hash, event.log_index);
    if let Some(link) = ctx.store.get::<AccountVTokenTransaction>(&id).await? {
        return Ok(link);
    }

    let link = AccountVTokenTransaction {
        id,
        account_vtoken: ids::account_vtoken_id(market, account),
        tx_hash: format!("{:#x}", event.transaction_hash),
        timestamp: event.block_timestamp,
        block: event.block_number,
        log_index: event.log_index,
    };
    ctx.store.save(&link).await?;
    Ok(link)
}

/// Load a reward speed record, creating a zero-speed one on a miss.
/// New records are persisted immediately.
pub async fn get_or_create_reward_speed(
    ctx: &HandlerContext<'_>,
    distributor: Address,
    market: Address,
) -> Result<RewardSpeed, HandlerError> {
    let id = ids::reward_speed_id(distributor, market);
    if let Some(speed) = ctx.store.get::<RewardSpeed>(&id).await? {
        return Ok(speed);
    }

    let speed = RewardSpeed {
        id,
        rewards_distributor: format!("{distributor:#x}"),
        market: ids::market_id(market),
        supply_speed_per_block_mantissa: U256::ZERO,
        borrow_speed_per_block_mantissa: U256::ZERO,
    };
    ctx.store.save(&speed).await?;
    Ok(speed)
}

/// Load a pool's auction record, creating a not-started one on a miss.
/// New records are persisted immediately.
pub async fn get_or_create_auction(
    ctx: &HandlerContext<'_>,
    comptroller: Address,
) -> Result<Auction, HandlerError> {
    let id = ids::auction_id(comptroller);
    if let Some(auction) = ctx.store.get::<Auction>(&id).await? {
        return Ok(auction);
    }

    let auction = Auction {
        id,
        status: AuctionStatus::NotStarted,
        kind: AuctionKind::LargePoolDebt,
        start_block: 0,
        seized_risk_fund: U256::ZERO,
        start_bid_bps: U256::ZERO,
        markets: Vec::new(),
        markets_debt: Vec::new(),
    };
    ctx.store.save(&auction).await?;
    Ok(auction)
}

/// Normalize a wei amount of the market's underlying token.
pub fn normalize_underlying(market: &Market, amount: U256) -> String {
    mantissa_to_decimal(amount, market.underlying_decimals)
}

/// Normalize an interest rate mantissa to its decimal string.
pub fn normalize_rate(value: U256) -> String {
    mantissa_to_decimal(value, MANTISSA_DECIMALS)
}
