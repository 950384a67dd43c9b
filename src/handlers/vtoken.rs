//! Handlers for vToken market events.
//!
//! Balance-affecting events re-read the live on-chain balance or snapshot for
//! the affected accounts; the chain value overwrites whatever was stored.
//! Supplier/borrower counters move on zero boundary crossings of the
//! post-event balance.

use async_trait::async_trait;

use crate::constants::VTOKEN_DECIMALS;
use crate::entities::{AccountVTokenBadDebt, Transaction, TransactionKind};
use crate::events::{DecodedEvent, SOURCE_VTOKEN};
use crate::ids;
use crate::numeric::{mantissa_to_decimal, vtoken_to_underlying_wei};

use super::context::{require_address, require_uint, HandlerContext};
use super::error::HandlerError;
use super::operations::{
    get_or_create_account, get_or_create_account_vtoken, get_or_create_account_vtoken_transaction,
    get_or_create_market, normalize_rate, normalize_underlying,
};
use super::registry::HandlerRegistry;
use super::traits::{EventHandler, EventTrigger};

pub struct MintHandler;

#[async_trait]
impl EventHandler for MintHandler {
    fn name(&self) -> &'static str {
        "MintHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "Mint(address,uint256,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let minter = require_address(event, "minter")?;
        let mint_amount = require_uint(event, "mintAmount")?;
        let mint_tokens = require_uint(event, "mintTokens")?;

        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        get_or_create_account(ctx, minter).await?;

        let transaction = Transaction {
            id: ids::transaction_id(event.transaction_hash, event.log_index),
            kind: TransactionKind::Mint,
            from: ids::market_id(event.address),
            to: ids::account_id(minter),
            amount: mantissa_to_decimal(mint_tokens, VTOKEN_DECIMALS),
            underlying_amount: Some(normalize_underlying(&market, mint_amount)),
            underlying_repay_amount: None,
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
        };
        ctx.store.save(&transaction).await?;

        let balance = ctx.chain.balance_of(event.address, minter).await?;
        let mut position =
            get_or_create_account_vtoken(ctx, &market.symbol, minter, event.address, false).await?;
        position.user_supply_balance_wei = balance;
        position.accrual_block_number = event.block_number;
        ctx.store.save(&position).await?;
        get_or_create_account_vtoken_transaction(ctx, minter, event.address, event).await?;

        // Whole balance equal to the minted amount means a fresh supplier.
        if !balance.is_zero() && balance == mint_tokens {
            market.supplier_count += 1;
            ctx.store.save(&market).await?;
        }
        Ok(())
    }
}

pub struct RedeemHandler;

#[async_trait]
impl EventHandler for RedeemHandler {
    fn name(&self) -> &'static str {
        "RedeemHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "Redeem(address,uint256,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let redeemer = require_address(event, "redeemer")?;
        let redeem_amount = require_uint(event, "redeemAmount")?;
        let redeem_tokens = require_uint(event, "redeemTokens")?;

        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        get_or_create_account(ctx, redeemer).await?;

        let transaction = Transaction {
            id: ids::transaction_id(event.transaction_hash, event.log_index),
            kind: TransactionKind::Redeem,
            from: ids::market_id(event.address),
            to: ids::account_id(redeemer),
            amount: mantissa_to_decimal(redeem_tokens, VTOKEN_DECIMALS),
            underlying_amount: Some(normalize_underlying(&market, redeem_amount)),
            underlying_repay_amount: None,
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
        };
        ctx.store.save(&transaction).await?;

        let balance = ctx.chain.balance_of(event.address, redeemer).await?;
        let mut position =
            get_or_create_account_vtoken(ctx, &market.symbol, redeemer, event.address, false)
                .await?;
        position.user_supply_balance_wei = balance;
        position.accrual_block_number = event.block_number;
        ctx.store.save(&position).await?;
        get_or_create_account_vtoken_transaction(ctx, redeemer, event.address, event).await?;

        if balance.is_zero() && market.supplier_count > 0 {
            market.supplier_count -= 1;
            ctx.store.save(&market).await?;
        }
        Ok(())
    }
}

pub struct BorrowHandler;

#[async_trait]
impl EventHandler for BorrowHandler {
    fn name(&self) -> &'static str {
        "BorrowHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "Borrow(address,uint256,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let borrower = require_address(event, "borrower")?;
        let borrow_amount = require_uint(event, "borrowAmount")?;
        let account_borrows = require_uint(event, "accountBorrows")?;

        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        let mut account = get_or_create_account(ctx, borrower).await?;
        account.has_borrowed = true;
        ctx.store.save(&account).await?;

        let transaction = Transaction {
            id: ids::transaction_id(event.transaction_hash, event.log_index),
            kind: TransactionKind::Borrow,
            from: ids::market_id(event.address),
            to: ids::account_id(borrower),
            amount: normalize_underlying(&market, borrow_amount),
            underlying_amount: None,
            underlying_repay_amount: None,
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
        };
        ctx.store.save(&transaction).await?;

        let mut position =
            get_or_create_account_vtoken(ctx, &market.symbol, borrower, event.address, false)
                .await?;
        position.user_borrow_balance_wei = account_borrows;
        position.account_borrow_index = market.borrow_index.clone();
        position.accrual_block_number = event.block_number;
        ctx.store.save(&position).await?;
        get_or_create_account_vtoken_transaction(ctx, borrower, event.address, event).await?;

        // Outstanding debt equal to this borrow means a fresh borrower.
        if !account_borrows.is_zero() && account_borrows == borrow_amount {
            market.borrower_count += 1;
            ctx.store.save(&market).await?;
        }
        Ok(())
    }
}

pub struct RepayBorrowHandler;

#[async_trait]
impl EventHandler for RepayBorrowHandler {
    fn name(&self) -> &'static str {
        "RepayBorrowHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "RepayBorrow(address,address,uint256,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let borrower = require_address(event, "borrower")?;
        let repay_amount = require_uint(event, "repayAmount")?;
        let account_borrows = require_uint(event, "accountBorrows")?;

        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        get_or_create_account(ctx, borrower).await?;

        let transaction = Transaction {
            id: ids::transaction_id(event.transaction_hash, event.log_index),
            kind: TransactionKind::Repay,
            from: ids::market_id(event.address),
            to: ids::account_id(borrower),
            amount: normalize_underlying(&market, repay_amount),
            underlying_amount: None,
            underlying_repay_amount: None,
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
        };
        ctx.store.save(&transaction).await?;

        let mut position =
            get_or_create_account_vtoken(ctx, &market.symbol, borrower, event.address, false)
                .await?;
        position.user_borrow_balance_wei = account_borrows;
        position.account_borrow_index = market.borrow_index.clone();
        position.accrual_block_number = event.block_number;
        position.total_underlying_repaid_wei =
            position.total_underlying_repaid_wei.saturating_add(repay_amount);
        ctx.store.save(&position).await?;
        get_or_create_account_vtoken_transaction(ctx, borrower, event.address, event).await?;

        if account_borrows.is_zero() && market.borrower_count > 0 {
            market.borrower_count -= 1;
            ctx.store.save(&market).await?;
        }
        Ok(())
    }
}

pub struct LiquidateBorrowHandler;

#[async_trait]
impl EventHandler for LiquidateBorrowHandler {
    fn name(&self) -> &'static str {
        "LiquidateBorrowHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "LiquidateBorrow(address,address,uint256,address,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let liquidator = require_address(event, "liquidator")?;
        let borrower = require_address(event, "borrower")?;
        let repay_amount = require_uint(event, "repayAmount")?;
        let seize_tokens = require_uint(event, "seizeTokens")?;

        let market = get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;

        let mut liquidator_account = get_or_create_account(ctx, liquidator).await?;
        liquidator_account.count_liquidator += 1;
        ctx.store.save(&liquidator_account).await?;

        let mut borrower_account = get_or_create_account(ctx, borrower).await?;
        borrower_account.count_liquidated += 1;
        ctx.store.save(&borrower_account).await?;

        let transaction = Transaction {
            id: ids::transaction_id(event.transaction_hash, event.log_index),
            kind: TransactionKind::Liquidate,
            from: ids::market_id(event.address),
            to: ids::account_id(borrower),
            amount: mantissa_to_decimal(seize_tokens, VTOKEN_DECIMALS),
            underlying_amount: None,
            underlying_repay_amount: Some(normalize_underlying(&market, repay_amount)),
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
        };
        ctx.store.save(&transaction).await?;
        Ok(())
    }
}

pub struct TransferHandler;

#[async_trait]
impl EventHandler for TransferHandler {
    fn name(&self) -> &'static str {
        "TransferHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "Transfer(address,address,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let from = require_address(event, "from")?;
        let to = require_address(event, "to")?;
        let amount = require_uint(event, "amount")?;

        let market = get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;

        // A side equal to the market itself is a mint or redeem leg and is
        // already covered by those handlers.
        if from != event.address {
            get_or_create_account(ctx, from).await?;
            let snapshot = ctx.chain.get_account_snapshot(event.address, from).await?;
            let mut position =
                get_or_create_account_vtoken(ctx, &market.symbol, from, event.address, false)
                    .await?;
            position.user_supply_balance_wei = snapshot.vtoken_balance.saturating_sub(amount);
            let exchange_rate = ctx.chain.exchange_rate_stored(event.address).await?;
            position.total_underlying_redeemed_wei = position
                .total_underlying_redeemed_wei
                .saturating_add(vtoken_to_underlying_wei(amount, exchange_rate));
            position.accrual_block_number = event.block_number;
            ctx.store.save(&position).await?;
            get_or_create_account_vtoken_transaction(ctx, from, event.address, event).await?;
        }

        if to != event.address {
            get_or_create_account(ctx, to).await?;
            let snapshot = ctx.chain.get_account_snapshot(event.address, to).await?;
            let mut position =
                get_or_create_account_vtoken(ctx, &market.symbol, to, event.address, false)
                    .await?;
            position.user_supply_balance_wei = snapshot.vtoken_balance.saturating_add(amount);
            position.accrual_block_number = event.block_number;
            ctx.store.save(&position).await?;
            get_or_create_account_vtoken_transaction(ctx, to, event.address, event).await?;
        }

        let transaction = Transaction {
            id: ids::transaction_id(event.transaction_hash, event.log_index),
            kind: TransactionKind::Transfer,
            from: ids::account_id(from),
            to: ids::account_id(to),
            amount: mantissa_to_decimal(amount, VTOKEN_DECIMALS),
            underlying_amount: None,
            underlying_repay_amount: None,
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
        };
        ctx.store.save(&transaction).await?;
        Ok(())
    }
}

pub struct AccrueInterestHandler;

#[async_trait]
impl EventHandler for AccrueInterestHandler {
    fn name(&self) -> &'static str {
        "AccrueInterestHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "AccrueInterest(uint256,uint256,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let vtoken = event.address;
        let mut market = get_or_create_market(ctx, vtoken, None, event.block_timestamp).await?;

        // Full refresh from chain state; the event parameters only cover a
        // subset of the fields that moved.
        market.accrual_block_number = ctx.chain.accrual_block_number(vtoken).await?;
        market.block_timestamp = event.block_timestamp;
        market.treasury_total_supply_wei = ctx.chain.total_supply(vtoken).await?;
        market.exchange_rate = mantissa_to_decimal(
            ctx.chain.exchange_rate_stored(vtoken).await?,
            crate::numeric::exchange_rate_scale(market.underlying_decimals),
        );
        market.borrow_index = mantissa_to_decimal(
            ctx.chain.borrow_index(vtoken).await?,
            crate::constants::MANTISSA_DECIMALS,
        );
        market.reserves_wei = ctx.chain.total_reserves(vtoken).await?;
        market.treasury_total_borrows_wei = ctx.chain.total_borrows(vtoken).await?;
        market.cash = mantissa_to_decimal(
            ctx.chain.get_cash(vtoken).await?,
            market.underlying_decimals,
        );
        market.borrow_rate = normalize_rate(ctx.chain.borrow_rate_per_block(vtoken).await?);
        market.supply_rate = normalize_rate(ctx.chain.supply_rate_per_block(vtoken).await?);

        ctx.store.save(&market).await?;
        Ok(())
    }
}

pub struct NewReserveFactorHandler;

#[async_trait]
impl EventHandler for NewReserveFactorHandler {
    fn name(&self) -> &'static str {
        "NewReserveFactorHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "NewReserveFactor(uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let new_factor = require_uint(event, "newReserveFactorMantissa")?;
        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        market.reserve_factor_mantissa = new_factor;
        ctx.store.save(&market).await?;
        Ok(())
    }
}

pub struct ReservesAddedHandler;

#[async_trait]
impl EventHandler for ReservesAddedHandler {
    fn name(&self) -> &'static str {
        "ReservesAddedHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "ReservesAdded(address,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let new_total = require_uint(event, "newTotalReserves")?;
        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        market.reserves_wei = new_total;
        ctx.store.save(&market).await?;
        Ok(())
    }
}

pub struct ReservesReducedHandler;

#[async_trait]
impl EventHandler for ReservesReducedHandler {
    fn name(&self) -> &'static str {
        "ReservesReducedHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "ReservesReduced(address,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let new_total = require_uint(event, "newTotalReserves")?;
        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        market.reserves_wei = new_total;
        ctx.store.save(&market).await?;
        Ok(())
    }
}

pub struct NewMarketInterestRateModelHandler;

#[async_trait]
impl EventHandler for NewMarketInterestRateModelHandler {
    fn name(&self) -> &'static str {
        "NewMarketInterestRateModelHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "NewMarketInterestRateModel(address,address)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let new_model = require_address(event, "newInterestRateModel")?;
        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        market.interest_rate_model_address = format!("{new_model:#x}");
        ctx.store.save(&market).await?;
        Ok(())
    }
}

pub struct NewAccessControlManagerHandler;

#[async_trait]
impl EventHandler for NewAccessControlManagerHandler {
    fn name(&self) -> &'static str {
        "NewAccessControlManagerHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "NewAccessControlManager(address,address)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let new_manager = require_address(event, "newAccessControlManager")?;
        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        market.access_control_manager = Some(format!("{new_manager:#x}"));
        ctx.store.save(&market).await?;
        Ok(())
    }
}

pub struct BadDebtIncreasedHandler;

#[async_trait]
impl EventHandler for BadDebtIncreasedHandler {
    fn name(&self) -> &'static str {
        "BadDebtIncreasedHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_VTOKEN,
            "BadDebtIncreased(address,uint256,uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let borrower = require_address(event, "borrower")?;
        let bad_debt_delta = require_uint(event, "badDebtDelta")?;
        let bad_debt_new = require_uint(event, "badDebtNew")?;

        let mut market =
            get_or_create_market(ctx, event.address, None, event.block_timestamp).await?;
        market.bad_debt_wei = bad_debt_new;
        ctx.store.save(&market).await?;

        let bad_debt = AccountVTokenBadDebt {
            id: ids::bad_debt_event_id(event.transaction_hash, event.log_index),
            account: ids::account_vtoken_id(event.address, borrower),
            amount: bad_debt_delta,
            block: event.block_number,
            timestamp: event.block_timestamp,
        };
        ctx.store.save(&bad_debt).await?;
        Ok(())
    }
}

pub fn register_handlers(registry: &mut HandlerRegistry) {
    registry.register(MintHandler);
    registry.register(RedeemHandler);
    registry.register(BorrowHandler);
    registry.register(RepayBorrowHandler);
    registry.register(LiquidateBorrowHandler);
    registry.register(TransferHandler);
    registry.register(AccrueInterestHandler);
    registry.register(NewReserveFactorHandler);
    registry.register(ReservesAddedHandler);
    registry.register(ReservesReducedHandler);
    registry.register(NewMarketInterestRateModelHandler);
    registry.register(NewAccessControlManagerHandler);
    registry.register(BadDebtIncreasedHandler);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use alloy::primitives::{Address, B256, U256};

    use super::*;
    use crate::chain::stub::StubChainReader;
    use crate::chain::AccountSnapshot;
    use crate::entities::{Account, AccountVToken, AccountVTokenTransaction, Market};
    use crate::events::DecodedValue;
    use crate::handlers::context::ProtocolAddresses;
    use crate::store::{EntityStore, MemoryBackend};

    const BLOCK: u64 = 1;
    const TIMESTAMP: u64 = 1662990421;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn vtoken() -> Address {
        addr(0xaa)
    }

    fn user1() -> Address {
        addr(0x01)
    }

    fn user2() -> Address {
        addr(0x02)
    }

    fn test_store() -> EntityStore {
        EntityStore::new(Arc::new(MemoryBackend::new()))
    }

    fn addresses() -> ProtocolAddresses {
        ProtocolAddresses {
            pool_registry: addr(0xf0),
            oracle: addr(0xf1),
        }
    }

    /// Chain stub with the market's one-time reads wired up.
    fn market_chain() -> StubChainReader {
        let chain = StubChainReader::new();
        let underlying = addr(0xbb);
        chain.set_comptroller(vtoken(), addr(0x0c));
        chain.set_token(vtoken(), "Venus AAA", "vAAA", 8);
        chain.set_token(underlying, "AAA Coin", "AAA", 18);
        chain.set_underlying(vtoken(), underlying);
        chain.set_interest_rate_model(vtoken(), addr(0xcc));
        chain.set_reserve_factor(vtoken(), U256::from(100u64));
        chain.set_underlying_price(vtoken(), U256::from(99u64));
        chain
    }

    fn vtoken_event(
        name: &str,
        log_index: u64,
        params: Vec<(&str, DecodedValue)>,
    ) -> DecodedEvent {
        DecodedEvent {
            block_number: BLOCK,
            block_timestamp: TIMESTAMP,
            transaction_hash: B256::repeat_byte(0x11),
            log_index,
            address: vtoken(),
            source: SOURCE_VTOKEN.to_string(),
            name: name.to_string(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn mint_event(minter: Address, amount: u64, tokens: u64, log_index: u64) -> DecodedEvent {
        vtoken_event(
            "Mint",
            log_index,
            vec![
                ("minter", DecodedValue::Address(minter)),
                ("mintAmount", DecodedValue::Uint256(U256::from(amount))),
                ("mintTokens", DecodedValue::Uint256(U256::from(tokens))),
                ("accountBalance", DecodedValue::Uint256(U256::from(tokens))),
            ],
        )
    }

    fn redeem_event(redeemer: Address, amount: u64, tokens: u64, balance: u64) -> DecodedEvent {
        vtoken_event(
            "Redeem",
            0,
            vec![
                ("redeemer", DecodedValue::Address(redeemer)),
                ("redeemAmount", DecodedValue::Uint256(U256::from(amount))),
                ("redeemTokens", DecodedValue::Uint256(U256::from(tokens))),
                ("accountBalance", DecodedValue::Uint256(U256::from(balance))),
            ],
        )
    }

    fn borrow_event(borrower: Address, amount: u64, account_borrows: u64) -> DecodedEvent {
        vtoken_event(
            "Borrow",
            0,
            vec![
                ("borrower", DecodedValue::Address(borrower)),
                ("borrowAmount", DecodedValue::Uint256(U256::from(amount))),
                (
                    "accountBorrows",
                    DecodedValue::Uint256(U256::from(account_borrows)),
                ),
                ("totalBorrows", DecodedValue::Uint256(U256::from(0u64))),
            ],
        )
    }

    fn repay_event(borrower: Address, amount: u64, account_borrows: u64) -> DecodedEvent {
        vtoken_event(
            "RepayBorrow",
            0,
            vec![
                ("payer", DecodedValue::Address(borrower)),
                ("borrower", DecodedValue::Address(borrower)),
                ("repayAmount", DecodedValue::Uint256(U256::from(amount))),
                (
                    "accountBorrows",
                    DecodedValue::Uint256(U256::from(account_borrows)),
                ),
                ("totalBorrows", DecodedValue::Uint256(U256::from(0u64))),
            ],
        )
    }

    async fn get_market(store: &EntityStore) -> Market {
        store
            .get::<Market>(&ids::market_id(vtoken()))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_mint_records_transaction() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        let minter = user1();
        let mint_amount = 124620530798726345u64;
        let mint_tokens = 37035970026454u64;
        chain.set_balance_of(vtoken(), minter, U256::from(mint_tokens));

        let event = mint_event(minter, mint_amount, mint_tokens, 4);
        MintHandler.handle(&ctx, &event).await.unwrap();

        let id = ids::transaction_id(event.transaction_hash, 4);
        let tx = store.get::<Transaction>(&id).await.unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Mint);
        assert_eq!(tx.from, ids::market_id(vtoken()));
        assert_eq!(tx.to, ids::account_id(minter));
        assert_eq!(tx.amount, "370359.70026454");
        assert_eq!(tx.underlying_amount.as_deref(), Some("0.124620530798726345"));
        assert_eq!(tx.block_number, BLOCK);
        assert_eq!(tx.block_timestamp, TIMESTAMP);

        // The position is linked to the transaction that touched it.
        let link_id =
            ids::account_vtoken_transaction_id(minter, event.transaction_hash, 4);
        let link = store
            .get::<AccountVTokenTransaction>(&link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.account_vtoken, ids::account_vtoken_id(vtoken(), minter));
        assert_eq!(link.block, BLOCK);
        assert_eq!(link.timestamp, TIMESTAMP);
    }

    #[tokio::test]
    async fn test_redeem_records_transaction() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        let redeemer = user2();

        let event = redeem_event(redeemer, 124620530798726345, 37035970026454, 0);
        RedeemHandler.handle(&ctx, &event).await.unwrap();

        let id = ids::transaction_id(event.transaction_hash, 0);
        let tx = store.get::<Transaction>(&id).await.unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Redeem);
        assert_eq!(tx.from, ids::market_id(vtoken()));
        assert_eq!(tx.to, ids::account_id(redeemer));
        assert_eq!(tx.amount, "370359.70026454");
        assert_eq!(tx.underlying_amount.as_deref(), Some("0.124620530798726345"));
    }

    #[tokio::test]
    async fn test_borrow_updates_position() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        let borrower = user1();
        let account_borrows = 35970026454u64;

        let event = borrow_event(borrower, 1246205398726345, account_borrows);
        BorrowHandler.handle(&ctx, &event).await.unwrap();

        let tx_id = ids::transaction_id(event.transaction_hash, 0);
        let tx = store.get::<Transaction>(&tx_id).await.unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Borrow);
        assert_eq!(tx.from, ids::market_id(vtoken()));
        assert_eq!(tx.to, ids::account_id(borrower));

        let position_id = ids::account_vtoken_id(vtoken(), borrower);
        let position = store
            .get::<AccountVToken>(&position_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.accrual_block_number, BLOCK);
        assert_eq!(position.user_borrow_balance_wei, U256::from(account_borrows));
        assert_eq!(position.account_borrow_index, "0");

        let account = store
            .get::<Account>(&ids::account_id(borrower))
            .await
            .unwrap()
            .unwrap();
        assert!(account.has_borrowed);
    }

    #[tokio::test]
    async fn test_repay_updates_position() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        let borrower = user1();
        let repay_amount = 1246205398726345u64;
        let account_borrows = 35970026454u64;

        let event = repay_event(borrower, repay_amount, account_borrows);
        RepayBorrowHandler.handle(&ctx, &event).await.unwrap();

        let tx_id = ids::transaction_id(event.transaction_hash, 0);
        let tx = store.get::<Transaction>(&tx_id).await.unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Repay);
        assert_eq!(tx.to, ids::account_id(borrower));

        let position_id = ids::account_vtoken_id(vtoken(), borrower);
        let position = store
            .get::<AccountVToken>(&position_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.user_borrow_balance_wei, U256::from(account_borrows));
        assert_eq!(
            position.total_underlying_repaid_wei,
            U256::from(repay_amount)
        );
        assert_eq!(position.accrual_block_number, BLOCK);
    }

    #[tokio::test]
    async fn test_liquidate_records_transaction_and_counters() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        let borrower = user1();
        let liquidator = user2();

        let event = vtoken_event(
            "LiquidateBorrow",
            0,
            vec![
                ("liquidator", DecodedValue::Address(liquidator)),
                ("borrower", DecodedValue::Address(borrower)),
                (
                    "repayAmount",
                    DecodedValue::Uint256(U256::from(1246205398726345u64)),
                ),
                ("vTokenCollateral", DecodedValue::Address(addr(0xdd))),
                (
                    "seizeTokens",
                    DecodedValue::Uint256(U256::from(37035970026454u64)),
                ),
            ],
        );
        LiquidateBorrowHandler.handle(&ctx, &event).await.unwrap();

        let tx_id = ids::transaction_id(event.transaction_hash, 0);
        let tx = store.get::<Transaction>(&tx_id).await.unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Liquidate);
        assert_eq!(tx.amount, "370359.70026454");
        assert_eq!(
            tx.underlying_repay_amount.as_deref(),
            Some("0.001246205398726345")
        );

        let liquidator_account = store
            .get::<Account>(&ids::account_id(liquidator))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(liquidator_account.count_liquidator, 1);
        let borrower_account = store
            .get::<Account>(&ids::account_id(borrower))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(borrower_account.count_liquidated, 1);
    }

    #[tokio::test]
    async fn test_accrue_interest_refreshes_market() {
        let store = test_store();
        let chain = market_chain();
        chain.set_accrual_block_number(vtoken(), 999);
        chain.set_total_supply(vtoken(), U256::from(36504567163409u64));
        chain.set_exchange_rate(
            vtoken(),
            U256::from_str_radix("365045823500000000000000", 10).unwrap(),
        );
        chain.set_borrow_index(
            vtoken(),
            U256::from_str_radix("300000000000000000000", 10).unwrap(),
        );
        chain.set_total_reserves(vtoken(), U256::from(5128924555022289393u64));
        chain.set_total_borrows(vtoken(), U256::from(2641234234636158123u64));
        chain.set_cash(vtoken(), U256::from(1418171344423412457u64));
        chain.set_borrow_rate(vtoken(), U256::from(12678493u64));
        chain.set_supply_rate(vtoken(), U256::from(12678493u64));
        let ctx = HandlerContext::new(&store, &chain, addresses());

        let event = vtoken_event(
            "AccrueInterest",
            0,
            vec![
                (
                    "cashPrior",
                    DecodedValue::Uint256(U256::from(1246205398726345u64)),
                ),
                (
                    "interestAccumulated",
                    DecodedValue::Uint256(U256::from(26454u64)),
                ),
                ("borrowIndex", DecodedValue::Uint256(U256::from(1u64))),
                (
                    "totalBorrows",
                    DecodedValue::Uint256(U256::from(62197468301u64)),
                ),
            ],
        );
        AccrueInterestHandler.handle(&ctx, &event).await.unwrap();

        let market = get_market(&store).await;
        assert_eq!(market.accrual_block_number, 999);
        assert_eq!(market.block_timestamp, TIMESTAMP);
        assert_eq!(
            market.treasury_total_supply_wei,
            U256::from(36504567163409u64)
        );
        assert_eq!(market.exchange_rate, "0.00003650458235");
        assert_eq!(market.borrow_index, "300");
        assert_eq!(market.reserves_wei, U256::from(5128924555022289393u64));
        assert_eq!(
            market.treasury_total_borrows_wei,
            U256::from(2641234234636158123u64)
        );
        assert_eq!(market.cash, "1.418171344423412457");
        assert_eq!(market.borrow_rate, "0.000000000012678493");
        assert_eq!(market.supply_rate, "0.000000000012678493");
    }

    #[tokio::test]
    async fn test_transfer_from_user_side() {
        let store = test_store();
        let chain = market_chain();
        let from = user1();
        let amount = 146205398726345u64;
        let balance = 262059874253345u64;
        chain.set_account_snapshot(
            vtoken(),
            from,
            AccountSnapshot {
                error: U256::ZERO,
                vtoken_balance: U256::from(balance),
                borrow_balance: U256::ZERO,
                exchange_rate_mantissa: U256::from(1u64),
            },
        );
        chain.set_exchange_rate(
            vtoken(),
            U256::from_str_radix("365045823500000000000000", 10).unwrap(),
        );
        let ctx = HandlerContext::new(&store, &chain, addresses());

        // Transfer into the market itself: only the sender side moves.
        let event = vtoken_event(
            "Transfer",
            0,
            vec![
                ("from", DecodedValue::Address(from)),
                ("to", DecodedValue::Address(vtoken())),
                ("amount", DecodedValue::Uint256(U256::from(amount))),
            ],
        );
        TransferHandler.handle(&ctx, &event).await.unwrap();

        let tx_id = ids::transaction_id(event.transaction_hash, 0);
        let tx = store.get::<Transaction>(&tx_id).await.unwrap().unwrap();
        assert_eq!(tx.kind, TransactionKind::Transfer);
        assert_eq!(tx.from, ids::account_id(from));
        assert_eq!(tx.to, ids::account_id(vtoken()));

        let position = store
            .get::<AccountVToken>(&ids::account_vtoken_id(vtoken(), from))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            position.user_supply_balance_wei,
            U256::from(balance - amount)
        );
        assert_eq!(position.accrual_block_number, BLOCK);
        assert_eq!(position.account_borrow_index, "0");
        assert_eq!(
            position.total_underlying_redeemed_wei,
            U256::from_str_radix("5337167017820446167010750000", 10).unwrap()
        );

        // The market side gets no position record.
        let market_side = store
            .get::<AccountVToken>(&ids::account_vtoken_id(vtoken(), vtoken()))
            .await
            .unwrap();
        assert!(market_side.is_none());
    }

    #[tokio::test]
    async fn test_transfer_to_user_side() {
        let store = test_store();
        let chain = market_chain();
        let to = user2();
        let amount = 5246205398726345u64;
        let balance = 262059874253345u64;
        chain.set_account_snapshot(
            vtoken(),
            to,
            AccountSnapshot {
                error: U256::ZERO,
                vtoken_balance: U256::from(balance),
                borrow_balance: U256::ZERO,
                exchange_rate_mantissa: U256::from(1u64),
            },
        );
        let ctx = HandlerContext::new(&store, &chain, addresses());

        let event = vtoken_event(
            "Transfer",
            0,
            vec![
                ("from", DecodedValue::Address(vtoken())),
                ("to", DecodedValue::Address(to)),
                ("amount", DecodedValue::Uint256(U256::from(amount))),
            ],
        );
        TransferHandler.handle(&ctx, &event).await.unwrap();

        let position = store
            .get::<AccountVToken>(&ids::account_vtoken_id(vtoken(), to))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            position.user_supply_balance_wei,
            U256::from(balance + amount)
        );
        assert_eq!(position.total_underlying_redeemed_wei, U256::ZERO);
        assert_eq!(position.accrual_block_number, BLOCK);
    }

    #[tokio::test]
    async fn test_reserve_factor_and_reserves_updates() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());

        let event = vtoken_event(
            "NewReserveFactor",
            0,
            vec![
                (
                    "oldReserveFactorMantissa",
                    DecodedValue::Uint256(U256::from(12462053079875u64)),
                ),
                (
                    "newReserveFactorMantissa",
                    DecodedValue::Uint256(U256::from(37035970026454u64)),
                ),
            ],
        );
        NewReserveFactorHandler.handle(&ctx, &event).await.unwrap();
        assert_eq!(
            get_market(&store).await.reserve_factor_mantissa,
            U256::from(37035970026454u64)
        );

        let event = vtoken_event(
            "ReservesAdded",
            1,
            vec![
                ("benefactor", DecodedValue::Address(addr(0xb0))),
                (
                    "addAmount",
                    DecodedValue::Uint256(U256::from(112233445566778899u64)),
                ),
                (
                    "newTotalReserves",
                    DecodedValue::Uint256(U256::from(2222334455667788990u64)),
                ),
            ],
        );
        ReservesAddedHandler.handle(&ctx, &event).await.unwrap();
        assert_eq!(
            get_market(&store).await.reserves_wei,
            U256::from(2222334455667788990u64)
        );

        let event = vtoken_event(
            "ReservesReduced",
            2,
            vec![
                ("admin", DecodedValue::Address(addr(0xb0))),
                (
                    "reduceAmount",
                    DecodedValue::Uint256(U256::from(100000000000000000u64)),
                ),
                (
                    "newTotalReserves",
                    DecodedValue::Uint256(U256::from(9111222333444555666u64)),
                ),
            ],
        );
        ReservesReducedHandler.handle(&ctx, &event).await.unwrap();
        assert_eq!(
            get_market(&store).await.reserves_wei,
            U256::from(9111222333444555666u64)
        );
    }

    #[tokio::test]
    async fn test_interest_rate_model_and_acm_updates() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());

        let new_model = addr(0x0f);
        let event = vtoken_event(
            "NewMarketInterestRateModel",
            0,
            vec![
                ("oldInterestRateModel", DecodedValue::Address(addr(0x0e))),
                ("newInterestRateModel", DecodedValue::Address(new_model)),
            ],
        );
        NewMarketInterestRateModelHandler
            .handle(&ctx, &event)
            .await
            .unwrap();
        assert_eq!(
            get_market(&store).await.interest_rate_model_address,
            format!("{new_model:#x}")
        );

        let new_manager = addr(0xbc);
        let event = vtoken_event(
            "NewAccessControlManager",
            1,
            vec![
                ("oldAccessControlManager", DecodedValue::Address(addr(0xab))),
                ("newAccessControlManager", DecodedValue::Address(new_manager)),
            ],
        );
        NewAccessControlManagerHandler
            .handle(&ctx, &event)
            .await
            .unwrap();
        assert_eq!(
            get_market(&store).await.access_control_manager,
            Some(format!("{new_manager:#x}"))
        );
    }

    #[tokio::test]
    async fn test_bad_debt_increased() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        let borrower = addr(0x11);

        let event = vtoken_event(
            "BadDebtIncreased",
            0,
            vec![
                ("borrower", DecodedValue::Address(borrower)),
                ("badDebtDelta", DecodedValue::Uint256(U256::from(300u64))),
                ("badDebtOld", DecodedValue::Uint256(U256::from(1000u64))),
                ("badDebtNew", DecodedValue::Uint256(U256::from(700u64))),
            ],
        );
        BadDebtIncreasedHandler.handle(&ctx, &event).await.unwrap();

        assert_eq!(get_market(&store).await.bad_debt_wei, U256::from(700u64));

        let bad_debt = store
            .get::<AccountVTokenBadDebt>(&ids::bad_debt_event_id(event.transaction_hash, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bad_debt.account, ids::account_vtoken_id(vtoken(), borrower));
        assert_eq!(bad_debt.amount, U256::from(300u64));
        assert_eq!(bad_debt.block, BLOCK);
        assert_eq!(bad_debt.timestamp, TIMESTAMP);
    }

    #[tokio::test]
    async fn test_supplier_count_transitions() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        get_or_create_market(&ctx, vtoken(), None, TIMESTAMP)
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.supplier_count, 0);

        let mint_amount = 12u64;
        let mint_tokens = 10u64;

        chain.set_balance_of(vtoken(), user1(), U256::from(mint_tokens));
        MintHandler
            .handle(&ctx, &mint_event(user1(), mint_amount, mint_tokens, 0))
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.supplier_count, 1);

        chain.set_balance_of(vtoken(), user2(), U256::from(mint_tokens));
        MintHandler
            .handle(&ctx, &mint_event(user2(), mint_amount, mint_tokens, 1))
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.supplier_count, 2);

        chain.set_balance_of(vtoken(), user2(), U256::ZERO);
        RedeemHandler
            .handle(&ctx, &redeem_event(user2(), mint_amount, mint_tokens, 0))
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.supplier_count, 1);

        chain.set_balance_of(vtoken(), user1(), U256::from(mint_tokens / 2));
        RedeemHandler
            .handle(
                &ctx,
                &redeem_event(user1(), mint_amount / 2, mint_tokens / 2, mint_tokens / 2),
            )
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.supplier_count, 1);

        chain.set_balance_of(vtoken(), user1(), U256::ZERO);
        RedeemHandler
            .handle(
                &ctx,
                &redeem_event(user1(), mint_amount / 2, mint_tokens / 2, 0),
            )
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.supplier_count, 0);
    }

    #[tokio::test]
    async fn test_borrower_count_transitions() {
        let store = test_store();
        let chain = market_chain();
        let ctx = HandlerContext::new(&store, &chain, addresses());
        get_or_create_market(&ctx, vtoken(), None, TIMESTAMP)
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.borrower_count, 0);

        let borrow_amount = 10u64;

        BorrowHandler
            .handle(&ctx, &borrow_event(user1(), borrow_amount, borrow_amount))
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.borrower_count, 1);

        BorrowHandler
            .handle(&ctx, &borrow_event(user2(), borrow_amount, borrow_amount))
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.borrower_count, 2);

        RepayBorrowHandler
            .handle(&ctx, &repay_event(user2(), borrow_amount, 0))
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.borrower_count, 1);

        RepayBorrowHandler
            .handle(
                &ctx,
                &repay_event(user1(), borrow_amount / 2, borrow_amount / 2),
            )
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.borrower_count, 1);

        RepayBorrowHandler
            .handle(&ctx, &repay_event(user1(), borrow_amount / 2, 0))
            .await
            .unwrap();
        assert_eq!(get_market(&store).await.borrower_count, 0);
    }
}
