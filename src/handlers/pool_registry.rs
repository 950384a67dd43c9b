//! Handlers for pool registry events.

use async_trait::async_trait;

use crate::entities::Pool;
use crate::events::{DecodedEvent, SOURCE_POOL_REGISTRY};
use crate::ids;

use super::context::{require_address, require_uint, HandlerContext};
use super::error::HandlerError;
use super::operations::{get_or_create_market, get_or_create_pool};
use super::registry::HandlerRegistry;
use super::traits::{EventHandler, EventTrigger};

pub struct PoolRegisteredHandler;

#[async_trait]
impl EventHandler for PoolRegisteredHandler {
    fn name(&self) -> &'static str {
        "PoolRegisteredHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_POOL_REGISTRY,
            "PoolRegistered(uint256,address)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let index = require_uint(event, "index")?;
        let comptroller = require_address(event, "comptroller")?;
        let pool = get_or_create_pool(ctx, comptroller, index).await?;
        tracing::info!(pool = %pool.id, name = %pool.name, "pool registered");
        Ok(())
    }
}

pub struct MarketAddedHandler;

#[async_trait]
impl EventHandler for MarketAddedHandler {
    fn name(&self) -> &'static str {
        "MarketAddedHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_POOL_REGISTRY,
            "MarketAdded(address,address)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let comptroller = require_address(event, "comptroller")?;
        let vtoken = require_address(event, "vTokenAddress")?;

        let market =
            get_or_create_market(ctx, vtoken, Some(comptroller), event.block_timestamp).await?;

        let pool_id = ids::pool_id(comptroller);
        match ctx.store.get::<Pool>(&pool_id).await? {
            Some(mut pool) => {
                if !pool.markets.contains(&market.id) {
                    pool.markets.push(market.id.clone());
                    ctx.store.save(&pool).await?;
                }
            }
            None => {
                tracing::warn!(pool = %pool_id, market = %market.id, "market added to unknown pool");
            }
        }
        tracing::info!(market = %market.id, symbol = %market.symbol, "market added");
        Ok(())
    }
}

pub fn register_handlers(registry: &mut HandlerRegistry) {
    registry.register(PoolRegisteredHandler);
    registry.register(MarketAddedHandler);
}
