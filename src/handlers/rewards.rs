//! Handlers for rewards distributor events.

use async_trait::async_trait;

use crate::events::{DecodedEvent, SOURCE_REWARDS_DISTRIBUTOR};

use super::context::{require_address, require_uint, HandlerContext};
use super::error::HandlerError;
use super::operations::get_or_create_reward_speed;
use super::registry::HandlerRegistry;
use super::traits::{EventHandler, EventTrigger};

pub struct SupplySpeedUpdatedHandler;

#[async_trait]
impl EventHandler for SupplySpeedUpdatedHandler {
    fn name(&self) -> &'static str {
        "SupplySpeedUpdatedHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_REWARDS_DISTRIBUTOR,
            "RewardTokenSupplySpeedUpdated(address,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let vtoken = require_address(event, "vToken")?;
        let new_speed = require_uint(event, "newSpeed")?;

        let mut speed = get_or_create_reward_speed(ctx, event.address, vtoken).await?;
        speed.supply_speed_per_block_mantissa = new_speed;
        ctx.store.save(&speed).await?;
        Ok(())
    }
}

pub struct BorrowSpeedUpdatedHandler;

#[async_trait]
impl EventHandler for BorrowSpeedUpdatedHandler {
    fn name(&self) -> &'static str {
        "BorrowSpeedUpdatedHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_REWARDS_DISTRIBUTOR,
            "RewardTokenBorrowSpeedUpdated(address,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let vtoken = require_address(event, "vToken")?;
        let new_speed = require_uint(event, "newSpeed")?;

        let mut speed = get_or_create_reward_speed(ctx, event.address, vtoken).await?;
        speed.borrow_speed_per_block_mantissa = new_speed;
        ctx.store.save(&speed).await?;
        Ok(())
    }
}

pub fn register_handlers(registry: &mut HandlerRegistry) {
    registry.register(SupplySpeedUpdatedHandler);
    registry.register(BorrowSpeedUpdatedHandler);
}
