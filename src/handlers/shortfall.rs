//! Handlers for shortfall auction events.

use async_trait::async_trait;

use crate::entities::{AuctionKind, AuctionStatus};
use crate::events::{DecodedEvent, SOURCE_SHORTFALL};
use crate::ids;

use super::context::{require_address, require_uint, HandlerContext};
use super::error::HandlerError;
use super::operations::get_or_create_auction;
use super::registry::HandlerRegistry;
use super::traits::{EventHandler, EventTrigger};

pub struct AuctionStartedHandler;

#[async_trait]
impl EventHandler for AuctionStartedHandler {
    fn name(&self) -> &'static str {
        "AuctionStartedHandler"
    }

    fn triggers(&self) -> Vec<EventTrigger> {
        vec![EventTrigger::new(
            SOURCE_SHORTFALL,
            "AuctionStarted(address,uint256,uint8,address[],uint256[],uint256,uint256)",
        )]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        event: &DecodedEvent,
    ) -> Result<(), HandlerError> {
        let comptroller = require_address(event, "comptroller")?;
        let start_block = require_uint(event, "auctionStartBlock")?;
        let auction_type = require_uint(event, "auctionType")?;
        let seized_risk_fund = require_uint(event, "seizedRiskFund")?;
        let start_bid_bps = require_uint(event, "startBidBps")?;

        let markets = event
            .try_get("markets")
            .and_then(|v| v.as_array())
            .ok_or_else(|| HandlerError::MissingField("AuctionStarted.markets".to_string()))?
            .iter()
            .map(|v| {
                v.as_address().map(ids::market_id).ok_or_else(|| {
                    HandlerError::TypeConversion("markets entry is not an address".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let markets_debt = event
            .try_get("marketsDebt")
            .and_then(|v| v.as_array())
            .ok_or_else(|| HandlerError::MissingField("AuctionStarted.marketsDebt".to_string()))?
            .iter()
            .map(|v| {
                v.as_uint256().ok_or_else(|| {
                    HandlerError::TypeConversion("marketsDebt entry is not a uint256".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut auction = get_or_create_auction(ctx, comptroller).await?;
        auction.status = AuctionStatus::Started;
        auction.kind = if auction_type.is_zero() {
            AuctionKind::LargePoolDebt
        } else {
            AuctionKind::LargeRiskFund
        };
        auction.start_block = start_block.try_into().map_err(|_| {
            HandlerError::TypeConversion("auctionStartBlock exceeds u64".to_string())
        })?;
        auction.seized_risk_fund = seized_risk_fund;
        auction.start_bid_bps = start_bid_bps;
        auction.markets = markets;
        auction.markets_debt = markets_debt;
        ctx.store.save(&auction).await?;

        tracing::info!(auction = %auction.id, status = ?auction.status, "auction started");
        Ok(())
    }
}

pub fn register_handlers(registry: &mut HandlerRegistry) {
    registry.register(AuctionStartedHandler);
}
