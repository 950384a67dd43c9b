use std::collections::HashMap;

use alloy::primitives::B256;

use super::parsing::{EventParseError, ParsedEvent};

pub const SOURCE_POOL_REGISTRY: &str = "PoolRegistry";
pub const SOURCE_VTOKEN: &str = "VToken";
pub const SOURCE_REWARDS_DISTRIBUTOR: &str = "RewardsDistributor";
pub const SOURCE_SHORTFALL: &str = "Shortfall";

/// Tracked event signatures per source kind.
const SIGNATURES: &[(&str, &str)] = &[
    (
        SOURCE_POOL_REGISTRY,
        "PoolRegistered(uint256 index, address comptroller)",
    ),
    (
        SOURCE_POOL_REGISTRY,
        "MarketAdded(address indexed comptroller, address vTokenAddress)",
    ),
    (
        SOURCE_VTOKEN,
        "Mint(address minter, uint256 mintAmount, uint256 mintTokens, uint256 accountBalance)",
    ),
    (
        SOURCE_VTOKEN,
        "Redeem(address redeemer, uint256 redeemAmount, uint256 redeemTokens, uint256 accountBalance)",
    ),
    (
        SOURCE_VTOKEN,
        "Borrow(address borrower, uint256 borrowAmount, uint256 accountBorrows, uint256 totalBorrows)",
    ),
    (
        SOURCE_VTOKEN,
        "RepayBorrow(address payer, address borrower, uint256 repayAmount, uint256 accountBorrows, uint256 totalBorrows)",
    ),
    (
        SOURCE_VTOKEN,
        "LiquidateBorrow(address liquidator, address borrower, uint256 repayAmount, address vTokenCollateral, uint256 seizeTokens)",
    ),
    (
        SOURCE_VTOKEN,
        "Transfer(address indexed from, address indexed to, uint256 amount)",
    ),
    (
        SOURCE_VTOKEN,
        "AccrueInterest(uint256 cashPrior, uint256 interestAccumulated, uint256 borrowIndex, uint256 totalBorrows)",
    ),
    (
        SOURCE_VTOKEN,
        "NewReserveFactor(uint256 oldReserveFactorMantissa, uint256 newReserveFactorMantissa)",
    ),
    (
        SOURCE_VTOKEN,
        "ReservesAdded(address benefactor, uint256 addAmount, uint256 newTotalReserves)",
    ),
    (
        SOURCE_VTOKEN,
        "ReservesReduced(address admin, uint256 reduceAmount, uint256 newTotalReserves)",
    ),
    (
        SOURCE_VTOKEN,
        "NewMarketInterestRateModel(address oldInterestRateModel, address newInterestRateModel)",
    ),
    (
        SOURCE_VTOKEN,
        "NewAccessControlManager(address oldAccessControlManager, address newAccessControlManager)",
    ),
    (
        SOURCE_VTOKEN,
        "BadDebtIncreased(address indexed borrower, uint256 badDebtDelta, uint256 badDebtOld, uint256 badDebtNew)",
    ),
    (
        SOURCE_REWARDS_DISTRIBUTOR,
        "RewardTokenSupplySpeedUpdated(address indexed vToken, uint256 newSpeed)",
    ),
    (
        SOURCE_REWARDS_DISTRIBUTOR,
        "RewardTokenBorrowSpeedUpdated(address indexed vToken, uint256 newSpeed)",
    ),
    (
        SOURCE_SHORTFALL,
        "AuctionStarted(address indexed comptroller, uint256 auctionStartBlock, uint8 auctionType, address[] markets, uint256[] marketsDebt, uint256 seizedRiskFund, uint256 startBidBps)",
    ),
];

/// All tracked events, keyed by (source kind, topic0).
pub struct EventCatalog {
    events: HashMap<(String, B256), ParsedEvent>,
}

impl EventCatalog {
    pub fn new() -> Result<Self, EventParseError> {
        let mut events = HashMap::new();
        for (source, signature) in SIGNATURES {
            let parsed = ParsedEvent::from_signature(signature)?;
            events.insert((source.to_string(), parsed.topic0), parsed);
        }
        Ok(Self { events })
    }

    pub fn find(&self, source: &str, topic0: B256) -> Option<&ParsedEvent> {
        self.events.get(&(source.to_string(), topic0))
    }

    /// Topic0 values for the log filter.
    pub fn topics(&self) -> Vec<B256> {
        let mut topics: Vec<B256> = self.events.keys().map(|(_, t)| *t).collect();
        topics.sort();
        topics.dedup();
        topics
    }
}
