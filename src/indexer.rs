//! Log collection loop.
//!
//! Pulls logs for the tracked contracts range by range, decodes them against
//! the event catalog, and feeds them to the dispatch engine. Progress is
//! checkpointed per network after each fully processed range, so a restart
//! resumes from the last committed block.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use thiserror::Error;

use crate::chain::RpcChainReader;
use crate::config::{IndexerConfig, Network};
use crate::entities::{Checkpoint, Market};
use crate::events::{
    DecodedEvent, EventCatalog, EventParseError, SOURCE_POOL_REGISTRY, SOURCE_REWARDS_DISTRIBUTOR,
    SOURCE_SHORTFALL, SOURCE_VTOKEN,
};
use crate::handlers::{Engine, HandlerContext, HandlerError, ProtocolAddresses};
use crate::rpc::{RpcClient, RpcError};
use crate::store::{EntityStore, StoreError};

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Event decode error: {0}")]
    Event(#[from] EventParseError),

    #[error("Log is missing field: {0}")]
    MissingLogField(&'static str),

    #[error("Stored market id is not an address: {0}")]
    InvalidStoredAddress(String),

    #[error("Block {0} not found")]
    BlockNotFound(u64),
}

/// Map of emitting address to its catalog source kind: the fixed protocol
/// contracts plus every market discovered so far.
async fn tracked_sources(
    store: &EntityStore,
    fixed: &[(Address, &'static str)],
) -> Result<HashMap<Address, &'static str>, IndexerError> {
    let mut sources: HashMap<Address, &'static str> = fixed.iter().copied().collect();
    for id in store.ids::<Market>().await? {
        let address = id
            .parse::<Address>()
            .map_err(|_| IndexerError::InvalidStoredAddress(id.clone()))?;
        sources.insert(address, SOURCE_VTOKEN);
    }
    Ok(sources)
}

/// Sort events by (block, log index) and group them into per-block batches,
/// preserving that order.
fn block_batches(mut events: Vec<DecodedEvent>) -> Vec<Vec<DecodedEvent>> {
    events.sort_by_key(|event| (event.block_number, event.log_index));
    let mut batches: Vec<Vec<DecodedEvent>> = Vec::new();
    for event in events {
        match batches.last_mut() {
            Some(batch) if batch[0].block_number == event.block_number => batch.push(event),
            _ => batches.push(vec![event]),
        }
    }
    batches
}

pub struct Indexer {
    network: Network,
    start_block: u64,
    range_size: u64,
    poll_interval: Duration,
    store: EntityStore,
    rpc: Arc<RpcClient>,
    chain: Arc<RpcChainReader>,
    engine: Engine,
    catalog: EventCatalog,
    addresses: ProtocolAddresses,
    fixed_sources: Vec<(Address, &'static str)>,
}

impl Indexer {
    pub fn new(
        config: &IndexerConfig,
        store: EntityStore,
        rpc: Arc<RpcClient>,
        chain: Arc<RpcChainReader>,
        engine: Engine,
        catalog: EventCatalog,
    ) -> Self {
        let mut fixed_sources = vec![(config.pool_registry, SOURCE_POOL_REGISTRY)];
        if let Some(shortfall) = config.shortfall {
            fixed_sources.push((shortfall, SOURCE_SHORTFALL));
        }
        for distributor in &config.rewards_distributors {
            fixed_sources.push((*distributor, SOURCE_REWARDS_DISTRIBUTOR));
        }

        Self {
            network: config.network,
            start_block: config.start_block(),
            range_size: config.range_size.max(1),
            poll_interval: Duration::from_secs(12),
            store,
            rpc,
            chain,
            engine,
            catalog,
            addresses: ProtocolAddresses {
                pool_registry: config.pool_registry,
                oracle: config.oracle,
            },
            fixed_sources,
        }
    }

    /// Run the collection loop until cancelled.
    pub async fn run(&self) -> Result<(), IndexerError> {
        loop {
            let head = self.rpc.get_block_number().await?;
            let mut from = match self.checkpoint().await? {
                Some(block) => block + 1,
                None => self.start_block,
            };

            if from > head {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            tracing::info!(from, head, network = %self.network, "collecting logs");
            while from <= head {
                let to = (from + self.range_size - 1).min(head);
                self.process_range(from, to).await?;
                self.save_checkpoint(to).await?;
                from = to + 1;
            }
        }
    }

    async fn checkpoint(&self) -> Result<Option<u64>, IndexerError> {
        let checkpoint = self
            .store
            .get::<Checkpoint>(self.network.as_str())
            .await?;
        Ok(checkpoint.map(|c| c.last_processed_block))
    }

    async fn save_checkpoint(&self, block: u64) -> Result<(), IndexerError> {
        let checkpoint = Checkpoint {
            id: self.network.as_str().to_string(),
            last_processed_block: block,
        };
        self.store.save(&checkpoint).await?;
        Ok(())
    }

    /// Process one block range. If new markets are registered inside the
    /// range, their own logs in the same range are collected in a second,
    /// markets-only pass so nothing is missed.
    pub async fn process_range(&self, from: u64, to: u64) -> Result<(), IndexerError> {
        let sources = tracked_sources(&self.store, &self.fixed_sources).await?;
        let events = self.collect(from, to, &sources).await?;
        let count = events.len();

        let ctx = HandlerContext::new(&self.store, self.chain.as_ref(), self.addresses);
        self.dispatch(&ctx, events).await?;

        let after = tracked_sources(&self.store, &self.fixed_sources).await?;
        let new_markets: HashMap<Address, &'static str> = after
            .into_iter()
            .filter(|(address, _)| !sources.contains_key(address))
            .collect();
        if !new_markets.is_empty() {
            tracing::info!(
                from,
                to,
                markets = new_markets.len(),
                "recollecting range for newly added markets"
            );
            let events = self.collect(from, to, &new_markets).await?;
            self.dispatch(&ctx, events).await?;
        }

        tracing::debug!(from, to, events = count, "range processed");
        Ok(())
    }

    /// Dispatch events block by block. Chain reads made by handlers resolve
    /// against the block that emitted the event, so balance re-reads never
    /// observe state from later in the range.
    async fn dispatch(
        &self,
        ctx: &HandlerContext<'_>,
        events: Vec<DecodedEvent>,
    ) -> Result<(), IndexerError> {
        for batch in block_batches(events) {
            self.chain.set_query_block(batch[0].block_number);
            self.engine.process(ctx, batch).await?;
        }
        Ok(())
    }

    async fn collect(
        &self,
        from: u64,
        to: u64,
        sources: &HashMap<Address, &'static str>,
    ) -> Result<Vec<DecodedEvent>, IndexerError> {
        let addresses: Vec<Address> = sources.keys().copied().collect();
        let filter = Filter::new()
            .from_block(from)
            .to_block(to)
            .address(addresses)
            .event_signature(self.catalog.topics());

        let logs = self.rpc.get_logs(&filter).await?;
        let mut timestamps: HashMap<u64, u64> = HashMap::new();
        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(event) = self.decode_log(log, sources, &mut timestamps).await? {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn decode_log(
        &self,
        log: &Log,
        sources: &HashMap<Address, &'static str>,
        timestamps: &mut HashMap<u64, u64>,
    ) -> Result<Option<DecodedEvent>, IndexerError> {
        let address = log.address();
        let Some(source) = sources.get(&address) else {
            return Ok(None);
        };
        let Some(topic0) = log.topic0() else {
            return Ok(None);
        };
        // Untracked signatures on tracked contracts are fine to skip.
        let Some(parsed) = self.catalog.find(source, *topic0) else {
            return Ok(None);
        };

        let block_number = log
            .block_number
            .ok_or(IndexerError::MissingLogField("blockNumber"))?;
        let transaction_hash = log
            .transaction_hash
            .ok_or(IndexerError::MissingLogField("transactionHash"))?;
        let log_index = log
            .log_index
            .ok_or(IndexerError::MissingLogField("logIndex"))?;

        let block_timestamp = match timestamps.get(&block_number) {
            Some(timestamp) => *timestamp,
            None => {
                let block = self
                    .rpc
                    .get_block_by_number(BlockNumberOrTag::Number(block_number))
                    .await?
                    .ok_or(IndexerError::BlockNotFound(block_number))?;
                let timestamp = block.header.timestamp;
                timestamps.insert(block_number, timestamp);
                timestamp
            }
        };

        let params = parsed.decode(log.data().topics(), log.data().data.as_ref())?;
        Ok(Some(DecodedEvent {
            block_number,
            block_timestamp,
            transaction_hash,
            log_index,
            address,
            source: source.to_string(),
            name: parsed.name.clone(),
            params,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::{B256, U256};

    use super::*;
    use crate::store::MemoryBackend;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn event_at(block: u64, log_index: u64) -> DecodedEvent {
        DecodedEvent {
            block_number: block,
            block_timestamp: 0,
            transaction_hash: B256::ZERO,
            log_index,
            address: Address::ZERO,
            source: SOURCE_VTOKEN.to_string(),
            name: "Mint".to_string(),
            params: HashMap::new(),
        }
    }

    #[test]
    fn test_block_batches_group_and_order() {
        let batches = block_batches(vec![
            event_at(102, 0),
            event_at(100, 7),
            event_at(100, 2),
            event_at(101, 1),
        ]);
        let shape: Vec<Vec<(u64, u64)>> = batches
            .iter()
            .map(|batch| batch.iter().map(|e| (e.block_number, e.log_index)).collect())
            .collect();
        assert_eq!(
            shape,
            vec![vec![(100, 2), (100, 7)], vec![(101, 1)], vec![(102, 0)]]
        );
    }

    #[tokio::test]
    async fn test_tracked_sources_include_stored_markets() {
        let store = EntityStore::new(Arc::new(MemoryBackend::new()));
        let market = Market {
            id: crate::ids::market_id(addr(0xaa)),
            pool: crate::ids::pool_id(addr(0x0c)),
            name: "Venus AAA".to_string(),
            symbol: "vAAA".to_string(),
            underlying_address: format!("{:#x}", addr(0xbb)),
            underlying_name: "AAA Coin".to_string(),
            underlying_symbol: "AAA".to_string(),
            underlying_decimals: 18,
            underlying_price: "0".to_string(),
            interest_rate_model_address: format!("{:#x}", addr(0xcc)),
            access_control_manager: None,
            reserve_factor_mantissa: U256::ZERO,
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
            block_timestamp: 0,
        };
        store.save(&market).await.unwrap();

        let fixed = vec![
            (addr(0xf0), SOURCE_POOL_REGISTRY),
            (addr(0x5f), SOURCE_SHORTFALL),
        ];
        let sources = tracked_sources(&store, &fixed).await.unwrap();
        assert_eq!(sources.get(&addr(0xf0)), Some(&SOURCE_POOL_REGISTRY));
        assert_eq!(sources.get(&addr(0x5f)), Some(&SOURCE_SHORTFALL));
        assert_eq!(sources.get(&addr(0xaa)), Some(&SOURCE_VTOKEN));
        assert_eq!(sources.len(), 3);
    }
}
