use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::rpc::types::{BlockId, TransactionInput, TransactionRequest};
use async_trait::async_trait;

use crate::rpc::RpcClient;

use super::abi::{encode_calldata, parse_function_signature};
use super::reader::{AccountSnapshot, ChainReader, PoolMetadata};
use super::ChainError;

/// `ChainReader` over JSON-RPC.
///
/// Calls are pinned to the block set via `set_query_block` so reads made
/// while handling a block observe that block's state, not the head.
pub struct RpcChainReader {
    client: Arc<RpcClient>,
    query_block: AtomicU64,
}

impl RpcChainReader {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            query_block: AtomicU64::new(0),
        }
    }

    /// Pin subsequent reads to this block. Zero means latest.
    pub fn set_query_block(&self, block: u64) {
        self.query_block.store(block, Ordering::Relaxed);
    }

    async fn call(
        &self,
        to: Address,
        signature: &str,
        params: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ChainError> {
        let (selector, output_type) = parse_function_signature(signature)?;
        let calldata = encode_calldata(&selector, params);

        let tx = TransactionRequest {
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(Bytes::from(calldata)),
            ..Default::default()
        };

        let block = match self.query_block.load(Ordering::Relaxed) {
            0 => None,
            n => Some(BlockId::number(n)),
        };

        let result = self.client.call(&tx, block).await?;

        let decoded = output_type
            .abi_decode_params(&result)
            .map_err(|e| ChainError::Decode(format!("{}: {}", signature, e)))?;

        match decoded {
            DynSolValue::Tuple(values) => Ok(values),
            other => Ok(vec![other]),
        }
    }

    async fn call_address(&self, to: Address, signature: &str) -> Result<Address, ChainError> {
        let values = self.call(to, signature, &[]).await?;
        as_address(values.first(), signature)
    }

    async fn call_u256(
        &self,
        to: Address,
        signature: &str,
        params: &[DynSolValue],
    ) -> Result<U256, ChainError> {
        let values = self.call(to, signature, params).await?;
        as_u256(values.first(), signature)
    }

    async fn call_string(&self, to: Address, signature: &str) -> Result<String, ChainError> {
        let values = self.call(to, signature, &[]).await?;
        values
            .first()
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ChainError::Decode(format!("{}: expected string", signature)))
    }
}

fn as_address(value: Option<&DynSolValue>, context: &str) -> Result<Address, ChainError> {
    value
        .and_then(|v| v.as_address())
        .ok_or_else(|| ChainError::Decode(format!("{}: expected address", context)))
}

fn as_u256(value: Option<&DynSolValue>, context: &str) -> Result<U256, ChainError> {
    value
        .and_then(|v| v.as_uint())
        .map(|(v, _)| v)
        .ok_or_else(|| ChainError::Decode(format!("{}: expected uint", context)))
}

fn as_u64(value: Option<&DynSolValue>, context: &str) -> Result<u64, ChainError> {
    let v = as_u256(value, context)?;
    v.try_into()
        .map_err(|_| ChainError::Decode(format!("{}: uint out of u64 range", context)))
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn comptroller(&self, vtoken: Address) -> Result<Address, ChainError> {
        self.call_address(vtoken, "comptroller()(address)").await
    }

    async fn token_name(&self, token: Address) -> Result<String, ChainError> {
        self.call_string(token, "name()(string)").await
    }

    async fn token_symbol(&self, token: Address) -> Result<String, ChainError> {
        self.call_string(token, "symbol()(string)").await
    }

    async fn token_decimals(&self, token: Address) -> Result<u32, ChainError> {
        let v = self.call_u256(token, "decimals()(uint8)", &[]).await?;
        v.try_into()
            .map_err(|_| ChainError::Decode("decimals out of range".to_string()))
    }

    async fn underlying(&self, vtoken: Address) -> Result<Address, ChainError> {
        self.call_address(vtoken, "underlying()(address)").await
    }

    async fn interest_rate_model(&self, vtoken: Address) -> Result<Address, ChainError> {
        self.call_address(vtoken, "interestRateModel()(address)").await
    }

    async fn reserve_factor_mantissa(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "reserveFactorMantissa()(uint256)", &[]).await
    }

    async fn accrual_block_number(&self, vtoken: Address) -> Result<u64, ChainError> {
        let values = self.call(vtoken, "accrualBlockNumber()(uint256)", &[]).await?;
        as_u64(values.first(), "accrualBlockNumber")
    }

    async fn total_supply(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "totalSupply()(uint256)", &[]).await
    }

    async fn exchange_rate_stored(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "exchangeRateStored()(uint256)", &[]).await
    }

    async fn borrow_index(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "borrowIndex()(uint256)", &[]).await
    }

    async fn total_reserves(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "totalReserves()(uint256)", &[]).await
    }

    async fn total_borrows(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "totalBorrows()(uint256)", &[]).await
    }

    async fn get_cash(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "getCash()(uint256)", &[]).await
    }

    async fn borrow_rate_per_block(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "borrowRatePerBlock()(uint256)", &[]).await
    }

    async fn supply_rate_per_block(&self, vtoken: Address) -> Result<U256, ChainError> {
        self.call_u256(vtoken, "supplyRatePerBlock()(uint256)", &[]).await
    }

    async fn balance_of(&self, vtoken: Address, account: Address) -> Result<U256, ChainError> {
        self.call_u256(
            vtoken,
            "balanceOf(address)(uint256)",
            &[DynSolValue::Address(account)],
        )
        .await
    }

    async fn get_account_snapshot(
        &self,
        vtoken: Address,
        account: Address,
    ) -> Result<AccountSnapshot, ChainError> {
        let values = self
            .call(
                vtoken,
                "getAccountSnapshot(address)(uint256,uint256,uint256,uint256)",
                &[DynSolValue::Address(account)],
            )
            .await?;

        Ok(AccountSnapshot {
            error: as_u256(values.first(), "getAccountSnapshot.0")?,
            vtoken_balance: as_u256(values.get(1), "getAccountSnapshot.1")?,
            borrow_balance: as_u256(values.get(2), "getAccountSnapshot.2")?,
            exchange_rate_mantissa: as_u256(values.get(3), "getAccountSnapshot.3")?,
        })
    }

    async fn get_underlying_price(
        &self,
        oracle: Address,
        vtoken: Address,
    ) -> Result<U256, ChainError> {
        self.call_u256(
            oracle,
            "getUnderlyingPrice(address)(uint256)",
            &[DynSolValue::Address(vtoken)],
        )
        .await
    }

    async fn get_pool_by_id(
        &self,
        registry: Address,
        index: U256,
    ) -> Result<PoolMetadata, ChainError> {
        let values = self
            .call(
                registry,
                "getPoolByID(uint256)((uint256,string,address,address,uint256,uint256))",
                &[DynSolValue::Uint(index, 256)],
            )
            .await?;

        let fields = match values.first() {
            Some(DynSolValue::Tuple(fields)) => fields.clone(),
            _ => return Err(ChainError::Decode("getPoolByID: expected tuple".to_string())),
        };

        Ok(PoolMetadata {
            index: as_u256(fields.first(), "getPoolByID.id")?,
            name: fields
                .get(1)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| ChainError::Decode("getPoolByID.name: expected string".to_string()))?,
            creator: as_address(fields.get(2), "getPoolByID.creator")?,
            comptroller: as_address(fields.get(3), "getPoolByID.comptroller")?,
            block_posted: as_u64(fields.get(4), "getPoolByID.blockPosted")?,
            timestamp_posted: as_u64(fields.get(5), "getPoolByID.timestampPosted")?,
        })
    }
}
