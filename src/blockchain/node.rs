//! Single-attempt access to the chain node.
//!
//! # Responsibilities
//! - Expose the read and write primitives the connector composes
//! - Bound every call with the per-call RPC timeout
//! - Convert signed bridge integers into plain counts
//! - Keep one signing provider per provider wallet for writes
//!
//! Nothing here retries; see `connector.rs`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, B256, I256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use dashmap::DashMap;

use crate::blockchain::contracts::{LiquidityBridgeContract, OnChainQuote, RskBridge};
use crate::blockchain::types::{AccountState, BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;
use crate::federation::KeyKind;
use crate::resilience::rpc_call;

/// Primitive operations against an EVM node hosting the bridge and the LBC.
pub trait ChainNode: Send + Sync + 'static {
    fn chain_id(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    fn block_number(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    fn gas_price(&self) -> impl Future<Output = BlockchainResult<u128>> + Send;

    fn estimate_gas(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Code size, balance and nonce of `address` at `block`.
    fn account_state(
        &self,
        address: Address,
        block: u64,
    ) -> impl Future<Output = BlockchainResult<AccountState>> + Send;

    fn federation_size(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    fn federation_threshold(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    fn federator_public_key(
        &self,
        index: u64,
        kind: KeyKind,
    ) -> impl Future<Output = BlockchainResult<Bytes>> + Send;

    fn federation_address(&self) -> impl Future<Output = BlockchainResult<String>> + Send;

    fn active_federation_creation_height(
        &self,
    ) -> impl Future<Output = BlockchainResult<u64>> + Send;

    fn hash_quote(&self, quote: OnChainQuote) -> impl Future<Output = BlockchainResult<B256>> + Send;

    fn call_for_user(
        &self,
        wallet: &Wallet,
        quote: OnChainQuote,
    ) -> impl Future<Output = BlockchainResult<TxHash>> + Send;

    fn register_peg_in(
        &self,
        wallet: &Wallet,
        quote: OnChainQuote,
        signature: Bytes,
        btc_raw_tx: Bytes,
        partial_merkle_tree: Bytes,
        height: u64,
    ) -> impl Future<Output = BlockchainResult<TxHash>> + Send;
}

/// JSON-RPC backed [`ChainNode`].
#[derive(Clone)]
pub struct RpcNode {
    provider: DynProvider,
    rpc_url: url::Url,
    lbc_address: Address,
    bridge_address: Address,
    timeout_duration: Duration,
    writers: Arc<DashMap<Address, DynProvider>>,
}

impl RpcNode {
    /// Connect lazily; no request is made until the first call.
    pub fn new(
        rpc_url: &str,
        lbc_address: Address,
        bridge_address: Address,
        timeout_duration: Duration,
    ) -> BlockchainResult<Self> {
        let rpc_url: url::Url = rpc_url
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().connect_http(rpc_url.clone()).erased();

        Ok(Self {
            provider,
            rpc_url,
            lbc_address,
            bridge_address,
            timeout_duration,
            writers: Arc::new(DashMap::new()),
        })
    }

    fn bridge(&self) -> RskBridge::RskBridgeInstance<DynProvider> {
        RskBridge::new(self.bridge_address, self.provider.clone())
    }

    /// Signing provider for `wallet`, built on first use.
    fn writer(&self, wallet: &Wallet) -> DynProvider {
        self.writers
            .entry(wallet.address())
            .or_insert_with(|| {
                ProviderBuilder::new()
                    .wallet(wallet.ethereum_wallet())
                    .connect_http(self.rpc_url.clone())
                    .erased()
            })
            .clone()
    }
}

fn non_negative(operation: &'static str, value: I256) -> BlockchainResult<u64> {
    if value.is_negative() {
        return Err(BlockchainError::Rpc(format!("{}: negative value {}", operation, value)));
    }
    u64::try_from(value.into_raw())
        .map_err(|e| BlockchainError::Rpc(format!("{}: {}", operation, e)))
}

impl ChainNode for RpcNode {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        rpc_call("chain_id", self.timeout_duration, self.provider.get_chain_id()).await
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        rpc_call("block_number", self.timeout_duration, self.provider.get_block_number()).await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        rpc_call("gas_price", self.timeout_duration, self.provider.get_gas_price()).await
    }

    async fn estimate_gas(&self, to: Address, value: U256, data: Bytes) -> BlockchainResult<u64> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_value(value)
            .with_input(data);
        rpc_call("estimate_gas", self.timeout_duration, self.provider.estimate_gas(tx)).await
    }

    async fn account_state(&self, address: Address, block: u64) -> BlockchainResult<AccountState> {
        let code = rpc_call(
            "get_code",
            self.timeout_duration,
            self.provider.get_code_at(address).number(block),
        )
        .await?;
        let balance = rpc_call(
            "get_balance",
            self.timeout_duration,
            self.provider.get_balance(address).number(block),
        )
        .await?;
        let nonce = rpc_call(
            "get_transaction_count",
            self.timeout_duration,
            self.provider.get_transaction_count(address).number(block),
        )
        .await?;

        Ok(AccountState {
            code_len: code.len(),
            balance_is_zero: balance.is_zero(),
            nonce,
        })
    }

    async fn federation_size(&self) -> BlockchainResult<u64> {
        let bridge = self.bridge();
        let size = rpc_call(
            "federation_size",
            self.timeout_duration,
            bridge.getFederationSize().call(),
        )
        .await?;
        non_negative("federation_size", size)
    }

    async fn federation_threshold(&self) -> BlockchainResult<u64> {
        let bridge = self.bridge();
        let threshold = rpc_call(
            "federation_threshold",
            self.timeout_duration,
            bridge.getFederationThreshold().call(),
        )
        .await?;
        non_negative("federation_threshold", threshold)
    }

    async fn federator_public_key(&self, index: u64, kind: KeyKind) -> BlockchainResult<Bytes> {
        let index = I256::try_from(index)
            .map_err(|e| BlockchainError::Rpc(format!("federator index {}: {}", index, e)))?;
        let bridge = self.bridge();
        rpc_call(
            "federator_public_key",
            self.timeout_duration,
            bridge
                .getFederatorPublicKeyOfType(index, kind.as_str().to_string())
                .call(),
        )
        .await
    }

    async fn federation_address(&self) -> BlockchainResult<String> {
        let bridge = self.bridge();
        rpc_call(
            "federation_address",
            self.timeout_duration,
            bridge.getFederationAddress().call(),
        )
        .await
    }

    async fn active_federation_creation_height(&self) -> BlockchainResult<u64> {
        let bridge = self.bridge();
        let height = rpc_call(
            "active_federation_creation_height",
            self.timeout_duration,
            bridge.getActiveFederationCreationBlockHeight().call(),
        )
        .await?;
        u64::try_from(height).map_err(|e| {
            BlockchainError::Rpc(format!("active_federation_creation_height: {}", e))
        })
    }

    async fn hash_quote(&self, quote: OnChainQuote) -> BlockchainResult<B256> {
        let lbc = LiquidityBridgeContract::new(self.lbc_address, self.provider.clone());
        rpc_call("hash_quote", self.timeout_duration, lbc.hashQuote(quote).call()).await
    }

    async fn call_for_user(&self, wallet: &Wallet, quote: OnChainQuote) -> BlockchainResult<TxHash> {
        let lbc = LiquidityBridgeContract::new(self.lbc_address, self.writer(wallet));
        let value = quote.value;
        let pending = rpc_call(
            "call_for_user",
            self.timeout_duration,
            lbc.callForUser(quote).value(value).send(),
        )
        .await?;
        Ok(*pending.tx_hash())
    }

    async fn register_peg_in(
        &self,
        wallet: &Wallet,
        quote: OnChainQuote,
        signature: Bytes,
        btc_raw_tx: Bytes,
        partial_merkle_tree: Bytes,
        height: u64,
    ) -> BlockchainResult<TxHash> {
        let lbc = LiquidityBridgeContract::new(self.lbc_address, self.writer(wallet));
        let pending = rpc_call(
            "register_peg_in",
            self.timeout_duration,
            lbc.registerPegIn(
                quote,
                signature,
                btc_raw_tx,
                partial_merkle_tree,
                U256::from(height),
            )
            .send(),
        )
        .await?;
        Ok(*pending.tx_hash())
    }
}

impl std::fmt::Debug for RpcNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcNode")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("lbc_address", &self.lbc_address)
            .field("bridge_address", &self.bridge_address)
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
