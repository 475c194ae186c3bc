//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use tokio::net::TcpListener;

use liquidity_bridge::blockchain::contracts::OnChainQuote;
use liquidity_bridge::blockchain::{
    AccountState, BlockchainError, BlockchainResult, ChainConnector, ChainNode,
    ConnectorSettings, EmergencyBranch, Wallet,
};
use liquidity_bridge::codec::{decode_evm_address, local_quote_hash};
use liquidity_bridge::config::schema::ServerConfig;
use liquidity_bridge::federation::{FederatorKey, KeyKind};
use liquidity_bridge::http::HttpServer;
use liquidity_bridge::lifecycle::Shutdown;
use liquidity_bridge::quoting::{
    LiquidityProvider, LocalProvider, ProviderRegistry, ProviderTerms, QuoteProtocol,
};
use liquidity_bridge::resilience::RetryPolicy;
use liquidity_bridge::storage::InMemoryQuoteStore;

pub const CHAIN_ID: u64 = 33;
pub const LBC: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
/// P2SH of the 2-of-3 [`FEDERATORS`] multisig on regtest.
pub const FED_ADDRESS: &str = "2MuFU6ZyBLtDNadMA6RnwJdXGWUSUaoKLeS";
/// P2SH of the same federation with the [`active_emergency`] branch.
pub const ERP_FED_ADDRESS: &str = "2MyHbggn1P4pqSicTpm9WK6EqE5AYXWGMZT";
pub const CONTRACT: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
pub const RSK_REFUND: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const BTC_REFUND: &str = "mh5CE8Nbj38iND267s4XnvhSmhDW7yWc6Q";
pub const LP_BTC: &str = "midSACfDe3qAxJZZXA9gkwBZgPqJJUpy1w";

// Anvil accounts #0 and #1; publicly known, never use for real funds.
pub const LP_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const LP_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const OTHER_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const FEDERATORS: [&str; 3] = [
    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
    "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
    "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9",
];
pub const ERP_FEDERATORS: [&str; 3] = [
    "03774ae7f858a9411e5ef4246b70c65aac5649980be5c17891bbec17895da008cb",
    "03d01115d548e7561b15c38f004d734633687cf4419620095bc5b0f47070afe85a",
    "03f28773c2d975288bc7d1d205c3748651b075fbc6610e58cddeeddf8f19405aa8",
];

pub const BASE_FEE: u64 = 1_000;
pub const GAS_PRICE: u128 = 60;
pub const NEW_ACCOUNT_GAS: u64 = 25_000;

/// Counters and switches shared between a [`MockNode`] and its test.
#[derive(Default)]
pub struct NodeStats {
    pub reads: AtomicU32,
    pub federation_reads: AtomicU32,
    pub hash_calls: AtomicU32,
    pub writes: AtomicU32,
    /// Every call fails while set.
    pub down: AtomicBool,
    /// Number of upcoming `hashQuote` calls that fail.
    pub hash_failures: AtomicU32,
}

impl NodeStats {
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn federation_reads(&self) -> u32 {
        self.federation_reads.load(Ordering::SeqCst)
    }
}

/// In-process chain node with a fixed federation and `hashQuote` computed locally.
pub struct MockNode {
    pub stats: Arc<NodeStats>,
    pub gas_price: u128,
    pub estimate: u64,
    pub account: AccountState,
    pub active_height: u64,
    pub fed_address: &'static str,
}

impl MockNode {
    pub fn new(stats: Arc<NodeStats>) -> Self {
        Self {
            stats,
            gas_price: GAS_PRICE,
            estimate: 30_000,
            account: AccountState {
                code_len: 0,
                balance_is_zero: false,
                nonce: 4,
            },
            active_height: 4_000,
            fed_address: FED_ADDRESS,
        }
    }

    fn check(&self) -> BlockchainResult<()> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        if self.stats.down.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc("connection refused".to_string()));
        }
        Ok(())
    }

    fn federation_read(&self) -> BlockchainResult<()> {
        self.stats.federation_reads.fetch_add(1, Ordering::SeqCst);
        self.check()
    }
}

impl ChainNode for MockNode {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.check()?;
        Ok(CHAIN_ID)
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.check()?;
        Ok(5_000)
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.check()?;
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _to: Address, _value: U256, _data: Bytes) -> BlockchainResult<u64> {
        self.check()?;
        Ok(self.estimate)
    }

    async fn account_state(&self, _address: Address, _block: u64) -> BlockchainResult<AccountState> {
        self.check()?;
        Ok(self.account)
    }

    async fn federation_size(&self) -> BlockchainResult<u64> {
        self.federation_read()?;
        Ok(FEDERATORS.len() as u64)
    }

    async fn federation_threshold(&self) -> BlockchainResult<u64> {
        self.federation_read()?;
        Ok(2)
    }

    async fn federator_public_key(&self, index: u64, kind: KeyKind) -> BlockchainResult<Bytes> {
        self.federation_read()?;
        assert_eq!(kind, KeyKind::Btc);
        let key = FEDERATORS
            .get(index as usize)
            .ok_or_else(|| BlockchainError::Rpc(format!("no federator {}", index)))?;
        Ok(Bytes::from(alloy::hex::decode(key).unwrap()))
    }

    async fn federation_address(&self) -> BlockchainResult<String> {
        self.check()?;
        Ok(self.fed_address.to_string())
    }

    async fn active_federation_creation_height(&self) -> BlockchainResult<u64> {
        self.federation_read()?;
        Ok(self.active_height)
    }

    async fn hash_quote(&self, quote: OnChainQuote) -> BlockchainResult<B256> {
        self.stats.hash_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let failing = self
            .stats
            .hash_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BlockchainError::Rpc("execution reverted".to_string()));
        }
        Ok(local_quote_hash(&quote))
    }

    async fn call_for_user(&self, _wallet: &Wallet, _quote: OnChainQuote) -> BlockchainResult<TxHash> {
        self.stats.writes.fetch_add(1, Ordering::SeqCst);
        Ok(TxHash::repeat_byte(1))
    }

    async fn register_peg_in(
        &self,
        _wallet: &Wallet,
        _quote: OnChainQuote,
        _signature: Bytes,
        _btc_raw_tx: Bytes,
        _partial_merkle_tree: Bytes,
        _height: u64,
    ) -> BlockchainResult<TxHash> {
        self.stats.writes.fetch_add(1, Ordering::SeqCst);
        Ok(TxHash::repeat_byte(2))
    }
}

pub fn settings(emergency: EmergencyBranch) -> ConnectorSettings {
    ConnectorSettings {
        chain_id: CHAIN_ID,
        lbc_address: decode_evm_address(LBC).unwrap(),
        required_bridge_confirmations: 100,
        new_account_gas_cost: NEW_ACCOUNT_GAS,
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(5),
            deadline: Duration::from_secs(5),
        },
        emergency,
    }
}

/// Emergency branch that never applies.
pub fn no_emergency() -> EmergencyBranch {
    EmergencyBranch {
        activation_height: u64::MAX,
        keys: Vec::new(),
        csv_value: 52_560,
    }
}

/// Emergency branch active for every federation the mock reports.
pub fn active_emergency() -> EmergencyBranch {
    EmergencyBranch {
        activation_height: 0,
        keys: ERP_FEDERATORS
            .iter()
            .map(|k| FederatorKey::btc_from_hex(k).unwrap())
            .collect(),
        csv_value: 52_560,
    }
}

pub fn terms() -> ProviderTerms {
    ProviderTerms {
        btc_address: LP_BTC.to_string(),
        call_fee: U256::from(BASE_FEE),
        penalty_fee: U256::from(500u64),
        time_for_deposit: 3_600,
        call_time: 7_200,
        confirmations: 10,
        max_value: U256::from(10u64).pow(U256::from(18u64)),
    }
}

pub fn provider(name: &str, key: &str) -> LocalProvider {
    LocalProvider::new(name, Wallet::from_private_key(key, CHAIN_ID).unwrap(), terms())
}

pub fn registry() -> ProviderRegistry {
    ProviderRegistry::new(vec![Arc::new(provider("alpha", LP_KEY)) as Arc<dyn LiquidityProvider>])
}

/// A protocol over a fresh [`MockNode`], returning the handles tests inspect.
pub struct Harness {
    pub protocol: Arc<QuoteProtocol<MockNode>>,
    pub stats: Arc<NodeStats>,
    pub store: InMemoryQuoteStore,
}

pub fn harness() -> Harness {
    harness_with(|_| {}, no_emergency())
}

pub fn harness_with(configure: impl FnOnce(&mut MockNode), emergency: EmergencyBranch) -> Harness {
    let stats = Arc::new(NodeStats::default());
    let mut node = MockNode::new(stats.clone());
    configure(&mut node);

    let store = InMemoryQuoteStore::new(None);
    let protocol = Arc::new(QuoteProtocol::new(
        ChainConnector::new(node, settings(emergency)),
        registry(),
        Arc::new(store.clone()),
        bitcoin::Network::Regtest,
    ));

    Harness {
        protocol,
        stats,
        store,
    }
}

/// Serve `protocol` on an ephemeral port.
pub async fn spawn_server(protocol: Arc<QuoteProtocol<MockNode>>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(protocol, ServerConfig::default());
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn quote_request_json() -> serde_json::Value {
    serde_json::json!({
        "callContractAddress": CONTRACT,
        "callContractArguments": "0x",
        "valueToTransfer": "0x5",
        "gasLimit": 21000,
        "bitcoinRefundAddress": BTC_REFUND,
        "rskRefundAddress": RSK_REFUND,
    })
}
