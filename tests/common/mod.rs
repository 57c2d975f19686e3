//! Common test utilities for name service integration tests
//!
//! This module provides shared test infrastructure including:
//! - An in-memory wallet provider that simulates the registry contract
//! - Logger setup
//! - Manager construction with zero delays
#![allow(dead_code)]

use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::{Address, H256, U256};
use hns_client::provider::{ProviderError, ProviderEvent, WalletProvider, EVENT_CHANNEL_CAPACITY};
use hns_client::registry::{selector, signatures};
use hns_client::{NameServiceConfig, NameServiceManager, SharedProvider, MUMBAI_CHAIN_ID};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn account() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn other_account() -> Address {
    Address::repeat_byte(0xbb)
}

/// Configuration with no waiting between steps
pub fn test_config() -> NameServiceConfig {
    NameServiceConfig {
        refresh_delay: Duration::ZERO,
        receipt_poll_interval: Duration::from_millis(1),
        receipt_max_attempts: 5,
        ..NameServiceConfig::default()
    }
}

pub fn manager(mock: &Arc<MockProvider>) -> NameServiceManager {
    let provider: SharedProvider = mock.clone();
    NameServiceManager::new(Some(provider), test_config())
}

/// Transaction accepted by the mock wallet
#[derive(Debug, Clone)]
pub struct SentTx {
    pub signature: &'static str,
    pub args: Vec<Token>,
    pub from: Address,
    pub value: U256,
}

/// Wallet plus chain state behind `MockProvider`
#[derive(Debug)]
pub struct MockChain {
    pub chain_id: u64,
    /// Chains the wallet can switch to without adding them
    pub known_chains: HashSet<u64>,
    /// Returned by `eth_accounts`
    pub authorized: Vec<Address>,
    /// Granted on `eth_requestAccounts`
    pub wallet_accounts: Vec<Address>,
    /// Wallet methods or registry signatures the user declines (4001)
    pub reject: HashSet<String>,
    /// Registry signatures whose receipts report status 0
    pub fail_receipts_for: HashSet<String>,
    /// Receipts never show up for these signatures
    pub never_included: HashSet<String>,
    /// `eth_call` fails at the transport level
    pub fail_calls: bool,
    /// Delay before the wallet answers `eth_sendTransaction`
    pub send_delay: Duration,
    /// Delay before the wallet answers `eth_chainId`
    pub chain_id_delay: Duration,
    /// Per-label delay on `records` lookups
    pub lookup_delays: HashMap<String, Duration>,

    pub names: Vec<String>,
    pub records: HashMap<String, String>,
    pub owners: HashMap<String, Address>,
    pub receipts: HashMap<H256, Value>,

    pub calls: Vec<String>,
    pub sent: Vec<SentTx>,
    pub last_add_params: Option<Value>,
    next_tx: u64,
}

impl MockChain {
    fn new() -> Self {
        Self {
            chain_id: MUMBAI_CHAIN_ID,
            known_chains: [1, MUMBAI_CHAIN_ID].into_iter().collect(),
            authorized: vec![account()],
            wallet_accounts: vec![account()],
            reject: HashSet::new(),
            fail_receipts_for: HashSet::new(),
            never_included: HashSet::new(),
            fail_calls: false,
            send_delay: Duration::ZERO,
            chain_id_delay: Duration::ZERO,
            lookup_delays: HashMap::new(),
            names: Vec::new(),
            records: HashMap::new(),
            owners: HashMap::new(),
            receipts: HashMap::new(),
            calls: Vec::new(),
            sent: Vec::new(),
            last_add_params: None,
            next_tx: 1,
        }
    }

    fn rejected(&self, key: &str) -> Result<(), ProviderError> {
        if self.reject.contains(key) {
            return Err(ProviderError::rpc(4001, "User rejected the request."));
        }
        Ok(())
    }
}

/// In-memory EIP-1193 provider simulating the `.hell` registry
pub struct MockProvider {
    state: Mutex<MockChain>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            state: Mutex::new(MockChain::new()),
            events,
        })
    }

    pub fn state(&self) -> MutexGuard<'_, MockChain> {
        self.state.lock().unwrap()
    }

    /// Pre-register a name as if minted earlier
    pub fn seed(&self, label: &str, record: &str, owner: Address) {
        let mut chain = self.state();
        chain.names.push(label.to_string());
        chain.records.insert(label.to_string(), record.to_string());
        chain.owners.insert(label.to_string(), owner);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    /// Simulate the user switching chains inside the wallet
    pub fn switch_chain(&self, chain_id: u64) {
        self.state().chain_id = chain_id;
        self.emit(ProviderEvent::ChainChanged(format!("{:#x}", chain_id)));
    }

    fn accounts_value(accounts: &[Address]) -> Value {
        Value::Array(
            accounts
                .iter()
                .map(|a| Value::String(format!("{:?}", a)))
                .collect(),
        )
    }

    fn target_chain(params: &Value) -> Result<u64, ProviderError> {
        params[0]["chainId"]
            .as_str()
            .and_then(|raw| u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok())
            .ok_or_else(|| ProviderError::rpc(-32602, "invalid chainId"))
    }

    fn calldata(raw: &Value) -> Result<Vec<u8>, ProviderError> {
        let raw = raw
            .as_str()
            .ok_or_else(|| ProviderError::rpc(-32602, "missing data"))?;
        hex::decode(raw.trim_start_matches("0x")).map_err(|e| ProviderError::rpc(-32602, e.to_string()))
    }

    fn signature_of(data: &[u8]) -> Result<&'static str, ProviderError> {
        let all = [
            signatures::REGISTER,
            signatures::SET_RECORD,
            signatures::GET_ALL_NAMES,
            signatures::RECORDS,
            signatures::DOMAINS,
        ];
        all.into_iter()
            .find(|sig| data.len() >= 4 && data[..4] == selector(sig))
            .ok_or_else(|| ProviderError::rpc(-32000, "execution reverted: unknown selector"))
    }

    fn args_for(signature: &str, data: &[u8]) -> Result<Vec<Token>, ProviderError> {
        let types = match signature {
            s if s == signatures::SET_RECORD => vec![ParamType::String, ParamType::String],
            s if s == signatures::GET_ALL_NAMES => vec![],
            _ => vec![ParamType::String],
        };
        decode(&types, &data[4..]).map_err(|e| ProviderError::rpc(-32602, e.to_string()))
    }

    fn send_transaction(&self, params: &Value) -> Result<Value, ProviderError> {
        let tx = &params[0];
        let data = Self::calldata(&tx["data"])?;
        let signature = Self::signature_of(&data)?;
        let args = Self::args_for(signature, &data)?;
        let from = tx["from"]
            .as_str()
            .and_then(|raw| Address::from_str(raw).ok())
            .ok_or_else(|| ProviderError::rpc(-32602, "missing from"))?;
        let value = tx["value"]
            .as_str()
            .and_then(|raw| U256::from_str_radix(raw.trim_start_matches("0x"), 16).ok())
            .unwrap_or_default();

        let mut chain = self.state();
        chain.calls.push(format!("eth_sendTransaction:{}", signature));
        chain.rejected(signature)?;

        let tx_hash = H256::from_low_u64_be(chain.next_tx);
        chain.next_tx += 1;
        chain.sent.push(SentTx {
            signature,
            args: args.clone(),
            from,
            value,
        });

        if chain.never_included.contains(signature) {
            return Ok(json!(tx_hash));
        }

        let succeeded = !chain.fail_receipts_for.contains(signature);
        if succeeded {
            let label = args.first().cloned().and_then(Token::into_string).unwrap_or_default();
            if signature == signatures::REGISTER {
                chain.names.push(label.clone());
                chain.records.insert(label.clone(), String::new());
                chain.owners.insert(label, from);
            } else if signature == signatures::SET_RECORD {
                let record = args.get(1).cloned().and_then(Token::into_string).unwrap_or_default();
                chain.records.insert(label, record);
            }
        }
        let status = if succeeded { "0x1" } else { "0x0" };
        chain.receipts.insert(
            tx_hash,
            json!({
                "transactionHash": tx_hash,
                "status": status,
                "blockNumber": "0x10",
            }),
        );
        Ok(json!(tx_hash))
    }

    async fn call(&self, params: &Value) -> Result<Value, ProviderError> {
        let data = Self::calldata(&params[0]["data"])?;
        let signature = Self::signature_of(&data)?;
        let args = Self::args_for(signature, &data)?;
        let label = args.first().cloned().and_then(Token::into_string).unwrap_or_default();

        let delay = {
            let mut chain = self.state();
            chain.calls.push(format!("eth_call:{}", signature));
            if chain.fail_calls {
                return Err(ProviderError::Transport("connection refused".into()));
            }
            match signature {
                s if s == signatures::RECORDS => chain.lookup_delays.get(&label).copied(),
                _ => None,
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let chain = self.state();
        let output = match signature {
            s if s == signatures::GET_ALL_NAMES => vec![Token::Array(
                chain.names.iter().cloned().map(Token::String).collect(),
            )],
            s if s == signatures::RECORDS => vec![Token::String(
                chain.records.get(&label).cloned().unwrap_or_default(),
            )],
            s if s == signatures::DOMAINS => vec![Token::Address(
                chain.owners.get(&label).copied().unwrap_or_default(),
            )],
            _ => return Err(ProviderError::rpc(-32000, "execution reverted")),
        };
        Ok(Value::String(format!("0x{}", hex::encode(encode(&output)))))
    }
}

#[async_trait::async_trait]
impl WalletProvider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            "eth_sendTransaction" => {
                let delay = self.state().send_delay;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                return self.send_transaction(&params);
            }
            "eth_call" => return self.call(&params).await,
            "eth_chainId" => {
                let delay = self.state().chain_id_delay;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            _ => {}
        }

        let mut chain = self.state();
        chain.calls.push(method.to_string());
        match method {
            "eth_requestAccounts" => {
                chain.rejected(method)?;
                chain.authorized = chain.wallet_accounts.clone();
                Ok(Self::accounts_value(&chain.authorized))
            }
            "eth_accounts" => Ok(Self::accounts_value(&chain.authorized)),
            "eth_chainId" => Ok(json!(format!("{:#x}", chain.chain_id))),
            "wallet_switchEthereumChain" => {
                chain.rejected(method)?;
                let target = Self::target_chain(&params)?;
                if !chain.known_chains.contains(&target) {
                    return Err(ProviderError::rpc(
                        4902,
                        format!("Unrecognized chain ID \"{:#x}\".", target),
                    ));
                }
                chain.chain_id = target;
                drop(chain);
                self.emit(ProviderEvent::ChainChanged(format!("{:#x}", target)));
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                chain.rejected(method)?;
                let target = Self::target_chain(&params)?;
                chain.last_add_params = Some(params[0].clone());
                chain.known_chains.insert(target);
                chain.chain_id = target;
                drop(chain);
                self.emit(ProviderEvent::ChainChanged(format!("{:#x}", target)));
                Ok(Value::Null)
            }
            "eth_getTransactionReceipt" => {
                let tx_hash: H256 = serde_json::from_value(params[0].clone())
                    .map_err(|e| ProviderError::rpc(-32602, e.to_string()))?;
                Ok(chain.receipts.get(&tx_hash).cloned().unwrap_or(Value::Null))
            }
            _ => Err(ProviderError::rpc(-32601, format!("method {} not found", method))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
