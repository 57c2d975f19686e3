// Registry contract binding
//
// Typed pass-through to the deployed name registry. Mutations go out as
// `eth_sendTransaction` through the wallet (which prompts the user), reads as
// `eth_call`. No caching and no retries: whatever the provider reports is
// returned to the caller as-is.

use async_trait::async_trait;
use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::{Address, H256, U256, U64};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::NameServiceConfig;
use crate::error::NameServiceError;
use crate::session::{parse_accounts, WalletSession};

/// Solidity signatures of the registry functions we call
pub mod signatures {
    pub const REGISTER: &str = "register(string)";
    pub const SET_RECORD: &str = "setRecord(string,string)";
    pub const GET_ALL_NAMES: &str = "getAllNames()";
    pub const RECORDS: &str = "records(string)";
    pub const DOMAINS: &str = "domains(string)";
}

/// Four-byte function selector
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = ethers::utils::keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector followed by the ABI-encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32 * args.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&encode(args));
    out
}

/// Receipt fields the pipelines care about
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: H256,
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub block_number: Option<U64>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == Some(U64::one())
    }
}

/// Registry operations
///
/// `register` and `set_record` resolve once the wallet has accepted and
/// broadcast the transaction; inclusion is awaited separately with
/// `wait_for_receipt`.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn register(&self, name: &str, value: U256) -> Result<H256, NameServiceError>;

    async fn set_record(&self, name: &str, record: &str) -> Result<H256, NameServiceError>;

    async fn get_all_names(&self) -> Result<Vec<String>, NameServiceError>;

    async fn records(&self, name: &str) -> Result<String, NameServiceError>;

    async fn domains(&self, name: &str) -> Result<Address, NameServiceError>;

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TxReceipt, NameServiceError>;
}

/// `RegistryClient` speaking through the session's wallet provider
pub struct ProviderRegistry {
    session: Arc<WalletSession>,
    contract: Address,
    poll_interval: Duration,
    max_attempts: u32,
}

impl ProviderRegistry {
    pub fn new(session: Arc<WalletSession>, config: &NameServiceConfig) -> Self {
        Self {
            session,
            contract: config.contract_address,
            poll_interval: config.receipt_poll_interval,
            max_attempts: config.receipt_max_attempts.max(1),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Account that signs mutations: the session's, else the first authorized one
    async fn sender(&self) -> Result<Address, NameServiceError> {
        if let Some(address) = self.session.active_address().await {
            return Ok(address);
        }
        let provider = self.session.provider()?;
        let value = provider.request("eth_accounts", json!([])).await?;
        parse_accounts(&value)?
            .first()
            .copied()
            .ok_or(NameServiceError::NotConnected)
    }

    async fn send_transaction(&self, data: Vec<u8>, value: U256) -> Result<H256, NameServiceError> {
        let provider = self.session.provider()?;
        let from = self.sender().await?;

        let tx = json!({
            "from": from,
            "to": self.contract,
            "data": format!("0x{}", hex::encode(data)),
            "value": format!("0x{:x}", value),
        });

        let result = provider.request("eth_sendTransaction", json!([tx])).await?;
        let tx_hash: H256 = serde_json::from_value(result.clone()).map_err(|e| {
            NameServiceError::invalid_response(format!("eth_sendTransaction returned {}: {}", result, e))
        })?;

        log::debug!("Transaction sent: {:?}", tx_hash);
        Ok(tx_hash)
    }

    async fn call(&self, signature: &str, args: &[Token], output: &[ParamType]) -> Result<Vec<Token>, NameServiceError> {
        let provider = self.session.provider()?;
        let data = encode_call(signature, args);

        let result = provider
            .request(
                "eth_call",
                json!([
                    { "to": self.contract, "data": format!("0x{}", hex::encode(data)) },
                    "latest"
                ]),
            )
            .await?;

        let bytes = decode_hex_result(&result)?;
        decode(output, &bytes).map_err(|e| {
            NameServiceError::invalid_response(format!("{} returned undecodable data: {}", signature, e))
        })
    }

    async fn call_single(&self, signature: &str, args: &[Token], output: ParamType) -> Result<Token, NameServiceError> {
        self.call(signature, args, &[output])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NameServiceError::invalid_response(format!("{} returned no values", signature)))
    }
}

fn decode_hex_result(result: &Value) -> Result<Vec<u8>, NameServiceError> {
    let raw = result
        .as_str()
        .ok_or_else(|| NameServiceError::invalid_response(format!("expected hex string, got {}", result)))?;
    let digits = raw.trim().strip_prefix("0x").unwrap_or(raw.trim());
    hex::decode(digits).map_err(|e| NameServiceError::invalid_response(format!("invalid hex result: {}", e)))
}

#[async_trait]
impl RegistryClient for ProviderRegistry {
    async fn register(&self, name: &str, value: U256) -> Result<H256, NameServiceError> {
        let data = encode_call(signatures::REGISTER, &[Token::String(name.to_string())]);
        self.send_transaction(data, value).await
    }

    async fn set_record(&self, name: &str, record: &str) -> Result<H256, NameServiceError> {
        let data = encode_call(
            signatures::SET_RECORD,
            &[Token::String(name.to_string()), Token::String(record.to_string())],
        );
        self.send_transaction(data, U256::zero()).await
    }

    async fn get_all_names(&self) -> Result<Vec<String>, NameServiceError> {
        let token = self
            .call_single(
                signatures::GET_ALL_NAMES,
                &[],
                ParamType::Array(Box::new(ParamType::String)),
            )
            .await?;

        token
            .into_array()
            .ok_or_else(|| NameServiceError::invalid_response("getAllNames did not return an array"))?
            .into_iter()
            .map(|t| {
                t.into_string()
                    .ok_or_else(|| NameServiceError::invalid_response("getAllNames entry is not a string"))
            })
            .collect()
    }

    async fn records(&self, name: &str) -> Result<String, NameServiceError> {
        self.call_single(signatures::RECORDS, &[Token::String(name.to_string())], ParamType::String)
            .await?
            .into_string()
            .ok_or_else(|| NameServiceError::invalid_response("records did not return a string"))
    }

    async fn domains(&self, name: &str) -> Result<Address, NameServiceError> {
        self.call_single(signatures::DOMAINS, &[Token::String(name.to_string())], ParamType::Address)
            .await?
            .into_address()
            .ok_or_else(|| NameServiceError::invalid_response("domains did not return an address"))
    }

    /// Poll until the transaction is included in a block
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TxReceipt, NameServiceError> {
        let provider = self.session.provider()?;

        for attempt in 1..=self.max_attempts {
            let result = provider
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if !result.is_null() {
                let receipt: TxReceipt = serde_json::from_value(result).map_err(|e| {
                    NameServiceError::invalid_response(format!("bad receipt for {:?}: {}", tx_hash, e))
                })?;
                log::debug!(
                    "Receipt for {:?} after {} poll(s): status {:?}",
                    tx_hash,
                    attempt,
                    receipt.status
                );
                return Ok(receipt);
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(NameServiceError::Transport(format!(
            "Transaction {:?} not included after {} attempts",
            tx_hash, self.max_attempts
        )))
    }
}
