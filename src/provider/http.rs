// JSON-RPC 2.0 provider over HTTP
//
// Forwards EIP-1193 requests to a wallet or bridge endpoint. HTTP has no push
// channel, so notifications are derived: whenever an `eth_chainId` or account
// query returns something different from what we saw last, the matching
// event is broadcast to subscribers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, Mutex};

use super::{ProviderError, ProviderEvent, WalletProvider, EVENT_CHANNEL_CAPACITY};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

pub struct HttpProvider {
    /// reqwest::Client is internally Arc-based
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
    last_chain_id: Mutex<Option<String>>,
    last_accounts: Mutex<Option<Vec<String>>>,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
            events,
            last_chain_id: Mutex::new(None),
            last_accounts: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn observe(&self, method: &str, result: &Value) {
        match method {
            "eth_chainId" => {
                let Some(chain_id) = result.as_str() else {
                    return;
                };
                let mut last = self.last_chain_id.lock().await;
                let changed = last
                    .as_deref()
                    .is_some_and(|prev| !prev.eq_ignore_ascii_case(chain_id));
                if changed {
                    log::info!("Chain changed: {} -> {}", last.as_deref().unwrap_or("?"), chain_id);
                    let _ = self
                        .events
                        .send(ProviderEvent::ChainChanged(chain_id.to_string()));
                }
                *last = Some(chain_id.to_string());
            }
            "eth_accounts" | "eth_requestAccounts" => {
                let accounts: Vec<String> = result
                    .as_array()
                    .map(|list| {
                        list.iter()
                            .filter_map(|v| v.as_str().map(str::to_lowercase))
                            .collect()
                    })
                    .unwrap_or_default();
                let mut last = self.last_accounts.lock().await;
                if last.as_ref().is_some_and(|prev| *prev != accounts) {
                    log::debug!("Accounts changed: {:?}", accounts);
                    let _ = self
                        .events
                        .send(ProviderEvent::AccountsChanged(accounts.clone()));
                }
                *last = Some(accounts);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl WalletProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        log::debug!("RPC -> {} (id {})", method, id);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("{} failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "{} failed with status: {}",
                method,
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("{} response parse failed: {}", method, e)))?;

        if let Some(error) = parsed.error {
            log::debug!("RPC <- {} error {}: {}", method, error.code, error.message);
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = parsed.result.unwrap_or(Value::Null);
        self.observe(method, &result).await;
        Ok(result)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
