//! Registry Client Integration Tests
//!
//! `ProviderRegistry` calldata, sender selection and receipt polling against
//! the in-memory provider.
//!
//! Run with: cargo test --test registry_client_test -- --nocapture

mod common;

use common::{account, init_logger, test_config, MockProvider};
use ethers::types::{Address, H256, U256};
use hns_client::registry::signatures;
use hns_client::{
    NameServiceError, ProviderRegistry, RegistryClient, SharedProvider, WalletSession,
};
use std::sync::Arc;

fn registry(mock: &Arc<MockProvider>) -> ProviderRegistry {
    let provider: SharedProvider = mock.clone();
    let session = Arc::new(WalletSession::new(Some(provider)));
    ProviderRegistry::new(session, &test_config())
}

#[tokio::test]
async fn test_register_sends_price_to_contract() {
    init_logger();
    let mock = MockProvider::new();
    let registry = registry(&mock);

    let value = U256::exp10(17) * U256::from(5);
    let tx_hash = registry.register("abc", value).await.unwrap();
    let receipt = registry.wait_for_receipt(tx_hash).await.unwrap();
    assert!(receipt.succeeded());
    assert_eq!(receipt.transaction_hash, tx_hash);

    let chain = mock.state();
    let sent = &chain.sent[0];
    assert_eq!(sent.signature, signatures::REGISTER);
    assert_eq!(sent.value, value);
    // no session account yet, so the first authorized one signs
    assert_eq!(sent.from, account());
    assert_eq!(registry.contract(), test_config().contract_address);
}

#[tokio::test]
async fn test_reads_decode_contract_views() {
    init_logger();
    let mock = MockProvider::new();
    mock.seed("abc", "hello", account());
    mock.seed("doom", "", Address::repeat_byte(0x01));
    let registry = registry(&mock);

    assert_eq!(
        registry.get_all_names().await.unwrap(),
        vec!["abc".to_string(), "doom".to_string()]
    );
    assert_eq!(registry.records("abc").await.unwrap(), "hello");
    assert_eq!(registry.domains("abc").await.unwrap(), account());
    assert_eq!(registry.records("missing").await.unwrap(), "");
    assert_eq!(registry.domains("missing").await.unwrap(), Address::zero());
}

#[tokio::test]
async fn test_mutation_without_account() {
    init_logger();
    let mock = MockProvider::new();
    mock.state().authorized.clear();
    let registry = registry(&mock);

    let err = registry.set_record("abc", "x").await.unwrap_err();
    assert_eq!(err, NameServiceError::NotConnected);
    assert!(mock.state().sent.is_empty());
}

#[tokio::test]
async fn test_receipt_polling_gives_up() {
    init_logger();
    let mock = MockProvider::new();
    let registry = registry(&mock);

    let err = registry
        .wait_for_receipt(H256::repeat_byte(0x42))
        .await
        .unwrap_err();
    assert!(matches!(err, NameServiceError::Transport(_)));
    assert_eq!(
        mock.count("eth_getTransactionReceipt"),
        test_config().receipt_max_attempts as usize
    );
}

#[tokio::test]
async fn test_transport_failure_on_read() {
    init_logger();
    let mock = MockProvider::new();
    mock.state().fail_calls = true;
    let registry = registry(&mock);

    let err = registry.get_all_names().await.unwrap_err();
    assert_eq!(err, NameServiceError::Transport("connection refused".into()));
}

#[tokio::test]
async fn test_registry_without_wallet() {
    init_logger();
    let session = Arc::new(WalletSession::new(None));
    let registry = ProviderRegistry::new(session, &test_config());

    let err = registry.get_all_names().await.unwrap_err();
    assert!(matches!(err, NameServiceError::ProviderUnavailable(_)));
}
