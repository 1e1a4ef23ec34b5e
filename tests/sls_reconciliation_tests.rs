//! # SLS Reconciliation Tests
//!
//! Drive the managed reconciler for log service kinds through the real SLS
//! client, with wiremock standing in for the project's virtual host.

mod common;

use alibaba_provider_controller::controller::reconciler::PassOutcome;
use alibaba_provider_controller::prelude::*;
use alibaba_provider_controller::provider::sls::SlsClientFactory;
use common::{MemoryStores, CONFIG_NAME};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn logstore_reconciler(
    stores: &Arc<MemoryStores>,
    server: &MockServer,
) -> ManagedReconciler<LogStore> {
    let factory = SlsClientFactory::new().unwrap().with_base_url(server.uri());
    let connector = Connector::new(
        stores.clone(),
        stores.clone(),
        stores.clone(),
        Arc::new(EndpointRegistry::with_builtin_kinds()),
        Arc::new(factory),
    );
    ManagedReconciler::new(
        connector,
        stores.clone(),
        CancellationToken::new(),
        Duration::from_secs(30),
    )
}

fn logstore() -> LogStore {
    LogStore::new(
        "access",
        LogStoreSpec {
            resource: ResourceSpec {
                provider_config_ref: Some(ProviderConfigReference {
                    name: CONFIG_NAME.to_string(),
                }),
                ..ResourceSpec::default()
            },
            for_provider: LogStoreParameters {
                project_name: "p1".to_string(),
                logstore_name: "access".to_string(),
                ttl: 30,
                shard_count: 2,
                auto_split: None,
                max_split_shard: None,
            },
        },
    )
}

fn not_exist(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(serde_json::json!({
        "errorCode": code,
        "errorMessage": format!("{code}: does not exist")
    }))
}

#[tokio::test]
async fn test_logstore_without_project_retries_create() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logstores/access"))
        .respond_with(not_exist("LogStoreNotExist"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/logstores"))
        .respond_with(not_exist("ProjectNotExist"))
        .expect(1)
        .mount(&server)
        .await;

    let stores = MemoryStores::with_credentials("Secret");
    let reconciler = logstore_reconciler(&stores, &server);
    let mut record = logstore();

    let error = reconciler.reconcile(&mut record).await.unwrap_err();

    assert!(matches!(
        error,
        ReconcilerError::Create(ProviderError::NotFound)
    ));
    assert_eq!(error.class(), ErrorClass::Transient);
    let synced = record
        .condition(ConditionType::Synced)
        .expect("every pass writes Synced");
    assert!(!synced.is_true());
    assert!(stores.usages.lock().unwrap().contains_key("access"));
}

#[tokio::test]
async fn test_existing_logstore_is_up_to_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logstores/access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "logstoreName": "access",
            "ttl": 30,
            "shardCount": 2,
            "autoSplit": false,
            "maxSplitShard": 64
        })))
        .mount(&server)
        .await;

    let stores = MemoryStores::with_credentials("Secret");
    let reconciler = logstore_reconciler(&stores, &server);
    let mut record = logstore();

    let outcome = reconciler.reconcile(&mut record).await.unwrap();

    assert_eq!(outcome, PassOutcome::UpToDate);
    assert!(record.condition(ConditionType::Ready).unwrap().is_true());
    let published = stores.published.lock().unwrap();
    assert!(published.is_empty(), "no connection secret ref was set");
}
