use async_trait::async_trait;
use cloudcost::connectors::{
    AiProvider, ConnectorError, LocalObjectStore, StaticInstanceCatalog, StaticPriceCatalog,
};
use cloudcost::models::InstanceType;
use cloudcost::services::BatchService;
use cloudcost::startup::{run, AppServices};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub storage: tempfile::TempDir,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// Model stand-in that always answers with the same text.
pub struct ScriptedAi(pub String);

#[async_trait]
impl AiProvider for ScriptedAi {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, ConnectorError> {
        Ok(self.0.clone())
    }
}

/// Model stand-in whose endpoint is down.
pub struct UnreachableAi;

#[async_trait]
impl AiProvider for UnreachableAi {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, ConnectorError> {
        Err(ConnectorError::ServiceUnavailable("connection refused".to_string()))
    }
}

pub fn catalog() -> StaticInstanceCatalog {
    StaticInstanceCatalog::new(vec![
        InstanceType::from_mib("t3.medium", 2, 4096),
        InstanceType::from_mib("m5.large", 2, 8192),
        InstanceType::from_mib("t3.xlarge", 4, 16384),
        InstanceType::from_mib("r5.2xlarge", 8, 65536),
    ])
}

/// `r5.2xlarge` is deliberately left unpriced.
pub fn prices() -> StaticPriceCatalog {
    StaticPriceCatalog::new(HashMap::from([
        ("t3.medium".to_string(), Decimal::new(416, 4)),
        ("m5.large".to_string(), Decimal::new(96, 3)),
        ("t3.xlarge".to_string(), Decimal::new(1, 1)),
    ]))
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_ai(Arc::new(ScriptedAi(r#"{"requirements":[]}"#.to_string()))).await
}

pub async fn spawn_app_with_ai(ai: Arc<dyn AiProvider>) -> TestApp {
    spawn(Some(ai)).await
}

pub async fn spawn_app_without_ai() -> TestApp {
    spawn(None).await
}

async fn spawn(ai: Option<Arc<dyn AiProvider>>) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let storage = tempfile::tempdir().expect("Failed to create storage dir");

    let services = AppServices::new(
        ai,
        Arc::new(catalog()),
        Arc::new(prices()),
        Arc::new(LocalObjectStore::new(storage.path())),
        "price--inventory",
        BatchService::offset_from_minutes(330),
    );

    let server = run(listener, services).await.expect("Failed to bind address.");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        storage,
        client: reqwest::Client::new(),
    }
}
