use super::errors::{ensure_success, ConnectorError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const SERVICE_CODE: &str = "AmazonEC2";

/// On-demand hourly USD price lookup for an instance type.
#[async_trait]
pub trait PriceCatalog: Send + Sync {
    /// `Ok(None)` when the service knows no price for `instance_type`.
    async fn hourly_price(&self, instance_type: &str) -> Result<Option<Decimal>, ConnectorError>;
}

fn decimal_from_text(text: &str) -> Result<Decimal, ConnectorError> {
    Decimal::from_str(text.trim())
        .or_else(|_| Decimal::from_scientific(text.trim()))
        .map_err(|err| ConnectorError::InvalidResponse(format!("price {:?}: {}", text, err)))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Static price list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListedPrice {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct StaticPriceCatalog {
    prices: HashMap<String, Decimal>,
}

impl StaticPriceCatalog {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self { prices }
    }

    /// Parse a YAML (or JSON) document mapping instance name to hourly USD.
    pub fn from_yaml(document: &str) -> Result<Self, ConnectorError> {
        let listed: HashMap<String, ListedPrice> = serde_yaml::from_str(document)
            .map_err(|err| ConnectorError::InvalidResponse(format!("price list: {}", err)))?;

        let prices = listed
            .into_iter()
            .map(|(name, price)| {
                let amount = match price {
                    ListedPrice::Number(n) => decimal_from_text(&n.to_string())?,
                    ListedPrice::Text(s) => decimal_from_text(&s)?,
                };
                Ok((name, amount))
            })
            .collect::<Result<HashMap<_, _>, ConnectorError>>()?;

        Ok(Self { prices })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConnectorError> {
        let document = std::fs::read_to_string(path).map_err(|err| {
            ConnectorError::Internal(format!("Failed to read price list {}: {}", path.display(), err))
        })?;
        Self::from_yaml(&document)
    }
}

#[async_trait]
impl PriceCatalog for StaticPriceCatalog {
    async fn hourly_price(&self, instance_type: &str) -> Result<Option<Decimal>, ConnectorError> {
        Ok(self.prices.get(instance_type).copied())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP price list (get-products style query)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct GetProductsResponse {
    #[serde(rename = "PriceList", default)]
    price_list: Vec<Value>,
}

pub struct HttpPriceCatalog {
    endpoint: String,
    region: String,
    http_client: reqwest::Client,
}

impl HttpPriceCatalog {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| ConnectorError::Internal(format!("HTTP client error: {}", err)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            region: region.into(),
            http_client,
        })
    }

    /// Query document pinning Linux, shared tenancy, no pre-installed
    /// software and used capacity in the configured region.
    pub fn query(&self, instance_type: &str) -> Value {
        let term = |field: &str, value: &str| {
            serde_json::json!({ "Type": "TERM_MATCH", "Field": field, "Value": value })
        };

        serde_json::json!({
            "ServiceCode": SERVICE_CODE,
            "Filters": [
                term("instanceType", instance_type),
                term("location", &self.region),
                term("operatingSystem", "Linux"),
                term("tenancy", "Shared"),
                term("preInstalledSw", "NA"),
                term("capacitystatus", "Used"),
            ]
        })
    }
}

/// Hourly USD of the first on-demand price dimension of a price-list item.
/// Items arrive either as embedded JSON strings or as objects.
pub fn parse_on_demand_usd(item: &Value) -> Result<Decimal, ConnectorError> {
    let parsed;
    let product = match item {
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).map_err(|err| {
                ConnectorError::InvalidResponse(format!("price list item: {}", err))
            })?;
            &parsed
        }
        other => other,
    };

    let first_value = |value: &Value| -> Option<Value> {
        value.as_object().and_then(|map| map.values().next().cloned())
    };

    let term = first_value(&product["terms"]["OnDemand"])
        .ok_or_else(|| ConnectorError::InvalidResponse("no on-demand term".to_string()))?;
    let dimension = first_value(&term["priceDimensions"])
        .ok_or_else(|| ConnectorError::InvalidResponse("no price dimension".to_string()))?;

    match &dimension["pricePerUnit"]["USD"] {
        Value::String(text) => decimal_from_text(text),
        Value::Number(n) => decimal_from_text(&n.to_string()),
        _ => Err(ConnectorError::InvalidResponse(
            "price dimension without USD amount".to_string(),
        )),
    }
}

#[async_trait]
impl PriceCatalog for HttpPriceCatalog {
    #[tracing::instrument(name = "Look up hourly price.", skip(self))]
    async fn hourly_price(&self, instance_type: &str) -> Result<Option<Decimal>, ConnectorError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&self.query(instance_type))
            .send()
            .await?;
        let body: GetProductsResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| ConnectorError::InvalidResponse(format!("price list: {}", err)))?;

        match body.price_list.first() {
            Some(item) => parse_on_demand_usd(item).map(Some),
            None => Ok(None),
        }
    }
}
