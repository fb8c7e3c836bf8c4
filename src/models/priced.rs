use crate::helpers::money;
use crate::models::MatchedInstance;
use rust_decimal::Decimal;
use serde::Serialize;

/// Terminal record of the pipeline. Amounts stay numeric; the `$` strings
/// only exist in the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedInstance {
    #[serde(rename = "Server Name")]
    pub server_name: String,
    #[serde(rename = "CPU")]
    pub cpu: u32,
    #[serde(rename = "RAM")]
    pub ram: u32,
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
    #[serde(rename = "Storage")]
    pub storage: String,
    #[serde(rename = "Database")]
    pub database: String,
    #[serde(
        rename = "Monthly Server Cost",
        serialize_with = "money::serialize_usd_or_unavailable"
    )]
    pub monthly_server_cost: Option<Decimal>,
    #[serde(rename = "Monthly Storage Cost", serialize_with = "money::serialize_usd")]
    pub monthly_storage_cost: Decimal,
    #[serde(rename = "Monthly Database Cost", serialize_with = "money::serialize_usd")]
    pub monthly_database_cost: Decimal,
    /// `None` whenever the compute price is unknown.
    #[serde(rename = "Total Pricing", serialize_with = "money::serialize_optional_usd")]
    pub total_cost: Option<Decimal>,
}

/// Monthly cost components of one matched instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostBreakdown {
    pub server: Option<Decimal>,
    pub storage: Decimal,
    pub database: Decimal,
}

impl CostBreakdown {
    /// `None` when the compute price is unknown or the sum does not fit.
    pub fn total(&self) -> Option<Decimal> {
        self.server
            .and_then(|server| server.checked_add(self.storage))
            .and_then(|sum| sum.checked_add(self.database))
            .map(money::round_cents)
    }
}

impl PricedInstance {
    pub fn new(matched: MatchedInstance, costs: CostBreakdown) -> Self {
        let total_cost = costs.total();
        Self {
            server_name: matched.server_name,
            cpu: matched.cpu,
            ram: matched.ram,
            instance_type: matched.instance_type,
            storage: matched.storage,
            database: matched.database,
            monthly_server_cost: costs.server,
            monthly_storage_cost: costs.storage,
            monthly_database_cost: costs.database,
            total_cost,
        }
    }
}
