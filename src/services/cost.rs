use crate::connectors::PriceCatalog;
use crate::helpers::money::round_cents;
use crate::models::{CostBreakdown, MatchedInstance, PricedInstance};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

pub const HOURS_PER_MONTH: i64 = 24 * 30;
const GB_PER_TB: i64 = 1024;

lazy_static! {
    static ref SIZE_PATTERN: Regex = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(tb|gb)").unwrap();
    static ref MEDIUM_PATTERN: Regex = Regex::new(r"(?i)(ssd|hdd|nvme)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMedium {
    Ssd,
    Hdd,
    Nvme,
}

impl StorageMedium {
    pub fn parse(text: &str) -> Option<Self> {
        let found = MEDIUM_PATTERN.captures(text)?.get(1)?.as_str().to_ascii_uppercase();
        match found.as_str() {
            "SSD" => Some(Self::Ssd),
            "HDD" => Some(Self::Hdd),
            "NVME" => Some(Self::Nvme),
            _ => None,
        }
    }

    /// USD per GB-month.
    pub fn rate(self) -> Decimal {
        match self {
            Self::Ssd => Decimal::new(8, 2),
            Self::Hdd => Decimal::new(45, 3),
            Self::Nvme => Decimal::new(10, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    MySql,
    PostgreSql,
    MicrosoftSqlServer,
    OracleDatabase,
    Redis,
}

impl DatabaseEngine {
    /// Exact engine names only; `"None"` and anything unrecognised map to
    /// no engine.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "MySQL" => Some(Self::MySql),
            "PostgreSQL" => Some(Self::PostgreSql),
            "Microsoft SQL Server" => Some(Self::MicrosoftSqlServer),
            "Oracle Database" => Some(Self::OracleDatabase),
            "Redis" => Some(Self::Redis),
            _ => None,
        }
    }

    /// USD per GB-month.
    pub fn rate(self) -> Decimal {
        match self {
            Self::MySql | Self::PostgreSql => Decimal::new(10, 2),
            Self::MicrosoftSqlServer => Decimal::new(20, 2),
            Self::OracleDatabase => Decimal::new(30, 2),
            Self::Redis => Decimal::new(15, 2),
        }
    }
}

/// First `<number><GB|TB>` in `text`, in GB.
pub fn parse_size_gb(text: &str) -> Option<Decimal> {
    let caps = SIZE_PATTERN.captures(text)?;
    let amount = Decimal::from_str(caps.get(1)?.as_str()).ok()?;
    if caps.get(2)?.as_str().eq_ignore_ascii_case("tb") {
        amount.checked_mul(Decimal::from(GB_PER_TB))
    } else {
        Some(amount)
    }
}

/// Sum over the `+`-separated components of a storage descriptor such as
/// `"500GB SSD + 1TB HDD"`. Components without both a size and a medium
/// count as zero, as do components whose cost does not fit a `Decimal`.
pub fn storage_cost(descriptor: &str) -> Decimal {
    let mut total = Decimal::ZERO;
    for component in descriptor.split('+').map(str::trim) {
        let (Some(size_gb), Some(medium)) =
            (parse_size_gb(component), StorageMedium::parse(component))
        else {
            continue;
        };
        match size_gb
            .checked_mul(medium.rate())
            .and_then(|cost| total.checked_add(cost))
        {
            Some(sum) => total = sum,
            None => tracing::warn!(component, "Storage component cost overflows, skipped"),
        }
    }
    round_cents(total)
}

/// The first size anywhere in `storage` priced at the engine's rate; one
/// size covers the whole database regardless of storage components.
pub fn database_cost(database: &str, storage: &str) -> Decimal {
    let Some(engine) = DatabaseEngine::from_name(database) else {
        return Decimal::ZERO;
    };
    let Some(size_gb) = parse_size_gb(storage) else {
        return Decimal::ZERO;
    };
    match size_gb.checked_mul(engine.rate()) {
        Some(cost) => round_cents(cost),
        None => {
            tracing::warn!(database, storage, "Database cost overflows, counted as zero");
            Decimal::ZERO
        }
    }
}

/// Thirty 24-hour days of the hourly rate. A zero rate, or one too large to
/// scale, means the price list has no usable figure.
pub fn monthly_server_cost(hourly: Option<Decimal>) -> Option<Decimal> {
    hourly
        .filter(|rate| !rate.is_zero())
        .and_then(|rate| rate.checked_mul(Decimal::from(HOURS_PER_MONTH)))
        .map(round_cents)
}

/// Prices matched instances against the price list and the static storage
/// and database rate tables.
pub struct CostCalculator {
    prices: Arc<dyn PriceCatalog>,
}

impl CostCalculator {
    pub fn new(prices: Arc<dyn PriceCatalog>) -> Self {
        Self { prices }
    }

    async fn hourly_price(&self, instance_type: &str) -> Option<Decimal> {
        match self.prices.hourly_price(instance_type).await {
            Ok(Some(price)) => Some(price),
            Ok(None) => {
                tracing::warn!(instance_type, "No on-demand price listed");
                None
            }
            Err(err) => {
                tracing::error!(instance_type, error = %err, "Error fetching price");
                None
            }
        }
    }

    pub async fn breakdown(&self, matched: &MatchedInstance) -> CostBreakdown {
        let hourly = self.hourly_price(&matched.instance_type).await;
        CostBreakdown {
            server: monthly_server_cost(hourly),
            storage: storage_cost(&matched.storage),
            database: database_cost(&matched.database, &matched.storage),
        }
    }

    pub async fn price(&self, matched: MatchedInstance) -> PricedInstance {
        let costs = self.breakdown(&matched).await;
        PricedInstance::new(matched, costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::StaticPriceCatalog;
    use std::collections::HashMap;

    fn usd(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn matched(instance_type: &str, storage: &str, database: &str) -> MatchedInstance {
        MatchedInstance {
            server_name: "db1".to_string(),
            cpu: 2,
            ram: 8,
            instance_type: instance_type.to_string(),
            storage: storage.to_string(),
            database: database.to_string(),
        }
    }

    fn calculator() -> CostCalculator {
        let prices = HashMap::from([
            ("m5.large".to_string(), usd("0.096")),
            ("free.tier".to_string(), Decimal::ZERO),
        ]);
        CostCalculator::new(Arc::new(StaticPriceCatalog::new(prices)))
    }

    #[test]
    fn test_storage_cost_single_components() {
        assert_eq!(storage_cost("100GB SSD"), usd("8.00"));
        assert_eq!(storage_cost("1TB HDD"), usd("46.08"));
        assert_eq!(storage_cost("200 gb nvme"), usd("20.00"));
    }

    #[test]
    fn test_storage_cost_sums_components() {
        assert_eq!(storage_cost("100GB SSD + 1TB HDD"), usd("54.08"));
        assert_eq!(storage_cost("1.5TB SSD"), usd("122.88"));
    }

    #[test]
    fn test_storage_cost_skips_unparseable_components() {
        assert_eq!(storage_cost("100GB SSD + lots of tape"), usd("8.00"));
        assert_eq!(storage_cost("500GB"), Decimal::ZERO);
        assert_eq!(storage_cost("Unknown"), Decimal::ZERO);
    }

    #[test]
    fn test_storage_cost_skips_components_that_overflow() {
        let huge = "79228162514264337593543950335GB NVMe";
        let descriptor = vec![huge; 11].join(" + ");

        let total = storage_cost(&descriptor);
        assert!(total > Decimal::ZERO);
        assert!(total <= Decimal::MAX);
        assert_eq!(storage_cost(&format!("{} + lots of tape", huge)), storage_cost(huge));
    }

    #[test]
    fn test_database_cost() {
        assert_eq!(database_cost("MySQL", "200GB SSD"), usd("20.00"));
        assert_eq!(database_cost("Oracle Database", "1TB SSD"), usd("307.20"));
        assert_eq!(database_cost("None", "200GB SSD"), Decimal::ZERO);
        assert_eq!(database_cost("MongoDB", "200GB SSD"), Decimal::ZERO);
        assert_eq!(database_cost("Redis", "Unknown"), Decimal::ZERO);
    }

    #[test]
    fn test_database_cost_uses_first_size_only() {
        assert_eq!(database_cost("PostgreSQL", "100GB SSD + 1TB HDD"), usd("10.00"));
    }

    #[test]
    fn test_monthly_server_cost() {
        assert_eq!(monthly_server_cost(Some(usd("0.10"))), Some(usd("72.00")));
        assert_eq!(monthly_server_cost(Some(usd("0.0416"))), Some(usd("29.95")));
        assert_eq!(monthly_server_cost(Some(Decimal::ZERO)), None);
        assert_eq!(monthly_server_cost(None), None);
        assert_eq!(monthly_server_cost(Some(Decimal::MAX)), None);
    }

    #[tokio::test]
    async fn test_price_combines_components() {
        let priced = calculator()
            .price(matched("m5.large", "100GB SSD", "MySQL"))
            .await;
        assert_eq!(priced.monthly_server_cost, Some(usd("69.12")));
        assert_eq!(priced.monthly_storage_cost, usd("8.00"));
        assert_eq!(priced.monthly_database_cost, usd("10.00"));
        assert_eq!(priced.total_cost, Some(usd("87.12")));
    }

    #[tokio::test]
    async fn test_price_without_listed_price_has_no_total() {
        let priced = calculator().price(matched("x2.huge", "100GB SSD", "None")).await;
        assert_eq!(priced.monthly_server_cost, None);
        assert_eq!(priced.monthly_storage_cost, usd("8.00"));
        assert_eq!(priced.total_cost, None);

        let priced = calculator().price(matched("free.tier", "100GB SSD", "None")).await;
        assert_eq!(priced.total_cost, None);
    }

    #[tokio::test]
    async fn test_repricing_is_stable() {
        let calculator = calculator();
        let input = matched("m5.large", "100GB SSD + 1TB HDD", "Redis");
        let first = calculator.price(input.clone()).await;
        let second = calculator.price(input).await;
        assert_eq!(first, second);
    }
}
