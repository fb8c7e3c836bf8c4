use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const UNKNOWN: &str = "Unknown";
pub const NO_DATABASE: &str = "None";

/// A single workload's requested resources, normalized.
///
/// This is also the wire shape of the `requirements` array accepted by the
/// calculation endpoint, where `CPU`/`RAM` may arrive as integers or integer
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "Server Name", default = "unknown")]
    pub server_name: String,
    #[serde(rename = "CPU", deserialize_with = "coerce_u32")]
    pub cpu_cores: u32,
    #[serde(rename = "RAM", deserialize_with = "coerce_u32")]
    pub ram_gb: u32,
    #[serde(rename = "Storage", default = "unknown")]
    pub storage: String,
    #[serde(rename = "Database", default = "no_database")]
    pub database: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn no_database() -> String {
    NO_DATABASE.to_string()
}

/// Positive integer given as a JSON number or an integer string.
fn coerce_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    let coerced = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    coerced
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| D::Error::custom(format!("expected a positive integer, got {value}")))
}

/// Unvalidated requirement fields, as produced by the model or read from a
/// spreadsheet row. Scalars of any JSON type are kept as text; blank values
/// count as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRequirement {
    #[serde(rename = "Server Name", default, deserialize_with = "scalar_text")]
    pub server_name: Option<String>,
    #[serde(rename = "CPU", default, deserialize_with = "scalar_text")]
    pub cpu: Option<String>,
    #[serde(rename = "RAM", default, deserialize_with = "scalar_text")]
    pub ram: Option<String>,
    #[serde(rename = "Storage", default, deserialize_with = "scalar_text")]
    pub storage: Option<String>,
    #[serde(rename = "Database", default, deserialize_with = "scalar_text")]
    pub database: Option<String>,
}

fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

impl RawRequirement {
    /// Build from `(column, cell)` pairs of a tabular row. Unknown columns,
    /// `IP Address` included, are ignored.
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut raw = Self::default();
        for (column, cell) in fields {
            let cell = non_blank(cell.to_string());
            match column.trim() {
                "Server Name" => raw.server_name = cell,
                "CPU" => raw.cpu = cell,
                "RAM" => raw.ram = cell,
                "Storage" => raw.storage = cell,
                "Database" => raw.database = cell,
                _ => {}
            }
        }
        raw
    }
}
