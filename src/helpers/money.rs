use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;

pub const PRICE_NOT_AVAILABLE: &str = "Price Not Available";

pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `$` followed by the amount with exactly two decimals.
pub fn format_usd(value: Decimal) -> String {
    let mut rounded = round_cents(value);
    rounded.rescale(2);
    format!("${}", rounded)
}

pub fn serialize_usd<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_usd(*value))
}

pub fn serialize_usd_or_unavailable<S>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(amount) => serializer.serialize_str(&format_usd(*amount)),
        None => serializer.serialize_str(PRICE_NOT_AVAILABLE),
    }
}

pub fn serialize_optional_usd<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(amount) => serializer.serialize_str(&format_usd(*amount)),
        None => serializer.serialize_none(),
    }
}
