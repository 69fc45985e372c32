use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Moolre reports amounts either as JSON numbers or as decimal strings. Anything else yields `None`.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}
