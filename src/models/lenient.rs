//! Forgiving deserializers for profile input.
//!
//! Profile numbers arrive from form fields as either JSON numbers or strings.
//! Anything that does not parse becomes `None` instead of a deserialization
//! error, so a bad field only loses its own score contribution.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::domain::{CostType, NumericFilter, TestType};

/// Values that mean "no preference" for region and cost selectors.
const NO_PREFERENCE: &[&str] = &["", "none", "no preference", "any", "all"];

fn number_from_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Whole-number scores; fractional input is truncated toward zero.
pub fn u32_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n.trunc() as u32))
}

pub fn u8_opt<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|n| *n >= 0.0 && *n <= u8::MAX as f64)
        .map(|n| n.trunc() as u8))
}

/// Blank or missing means no filter; anything else that is not a number
/// becomes [`NumericFilter::Unparsed`].
fn numeric_filter<T>(value: Option<Value>, convert: impl Fn(f64) -> Option<T>) -> Option<NumericFilter<T>> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(
            number_from_value(&value)
                .and_then(convert)
                .map_or(NumericFilter::Unparsed, NumericFilter::Value),
        ),
    }
}

pub fn f64_filter<'de, D>(deserializer: D) -> Result<Option<NumericFilter<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(numeric_filter(value, Some))
}

pub fn u32_filter<'de, D>(deserializer: D) -> Result<Option<NumericFilter<u32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(numeric_filter(value, |n| {
        (n >= 0.0 && n <= u32::MAX as f64).then(|| n.trunc() as u32)
    }))
}

pub fn text_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value))
}

pub fn preference_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(text_from_value)
        .filter(|s| !is_no_preference(s)))
}

pub fn cost_type_opt<'de, D>(deserializer: D) -> Result<Option<CostType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(text_from_value)
        .and_then(|s| CostType::parse(&s)))
}

pub fn test_type_opt<'de, D>(deserializer: D) -> Result<Option<TestType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(text_from_value)
        .and_then(|s| TestType::parse(&s)))
}

pub fn is_no_preference(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    NO_PREFERENCE.contains(&lowered.as_str())
}
