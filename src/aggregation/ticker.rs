//! Trade extraction from raw ticker messages

use serde_json::Value;

use super::window::Sample;
use crate::config::FieldNames;
use crate::{FeedError, Result};

/// Pull `(instrument, sample)` out of a message.
///
/// Returns `Ok(None)` for messages that are not trades: wrong or missing
/// discriminator, or no instrument field. Numeric fields may be JSON numbers
/// or decimal strings.
pub fn extract_trade<'a>(message: &'a Value, fields: &FieldNames) -> Result<Option<(&'a str, Sample)>> {
    let kind = message.get(&fields.type_field).and_then(Value::as_str);
    if kind != Some(fields.type_value.as_str()) {
        return Ok(None);
    }

    let Some(instrument) = message.get(&fields.instrument_field).and_then(Value::as_str) else {
        return Ok(None);
    };

    let price = numeric_field(message, &fields.price_field)?;
    let quantity = numeric_field(message, &fields.quantity_field)?;

    Ok(Some((instrument, Sample::new(price, quantity))))
}

fn numeric_field(message: &Value, field: &str) -> Result<f64> {
    let value = match message.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(other) => {
            return Err(FeedError::invalid_ticker(field, format!("expected a number, got {}", other)));
        }
        None => return Err(FeedError::invalid_ticker(field, "field is missing")),
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(FeedError::invalid_ticker(
            field,
            format!("'{}' is not a finite number", message[field]),
        )),
    }
}
