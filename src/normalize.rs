//! Unit normalization for raw printer payloads.
//!
//! The printer reports some values as display strings (`"49%"`,
//! `"41.35°C"`) and the build height in micrometers. [`normalize`] turns
//! those into plain numbers so every consumer sees one encoding.

use serde_json::{Map, Number, Value};
use tracing::warn;

/// Fields reported as percentage strings
pub const PERCENT_FIELDS: [&str; 3] = ["disk", "mem", "proc"];
/// Field reported as a degree-Celsius string
pub const TEMPERATURE_FIELD: &str = "temp";
/// Field reported in micrometers
pub const HEIGHT_FIELD: &str = "CurrentHeight";

const MICROMETERS_PER_MILLIMETER: f64 = 1000.0;

/// Normalize a merged status + analytic payload.
///
/// Only string values are suffix-stripped, so feeding the output back in
/// changes nothing.
///
/// `CurrentHeight` is divided by 1000 only when it arrives as a JSON
/// integer. The firmware sends micrometers as integers, so a float such as
/// `42550.0` is taken to be millimeters already and is passed through
/// unchanged. This is what keeps the conversion idempotent.
pub fn normalize(raw: Map<String, Value>) -> Map<String, Value> {
    let mut normalized = raw;

    for key in PERCENT_FIELDS {
        strip_numeric_suffix(&mut normalized, key, &['%'], "percentage");
    }

    strip_numeric_suffix(&mut normalized, TEMPERATURE_FIELD, &['°', 'C'], "temperature");

    if let Some(millimeters) = normalized.get(HEIGHT_FIELD).and_then(micrometers_to_millimeters) {
        normalized.insert(HEIGHT_FIELD.to_string(), millimeters);
    }

    normalized
}

/// Replace a suffixed string with its numeric value. Non-strings are left
/// alone; unparsable strings are kept as-is with a warning.
fn strip_numeric_suffix(fields: &mut Map<String, Value>, key: &str, suffix: &[char], kind: &str) {
    let parsed = match fields.get(key) {
        Some(Value::String(text)) => parse_suffixed(text, suffix).ok_or_else(|| text.clone()),
        _ => return,
    };

    match parsed {
        Ok(number) => {
            fields.insert(key.to_string(), Value::Number(number));
        }
        Err(text) => warn!("Could not parse {} value for {}: {:?}", kind, key, text),
    }
}

fn parse_suffixed(text: &str, suffix: &[char]) -> Option<Number> {
    let bare = text.trim().trim_end_matches(|c| suffix.contains(&c)).trim();
    let parsed = bare.parse::<f64>().ok()?;
    Number::from_f64(parsed)
}

fn micrometers_to_millimeters(value: &Value) -> Option<Value> {
    let Value::Number(number) = value else {
        return None;
    };
    // Raw heights are integers; converted ones are always floats.
    if number.is_f64() {
        return None;
    }
    let micrometers = number.as_f64()?;
    Number::from_f64(micrometers / MICROMETERS_PER_MILLIMETER).map(Value::Number)
}
