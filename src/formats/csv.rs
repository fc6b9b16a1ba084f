//! CSV -> canonical JSON conversion.
//!
//! The first row is treated as a header naming fields; if that parse yields no
//! records (e.g. a header-only file), the input is re-parsed with positional
//! fields instead.

use csv::ReaderBuilder;
use serde_json::{Map, Value};

use crate::error::VoxResult;
use crate::types::float_json;

/// Convert CSV bytes into canonical JSON text.
pub fn normalize(bytes: &[u8]) -> VoxResult<String> {
    let value = to_value(bytes)?;
    Ok(serde_json::to_string(&value)?)
}

/// Parse CSV bytes into a JSON array of records (objects), falling back to
/// positional rows when the header-based parse produces nothing.
pub fn to_value(bytes: &[u8]) -> VoxResult<Value> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut obj = Map::new();
        for (i, cell) in record.iter().enumerate() {
            let key = match headers.get(i) {
                Some(h) => h.trim().to_string(),
                None => i.to_string(),
            };
            obj.insert(key, coerce_cell(cell));
        }
        records.push(Value::Object(obj));
    }

    if records.is_empty() {
        return positional(bytes);
    }
    Ok(Value::Array(records))
}

/// Positional parse: every row becomes an array of coerced cells.
fn positional(bytes: &[u8]) -> VoxResult<Value> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(Value::Array(record.iter().map(coerce_cell).collect()));
    }
    Ok(Value::Array(rows))
}

/// Coerce a single cell: empty becomes null, a cell that entirely parses as a
/// finite number becomes a number, anything else stays a string.
pub fn coerce_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(x) = trimmed.parse::<f64>() {
        if x.is_finite() {
            return float_json(x);
        }
    }
    Value::String(trimmed.to_string())
}
