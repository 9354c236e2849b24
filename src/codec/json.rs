//! Extended JSON conversion
//!
//! Reads both the canonical and relaxed Extended JSON forms and writes the
//! relaxed form. Plain JSON numbers become `Int32` when they fit, `Int64`
//! when integral and `Double` otherwise.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Datelike, Utc};
use serde_json::{json, Map, Number, Value as Json};

use crate::error::{Error, Result};
use crate::model::{format_datetime, Decimal128, Document, ObjectId, Value};

use super::decode::MAX_NESTING_DEPTH;

/// Convert a JSON value to a document-model value.
///
/// Containers nest at most as deep as the wire decoder allows.
pub fn from_json(json: &Json) -> Result<Value> {
    convert(json, 1)
}

fn convert(json: &Json, depth: usize) -> Result<Value> {
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => number(n),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => {
            check_depth(depth)?;
            Value::Array(
                items
                    .iter()
                    .map(|item| convert(item, depth + 1))
                    .collect::<Result<_>>()?,
            )
        }
        Json::Object(map) => match wrapper(map)? {
            Some(value) => value,
            None => Value::Document(fields(map, depth)?),
        },
    };
    Ok(value)
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::codec(
            None,
            format!("document nested deeper than {MAX_NESTING_DEPTH} levels"),
        ));
    }
    Ok(())
}

/// Parse one JSON object into a document
pub fn parse_document(text: &str) -> Result<Document> {
    let json: Json = serde_json::from_str(text)?;
    match json {
        Json::Object(map) => document_from_map(&map),
        other => Err(Error::codec(
            None,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
    }
}

pub(crate) fn document_from_map(map: &Map<String, Json>) -> Result<Document> {
    fields(map, 1)
}

fn fields(map: &Map<String, Json>, depth: usize) -> Result<Document> {
    check_depth(depth)?;
    map.iter()
        .map(|(k, v)| Ok((k.clone(), convert(v, depth + 1)?)))
        .collect()
}

pub(crate) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

fn number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        match i32::try_from(i) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(i),
        }
    } else {
        Value::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Recognise a single-key `$`-wrapper; `None` for ordinary objects
fn wrapper(map: &Map<String, Json>) -> Result<Option<Value>> {
    if map.len() != 1 {
        return Ok(None);
    }
    let Some((key, inner)) = map.iter().next() else {
        return Ok(None);
    };
    let invalid = || Error::codec(None, format!("invalid {key} value: {inner}"));

    let value = match key.as_str() {
        "$oid" => Value::ObjectId(ObjectId::parse_str(inner.as_str().ok_or_else(invalid)?)?),
        "$date" => Value::DateTime(date_millis(inner).ok_or_else(invalid)?),
        "$numberInt" => Value::Int32(parse_str(inner).ok_or_else(invalid)?),
        "$numberLong" => Value::Int64(parse_str(inner).ok_or_else(invalid)?),
        "$numberDouble" => Value::Double(parse_double(inner).ok_or_else(invalid)?),
        "$numberDecimal" => {
            Value::Decimal128(inner.as_str().ok_or_else(invalid)?.parse::<Decimal128>()?)
        }
        "$binary" => binary(inner).ok_or_else(invalid)?,
        "$timestamp" => {
            let t = inner.get("t").and_then(Json::as_u64).and_then(|t| u32::try_from(t).ok());
            let i = inner.get("i").and_then(Json::as_u64).and_then(|i| u32::try_from(i).ok());
            match (t, i) {
                (Some(t), Some(i)) => Value::Timestamp { t, i },
                _ => return Err(invalid()),
            }
        }
        "$code" => Value::Code(inner.as_str().ok_or_else(invalid)?.to_string()),
        "$symbol" => Value::Symbol(inner.as_str().ok_or_else(invalid)?.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn parse_str<T: std::str::FromStr>(json: &Json) -> Option<T> {
    json.as_str()?.parse().ok()
}

fn parse_double(json: &Json) -> Option<f64> {
    match json.as_str()? {
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        s => s.parse().ok(),
    }
}

fn date_millis(json: &Json) -> Option<i64> {
    match json {
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        Json::Number(n) => n.as_i64(),
        Json::Object(map) if map.len() == 1 => parse_str(map.get("$numberLong")?),
        _ => None,
    }
}

fn binary(json: &Json) -> Option<Value> {
    let bytes = BASE64.decode(json.get("base64")?.as_str()?).ok()?;
    let subtype = u8::from_str_radix(json.get("subType")?.as_str()?, 16).ok()?;
    Some(Value::Binary { subtype, bytes })
}

/// Render a value as relaxed Extended JSON.
///
/// Duplicate keys inside a nested document collapse to the last one, as
/// JSON objects cannot repeat keys.
pub fn to_relaxed_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int32(i) => json!(i),
        Value::Int64(i) => json!(i),
        Value::Double(f) => match Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None => json!({ "$numberDouble": crate::model::format_double(*f) }),
        },
        Value::Decimal128(d) => json!({ "$numberDecimal": d.to_string() }),
        Value::String(s) => Json::String(s.clone()),
        Value::Code(s) => json!({ "$code": s }),
        Value::Symbol(s) => json!({ "$symbol": s }),
        Value::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
        Value::Binary { subtype, bytes } => json!({
            "$binary": { "base64": BASE64.encode(bytes), "subType": format!("{subtype:02x}") }
        }),
        Value::DateTime(ms) => {
            let in_range = DateTime::<Utc>::from_timestamp_millis(*ms)
                .is_some_and(|dt| (1970..=9999).contains(&dt.year()));
            if in_range {
                json!({ "$date": format_datetime(*ms) })
            } else {
                json!({ "$date": { "$numberLong": ms.to_string() } })
            }
        }
        Value::Timestamp { t, i } => json!({ "$timestamp": { "t": t, "i": i } }),
        Value::Array(items) => Json::Array(items.iter().map(to_relaxed_json).collect()),
        Value::Document(doc) => Json::Object(
            doc.iter()
                .map(|(k, v)| (k.to_string(), to_relaxed_json(v)))
                .collect(),
        ),
    }
}
