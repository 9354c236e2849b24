//! Wire-format document encoder, the inverse of [`decode_document`](super::decode_document)

use crate::error::{Error, Result};
use crate::model::{Document, Value};

use super::decode::{
    BINARY_SUBTYPE_OLD, MAX_NESTING_DEPTH, TYPE_ARRAY, TYPE_BINARY, TYPE_BOOL, TYPE_CODE,
    TYPE_DATE_TIME, TYPE_DECIMAL128, TYPE_DOCUMENT, TYPE_DOUBLE, TYPE_INT32, TYPE_INT64, TYPE_NULL,
    TYPE_OBJECT_ID, TYPE_STRING, TYPE_SYMBOL, TYPE_TIMESTAMP,
};

/// Encode a document as wire bytes.
///
/// Fails when a field name contains a NUL byte, which the wire format
/// cannot represent, or when the document nests deeper than the decoder
/// accepts.
pub fn encode_document(document: &Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_document(&mut buf, document.iter(), 1)?;
    Ok(buf)
}

fn write_document<'a, K: AsRef<str>>(
    buf: &mut Vec<u8>,
    fields: impl Iterator<Item = (K, &'a Value)>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::codec(
            None,
            format!("document nested deeper than {MAX_NESTING_DEPTH} levels"),
        ));
    }
    let start = buf.len();
    buf.extend_from_slice(&[0; 4]);
    for (key, value) in fields {
        let key = key.as_ref();
        if key.as_bytes().contains(&0) {
            return Err(Error::codec(None, format!("field name {key:?} contains a NUL byte")));
        }
        buf.push(type_byte(value));
        buf.extend_from_slice(key.as_bytes());
        buf.push(0);
        write_value(buf, value, depth)?;
    }
    buf.push(0);
    let len = (buf.len() - start) as i32;
    buf[start..start + 4].copy_from_slice(&len.to_le_bytes());
    Ok(())
}

fn type_byte(value: &Value) -> u8 {
    match value {
        Value::Null => TYPE_NULL,
        Value::Bool(_) => TYPE_BOOL,
        Value::Int32(_) => TYPE_INT32,
        Value::Int64(_) => TYPE_INT64,
        Value::Double(_) => TYPE_DOUBLE,
        Value::Decimal128(_) => TYPE_DECIMAL128,
        Value::String(_) => TYPE_STRING,
        Value::Code(_) => TYPE_CODE,
        Value::Symbol(_) => TYPE_SYMBOL,
        Value::ObjectId(_) => TYPE_OBJECT_ID,
        Value::Binary { .. } => TYPE_BINARY,
        Value::DateTime(_) => TYPE_DATE_TIME,
        Value::Timestamp { .. } => TYPE_TIMESTAMP,
        Value::Array(_) => TYPE_ARRAY,
        Value::Document(_) => TYPE_DOCUMENT,
    }
}

fn write_value(buf: &mut Vec<u8>, value: &Value, depth: usize) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => buf.push(u8::from(*b)),
        Value::Int32(i) => buf.extend_from_slice(&i.to_le_bytes()),
        Value::Int64(i) | Value::DateTime(i) => buf.extend_from_slice(&i.to_le_bytes()),
        Value::Double(f) => buf.extend_from_slice(&f.to_le_bytes()),
        Value::Decimal128(d) => buf.extend_from_slice(&d.bytes()),
        Value::String(s) | Value::Code(s) | Value::Symbol(s) => write_string(buf, s),
        Value::ObjectId(oid) => buf.extend_from_slice(&oid.bytes()),
        Value::Binary { subtype, bytes } => {
            if *subtype == BINARY_SUBTYPE_OLD {
                buf.extend_from_slice(&(bytes.len() as i32 + 4).to_le_bytes());
                buf.push(*subtype);
                buf.extend_from_slice(&(bytes.len() as i32).to_le_bytes());
            } else {
                buf.extend_from_slice(&(bytes.len() as i32).to_le_bytes());
                buf.push(*subtype);
            }
            buf.extend_from_slice(bytes);
        }
        Value::Timestamp { t, i } => {
            let raw = (u64::from(*t) << 32) | u64::from(*i);
            buf.extend_from_slice(&raw.to_le_bytes());
        }
        Value::Array(items) => write_document(
            buf,
            items.iter().enumerate().map(|(i, v)| (i.to_string(), v)),
            depth + 1,
        )?,
        Value::Document(doc) => write_document(buf, doc.iter(), depth + 1)?,
    }
    Ok(())
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}
