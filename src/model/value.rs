//! Document model: ordered documents of typed values

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 12-byte document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Canonical 24-character lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn parse_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::codec(None, format!("invalid ObjectId '{s}': {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An IEEE 754-2008 128-bit decimal in BID encoding, kept as its wire bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal128(bson::Decimal128);

impl Decimal128 {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bson::Decimal128::from_bytes(bytes))
    }

    pub fn bytes(&self) -> [u8; 16] {
        self.0.bytes()
    }

    /// Nearest `f64`, read back from the decimal string. Precision beyond
    /// what a double holds is lost.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Decimal128 {
    type Err = Error;

    /// Parses `[-]digits[.digits][E[+|-]digits]`, `NaN` and `[-]Infinity`.
    /// Inputs that would need inexact rounding are rejected.
    fn from_str(s: &str) -> Result<Self> {
        if !s.bytes().any(|b| b.is_ascii_digit() || b.is_ascii_alphabetic()) {
            return Err(Error::codec(None, format!("invalid decimal128 '{s}'")));
        }
        s.parse::<bson::Decimal128>()
            .map(Self)
            .map_err(|e| Error::codec(None, format!("invalid decimal128 '{s}': {e}")))
    }
}

/// A typed value from the document model
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal128(Decimal128),
    String(String),
    Code(String),
    Symbol(String),
    ObjectId(ObjectId),
    Binary { subtype: u8, bytes: Vec<u8> },
    /// Milliseconds since the Unix epoch
    DateTime(i64),
    Timestamp { t: u32, i: u32 },
    Array(Vec<Value>),
    Document(Document),
}

/// The kind of a [`Value`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Int32,
    Int64,
    Double,
    Decimal128,
    String,
    Code,
    Symbol,
    ObjectId,
    Binary,
    DateTime,
    Timestamp,
    Array,
    Document,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Double => "double",
            ValueKind::Decimal128 => "decimal128",
            ValueKind::String => "utf-8",
            ValueKind::Code => "code",
            ValueKind::Symbol => "symbol",
            ValueKind::ObjectId => "oid",
            ValueKind::Binary => "binary",
            ValueKind::DateTime => "date-time",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Array => "array",
            ValueKind::Document => "document",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal128(_) => ValueKind::Decimal128,
            Value::String(_) => ValueKind::String,
            Value::Code(_) => ValueKind::Code,
            Value::Symbol(_) => ValueKind::Symbol,
            Value::ObjectId(_) => ValueKind::ObjectId,
            Value::Binary { .. } => ValueKind::Binary,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Timestamp { .. } => ValueKind::Timestamp,
            Value::Array(_) => ValueKind::Array,
            Value::Document(_) => ValueKind::Document,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(oid: ObjectId) -> Self {
        Value::ObjectId(oid)
    }
}

impl From<Decimal128> for Value {
    fn from(d: Decimal128) -> Self {
        Value::Decimal128(d)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// An ordered collection of key/value pairs.
///
/// Field order is the order fields were inserted (or appeared on the wire)
/// and is never sorted. Duplicate keys are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field at the end
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Build a [`Document`] from `key => value` pairs, keeping their order.
///
/// ```
/// use bsonframe::{doc, Value};
///
/// let d = doc! { "a" => 1, "b" => "x", "c" => doc! { "nested" => true } };
/// assert_eq!(d.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
/// assert_eq!(d.get("a"), Some(&Value::Int32(1)));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::model::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::model::Document::new();
        $(document.push($key, $value);)+
        document
    }};
}
