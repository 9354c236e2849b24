//! Wire-format document decoder
//!
//! A document is an int32 little-endian total length, a sequence of
//! elements and a trailing NUL. Each element is a type byte, a
//! NUL-terminated key and a type-dependent payload. Nested documents and
//! arrays are decoded in two passes over the same bytes: a counting pass
//! over the element headers sizes the output, then a decoding pass fills it.

use crate::error::{Error, Result};
use crate::model::{Decimal128, Document, ObjectId, Value};

pub(crate) const TYPE_DOUBLE: u8 = 0x01;
pub(crate) const TYPE_STRING: u8 = 0x02;
pub(crate) const TYPE_DOCUMENT: u8 = 0x03;
pub(crate) const TYPE_ARRAY: u8 = 0x04;
pub(crate) const TYPE_BINARY: u8 = 0x05;
pub(crate) const TYPE_OBJECT_ID: u8 = 0x07;
pub(crate) const TYPE_BOOL: u8 = 0x08;
pub(crate) const TYPE_DATE_TIME: u8 = 0x09;
pub(crate) const TYPE_NULL: u8 = 0x0a;
pub(crate) const TYPE_CODE: u8 = 0x0d;
pub(crate) const TYPE_SYMBOL: u8 = 0x0e;
pub(crate) const TYPE_INT32: u8 = 0x10;
pub(crate) const TYPE_TIMESTAMP: u8 = 0x11;
pub(crate) const TYPE_INT64: u8 = 0x12;
pub(crate) const TYPE_DECIMAL128: u8 = 0x13;

pub(crate) const BINARY_SUBTYPE_OLD: u8 = 0x02;

/// Smallest valid document: length prefix plus trailing NUL
pub(crate) const MIN_DOCUMENT_LEN: usize = 5;

/// Largest document a stream reader will buffer (16 MiB)
pub const MAX_DOCUMENT_LEN: usize = 16 * 1024 * 1024;

/// Deepest nesting of documents and arrays, counting the top level as 1
pub const MAX_NESTING_DEPTH: usize = 100;

/// Decode one complete wire document.
///
/// The buffer must hold exactly one document: a length prefix that does
/// not match the buffer length is an error.
pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    let declared = read_length(bytes, 0)?;
    if declared != bytes.len() {
        return Err(Error::codec(
            0,
            format!(
                "document length {declared} does not match buffer length {}",
                bytes.len()
            ),
        ));
    }
    decode_elements(bytes, 0, 1)
}

/// Read the length prefix of the document starting at `bytes[0]`.
///
/// Only the four prefix bytes are needed, so a stream reader can size its
/// buffer before reading the rest of the document.
pub fn document_length(bytes: &[u8]) -> Result<usize> {
    read_length(bytes, 0)
}

/// Count the top-level fields of a wire document without decoding values
pub fn count_fields(bytes: &[u8]) -> Result<usize> {
    count_elements(bytes, 0)
}

fn count_elements(buf: &[u8], start: usize) -> Result<usize> {
    RawElements::new(buf, start)?.try_fold(0, |count, element| element.map(|_| count + 1))
}

fn decode_elements(buf: &[u8], start: usize, depth: usize) -> Result<Document> {
    let count = count_elements(buf, start)?;
    let mut document = Document::with_capacity(count);
    for element in RawElements::new(buf, start)? {
        let element = element?;
        let value = decode_value(buf, &element, depth)?;
        document.push(element.key, value);
    }
    Ok(document)
}

fn decode_array(buf: &[u8], start: usize, depth: usize) -> Result<Vec<Value>> {
    let count = count_elements(buf, start)?;
    let mut items = Vec::with_capacity(count);
    for element in RawElements::new(buf, start)? {
        items.push(decode_value(buf, &element?, depth)?);
    }
    Ok(items)
}

/// Depth of a container nested one level below `depth`
fn nested(depth: usize, offset: usize) -> Result<usize> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(Error::codec(
            offset,
            format!("document nested deeper than {MAX_NESTING_DEPTH} levels"),
        ));
    }
    Ok(depth + 1)
}

/// One element header and its payload slice
struct RawElement<'a> {
    tag: u8,
    key: &'a str,
    payload: &'a [u8],
    /// Absolute offset of `payload` within the top-level buffer
    offset: usize,
}

/// Walks the elements of one (possibly nested) document
struct RawElements<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Offset of the document's trailing NUL
    end: usize,
    done: bool,
}

impl<'a> RawElements<'a> {
    fn new(buf: &'a [u8], start: usize) -> Result<Self> {
        let len = read_length(buf, start)?;
        let end = start + len;
        if end > buf.len() {
            return Err(Error::codec(
                start,
                format!(
                    "document length {len} exceeds the {} bytes available",
                    buf.len() - start
                ),
            ));
        }
        if buf[end - 1] != 0 {
            return Err(Error::codec(end - 1, "document is not NUL-terminated"));
        }
        Ok(Self {
            buf,
            pos: start + 4,
            end: end - 1,
            done: false,
        })
    }

    fn next_element(&mut self) -> Result<RawElement<'a>> {
        let tag_offset = self.pos;
        let tag = self.buf[tag_offset];
        let key_start = tag_offset + 1;

        let key_len = self.buf[key_start..self.end]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::codec(key_start, "unterminated field name"))?;
        let key = std::str::from_utf8(&self.buf[key_start..key_start + key_len])
            .map_err(|e| Error::codec(key_start + e.valid_up_to(), "invalid UTF-8 in field name"))?;

        let offset = key_start + key_len + 1;
        let size = match tag {
            TYPE_NULL => 0,
            TYPE_BOOL => 1,
            TYPE_INT32 => 4,
            TYPE_DOUBLE | TYPE_DATE_TIME | TYPE_TIMESTAMP | TYPE_INT64 => 8,
            TYPE_OBJECT_ID => 12,
            TYPE_DECIMAL128 => 16,
            TYPE_STRING | TYPE_CODE | TYPE_SYMBOL => {
                let len = read_i32(self.buf, offset)?;
                if len < 1 {
                    return Err(Error::codec(offset, format!("invalid string length {len}")));
                }
                4 + len as usize
            }
            TYPE_DOCUMENT | TYPE_ARRAY => read_length(self.buf, offset)?,
            TYPE_BINARY => {
                let len = read_i32(self.buf, offset)?;
                if len < 0 {
                    return Err(Error::codec(offset, format!("invalid binary length {len}")));
                }
                4 + 1 + len as usize
            }
            wire_type => {
                return Err(Error::UnsupportedType {
                    key: key.to_string(),
                    wire_type,
                })
            }
        };

        if offset + size > self.end {
            return Err(Error::codec(
                offset,
                format!("value of field '{key}' overruns its document"),
            ));
        }
        self.pos = offset + size;

        Ok(RawElement {
            tag,
            key,
            payload: &self.buf[offset..offset + size],
            offset,
        })
    }
}

impl<'a> Iterator for RawElements<'a> {
    type Item = Result<RawElement<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.end {
            return None;
        }
        let element = self.next_element();
        if element.is_err() {
            self.done = true;
        }
        Some(element)
    }
}

fn decode_value(buf: &[u8], element: &RawElement<'_>, depth: usize) -> Result<Value> {
    let payload = element.payload;
    let value = match element.tag {
        TYPE_NULL => Value::Null,
        TYPE_BOOL => match payload[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => {
                return Err(Error::codec(
                    element.offset,
                    format!("invalid boolean byte 0x{other:02x}"),
                ))
            }
        },
        TYPE_INT32 => Value::Int32(i32::from_le_bytes(array(payload, element.offset)?)),
        TYPE_INT64 => Value::Int64(i64::from_le_bytes(array(payload, element.offset)?)),
        TYPE_DOUBLE => Value::Double(f64::from_le_bytes(array(payload, element.offset)?)),
        TYPE_DATE_TIME => Value::DateTime(i64::from_le_bytes(array(payload, element.offset)?)),
        TYPE_TIMESTAMP => {
            let raw = u64::from_le_bytes(array(payload, element.offset)?);
            Value::Timestamp {
                t: (raw >> 32) as u32,
                i: raw as u32,
            }
        }
        TYPE_OBJECT_ID => Value::ObjectId(ObjectId::from_bytes(array(payload, element.offset)?)),
        TYPE_DECIMAL128 => {
            Value::Decimal128(Decimal128::from_bytes(array(payload, element.offset)?))
        }
        TYPE_STRING => Value::String(read_string(payload, element.offset)?),
        TYPE_CODE => Value::Code(read_string(payload, element.offset)?),
        TYPE_SYMBOL => Value::Symbol(read_string(payload, element.offset)?),
        TYPE_DOCUMENT => {
            let depth = nested(depth, element.offset)?;
            Value::Document(decode_elements(buf, element.offset, depth)?)
        }
        TYPE_ARRAY => {
            let depth = nested(depth, element.offset)?;
            Value::Array(decode_array(buf, element.offset, depth)?)
        }
        TYPE_BINARY => read_binary(payload, element.offset)?,
        wire_type => {
            return Err(Error::UnsupportedType {
                key: element.key.to_string(),
                wire_type,
            })
        }
    };
    Ok(value)
}

fn read_string(payload: &[u8], offset: usize) -> Result<String> {
    let body = &payload[4..];
    let (last, text) = body
        .split_last()
        .ok_or_else(|| Error::codec(offset, "empty string payload"))?;
    if *last != 0 {
        return Err(Error::codec(
            offset + payload.len() - 1,
            "string is not NUL-terminated",
        ));
    }
    std::str::from_utf8(text)
        .map(str::to_string)
        .map_err(|e| Error::codec(offset + 4 + e.valid_up_to(), "invalid UTF-8 in string"))
}

fn read_binary(payload: &[u8], offset: usize) -> Result<Value> {
    let subtype = payload[4];
    let data = &payload[5..];
    if subtype != BINARY_SUBTYPE_OLD {
        return Ok(Value::Binary {
            subtype,
            bytes: data.to_vec(),
        });
    }

    // The old binary subtype repeats the length inside the payload.
    let inner = read_i32(data, 0).map_err(|e| e.rebased(offset + 5))?;
    if inner < 0 || inner as usize + 4 != data.len() {
        return Err(Error::codec(
            offset + 5,
            format!("invalid inner length {inner} for old binary subtype"),
        ));
    }
    Ok(Value::Binary {
        subtype,
        bytes: data[4..].to_vec(),
    })
}

/// Read a document length prefix and check its lower bound
fn read_length(buf: &[u8], at: usize) -> Result<usize> {
    let len = read_i32(buf, at)?;
    if len < MIN_DOCUMENT_LEN as i32 {
        return Err(Error::codec(at, format!("invalid document length {len}")));
    }
    Ok(len as usize)
}

fn read_i32(buf: &[u8], at: usize) -> Result<i32> {
    array(&buf[at.min(buf.len())..], at).map(i32::from_le_bytes)
}

/// The first `N` bytes of `bytes`; `at` is only used for error reporting
fn array<const N: usize>(bytes: &[u8], at: usize) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::codec(at, format!("truncated input: expected {N} bytes")))
}
