//! Wire-format and Extended JSON codecs for documents

pub mod decode;
pub mod encode;
pub mod json;

pub use decode::{
    count_fields, decode_document, document_length, MAX_DOCUMENT_LEN, MAX_NESTING_DEPTH,
};
pub use encode::encode_document;
pub use json::{from_json, parse_document, to_relaxed_json};
