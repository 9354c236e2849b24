//! Error types for decoding and flattening

use std::io;

use thiserror::Error;

use crate::model::{ColumnType, ValueKind};

/// A failure reported by a document source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while decoding documents or building a table
#[derive(Debug, Error)]
pub enum Error {
    /// Structurally invalid input: wire bytes or an Extended JSON wrapper
    #[error("malformed document{}: {message}", at_offset(.offset))]
    Codec {
        offset: Option<usize>,
        message: String,
    },

    /// A value kind the decoder cannot represent
    #[error("unsupported BSON type 0x{wire_type:02x} in field '{key}'")]
    UnsupportedType { key: String, wire_type: u8 },

    /// Schema drift that cannot be coerced into the existing column
    #[error(
        "heterogeneous column '{column}': found {actual_kind} at row {row}, \
         which cannot be stored in a column of type {expected_type}"
    )]
    HeterogeneousColumn {
        column: String,
        row: usize,
        expected_type: ColumnType,
        actual_kind: ValueKind,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    /// `next_document` was called on a source with nothing left
    #[error("document source is exhausted")]
    Exhausted,

    #[error("page size must be at least 1")]
    InvalidPageSize,
}

pub type Result<T> = std::result::Result<T, Error>;

fn at_offset(offset: &Option<usize>) -> String {
    offset.map(|o| format!(" at byte {o}")).unwrap_or_default()
}

impl Error {
    pub(crate) fn codec(offset: impl Into<Option<usize>>, message: impl Into<String>) -> Self {
        Error::Codec {
            offset: offset.into(),
            message: message.into(),
        }
    }

    /// Rebase a codec offset that was computed relative to one document
    /// onto the stream that document was read from.
    pub(crate) fn rebased(self, base: usize) -> Self {
        match self {
            Error::Codec { offset, message } => Error::Codec {
                offset: offset.map(|o| o + base),
                message,
            },
            other => other,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Source(SourceError::Io(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Source(SourceError::Json(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_message_includes_offset() {
        let err = Error::codec(17, "document is not NUL-terminated");
        assert_eq!(
            err.to_string(),
            "malformed document at byte 17: document is not NUL-terminated"
        );

        let err = Error::codec(None, "bad $oid");
        assert_eq!(err.to_string(), "malformed document: bad $oid");
    }

    #[test]
    fn test_rebased_shifts_only_codec_offsets() {
        match Error::codec(4, "x").rebased(100) {
            Error::Codec { offset, .. } => assert_eq!(offset, Some(104)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(Error::Exhausted.rebased(100), Error::Exhausted));
    }

    #[test]
    fn test_source_error_is_transparent() {
        let io = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
        let err = Error::from(io);
        assert_eq!(err.to_string(), "I/O error: peer went away");
        assert!(matches!(err, Error::Source(SourceError::Io(_))));
    }

    #[test]
    fn test_heterogeneous_column_message() {
        let err = Error::HeterogeneousColumn {
            column: "a".to_string(),
            row: 1,
            expected_type: ColumnType::Int32,
            actual_kind: ValueKind::Document,
        };
        assert_eq!(
            err.to_string(),
            "heterogeneous column 'a': found document at row 1, which cannot be stored in a column of type int32"
        );
    }
}
