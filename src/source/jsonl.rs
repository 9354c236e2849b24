//! JSON Lines reader of Extended JSON documents

use std::io::{BufRead, Lines};

use tracing::debug;

use crate::codec::json::{document_from_map, json_kind};
use crate::error::{Error, Result};
use crate::model::Document;

use super::DocumentSource;

/// One Extended JSON object per line; blank lines are skipped
pub struct JsonLinesSource<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
    peeked: Option<Result<Document>>,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            peeked: None,
        }
    }

    /// Number of lines consumed so far, blank ones included
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn read_next(&mut self) -> Option<Result<Document>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }

    fn parse_line(&self, line: &str) -> Result<Document> {
        let json: serde_json::Value = serde_json::from_str(line).map_err(|e| {
            debug!(line = self.line_number, error = %e, "invalid JSON line");
            Error::from(e)
        })?;
        match json {
            serde_json::Value::Object(map) => document_from_map(&map).map_err(|e| match e {
                Error::Codec { message, .. } => {
                    Error::codec(None, format!("line {}: {message}", self.line_number))
                }
                other => other,
            }),
            other => Err(Error::codec(
                None,
                format!(
                    "line {}: expected a JSON object, found {}",
                    self.line_number,
                    json_kind(&other)
                ),
            )),
        }
    }
}

impl<R: BufRead> DocumentSource for JsonLinesSource<R> {
    fn has_more(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.read_next();
        }
        self.peeked.is_some()
    }

    fn next_document(&mut self) -> Result<Document> {
        match self.peeked.take() {
            Some(result) => result,
            None => self.read_next().unwrap_or(Err(Error::Exhausted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use std::io::Cursor;

    fn source(text: &str) -> JsonLinesSource<Cursor<Vec<u8>>> {
        JsonLinesSource::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_reads_lines_and_skips_blanks() {
        let mut source = source("{\"a\": 1}\n\n   \n{\"a\": {\"$numberLong\": \"5\"}}\n");
        assert!(source.has_more());
        assert_eq!(source.next_document().unwrap().get("a"), Some(&Value::Int32(1)));
        assert_eq!(source.next_document().unwrap().get("a"), Some(&Value::Int64(5)));
        assert!(!source.has_more());
        assert_eq!(source.line_number(), 4);
        assert!(matches!(source.next_document(), Err(Error::Exhausted)));
    }

    #[test]
    fn test_trailing_blank_lines_are_not_documents() {
        let mut source = source("{}\n\n\n");
        source.next_document().unwrap();
        assert!(!source.has_more());
    }

    #[test]
    fn test_non_object_line() {
        let mut source = source("{}\n[1]\n");
        source.next_document().unwrap();
        assert!(source.has_more());
        let err = source.next_document().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_invalid_json_is_a_source_error() {
        let mut source = source("{\"a\":\n");
        assert!(source.has_more());
        assert!(matches!(
            source.next_document(),
            Err(Error::Source(crate::error::SourceError::Json(_)))
        ));
    }

    #[test]
    fn test_bad_wrapper_reports_its_line() {
        let mut source = source("{\"a\": 1}\n\n{\"_id\": {\"$oid\": \"zz\"}}\n");
        assert!(source.next_document().is_ok());
        let err = source.next_document().unwrap_err();
        assert!(matches!(err, Error::Codec { offset: None, .. }), "{err}");
        let message = err.to_string();
        assert!(message.contains("line 3: invalid ObjectId 'zz'"), "{message}");
    }
}
