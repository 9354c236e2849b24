//! Streaming reader of concatenated wire documents

use std::io::{self, BufRead, Read};

use tracing::{debug, trace};

use crate::codec::{decode_document, document_length, MAX_DOCUMENT_LEN};
use crate::error::{Error, Result};
use crate::model::Document;

use super::DocumentSource;

/// Reads documents laid end to end, as in a dump file.
///
/// Error offsets are relative to the start of the stream.
pub struct BsonReader<R: BufRead> {
    reader: R,
    offset: usize,
    documents_read: usize,
    failed: bool,
}

impl<R: BufRead> BsonReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            documents_read: 0,
            failed: false,
        }
    }

    /// Number of documents successfully decoded so far
    pub fn documents_read(&self) -> usize {
        self.documents_read
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_document(&mut self) -> Result<Document> {
        if self.reader.fill_buf()?.is_empty() {
            return Err(Error::Exhausted);
        }

        let mut prefix = [0u8; 4];
        self.fill_exact(&mut prefix, "length prefix")?;
        let len = document_length(&prefix).map_err(|e| e.rebased(self.offset))?;
        if len > MAX_DOCUMENT_LEN {
            return Err(Error::codec(
                self.offset,
                format!("document length {len} exceeds the {MAX_DOCUMENT_LEN} byte limit"),
            ));
        }

        let mut buf = vec![0u8; len];
        buf[..4].copy_from_slice(&prefix);
        self.fill_exact(&mut buf[4..], "document")?;

        let document = decode_document(&buf).map_err(|e| e.rebased(self.offset))?;
        trace!(offset = self.offset, len, fields = document.len(), "read document");
        self.offset += len;
        self.documents_read += 1;
        Ok(document)
    }

    /// `read_exact` that reports a short read as a truncated document
    fn fill_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::codec(
                self.offset,
                format!("stream ends inside a {what}: expected {} bytes", buf.len()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: BufRead> DocumentSource for BsonReader<R> {
    fn has_more(&mut self) -> bool {
        if self.failed {
            return false;
        }
        match self.reader.fill_buf() {
            Ok(buf) if buf.is_empty() => {
                debug!(documents = self.documents_read, bytes = self.offset, "end of stream");
                false
            }
            Ok(_) => true,
            // Let next_document surface the error
            Err(_) => true,
        }
    }

    fn next_document(&mut self) -> Result<Document> {
        if self.failed {
            return Err(Error::Exhausted);
        }
        let result = self.read_document();
        if matches!(result, Err(ref e) if !matches!(e, Error::Exhausted)) {
            self.failed = true;
        }
        result
    }
}
