//! Document sources feeding the flattening engine

mod jsonl;
mod reader;

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::iter::Peekable;
use std::path::Path;

use crate::config::InputFormat;
use crate::error::{Error, Result};
use crate::model::Document;

pub use jsonl::JsonLinesSource;
pub use reader::BsonReader;

/// A lazy, finite sequence of decoded documents.
///
/// `has_more` must return `true` when the next read would fail, so that
/// the failure surfaces from `next_document` instead of looking like the
/// end of the stream.
pub trait DocumentSource {
    fn has_more(&mut self) -> bool;

    /// Take the next document; `Error::Exhausted` once `has_more` is false
    fn next_document(&mut self) -> Result<Document>;
}

impl<S: DocumentSource + ?Sized> DocumentSource for &mut S {
    fn has_more(&mut self) -> bool {
        (**self).has_more()
    }

    fn next_document(&mut self) -> Result<Document> {
        (**self).next_document()
    }
}

impl<S: DocumentSource + ?Sized> DocumentSource for Box<S> {
    fn has_more(&mut self) -> bool {
        (**self).has_more()
    }

    fn next_document(&mut self) -> Result<Document> {
        (**self).next_document()
    }
}

/// In-memory queue of documents
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    documents: VecDeque<Document>,
}

impl VecSource {
    pub fn new(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.documents.len()
    }
}

impl DocumentSource for VecSource {
    fn has_more(&mut self) -> bool {
        !self.documents.is_empty()
    }

    fn next_document(&mut self) -> Result<Document> {
        self.documents.pop_front().ok_or(Error::Exhausted)
    }
}

/// Adapts an iterator of fallible documents
pub struct IterSource<I: Iterator<Item = Result<Document>>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = Result<Document>>> IterSource<I> {
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: iter.into_iter().peekable(),
        }
    }
}

impl<I: Iterator<Item = Result<Document>>> DocumentSource for IterSource<I> {
    fn has_more(&mut self) -> bool {
        self.inner.peek().is_some()
    }

    fn next_document(&mut self) -> Result<Document> {
        self.inner.next().unwrap_or(Err(Error::Exhausted))
    }
}

/// Open a file as a document source, picking the decoder from `format`
pub fn open_source(path: &Path, format: InputFormat) -> Result<Box<dyn DocumentSource + Send>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let source: Box<dyn DocumentSource + Send> = match format.resolve(path) {
        InputFormat::JsonLines => Box::new(JsonLinesSource::new(reader)),
        InputFormat::Bson | InputFormat::Auto => Box::new(BsonReader::new(reader)),
    };
    Ok(source)
}
