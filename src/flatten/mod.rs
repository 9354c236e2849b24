//! Columnar flattening of document streams
//!
//! Documents are read one at a time and written into typed columns. The
//! first document fixes the column order. Later documents are matched
//! against the columns positionally with a forward search on the field
//! name: columns that a document skips get a missing cell, unknown fields
//! become new columns at the cursor position, and values that do not fit
//! their column's type widen it or fail with
//! [`Error::HeterogeneousColumn`].

mod coerce;

use tracing::{debug, warn};

use crate::config::FlattenOptions;
use crate::error::{Error, Result};
use crate::model::{Column, Document, Table, Value, Warning};
use crate::source::DocumentSource;

use coerce::{classify, infer_type, insert, ValueClass};

/// Upper bound on rows preallocated per column; larger pages grow on demand
const MAX_PREALLOCATED_ROWS: usize = 1 << 16;

/// Flatten up to `max_rows` documents from `source` into a table
pub fn flatten<S>(source: &mut S, max_rows: usize) -> Result<Table>
where
    S: DocumentSource + ?Sized,
{
    flatten_with(source, max_rows, &FlattenOptions::default())
}

/// Flatten up to `max_rows` documents with explicit options.
///
/// Returns an empty table when the source has nothing to give. Any error,
/// from the source or from an incompatible value, aborts the page.
pub fn flatten_with<S>(source: &mut S, max_rows: usize, options: &FlattenOptions) -> Result<Table>
where
    S: DocumentSource + ?Sized,
{
    if max_rows == 0 {
        return Err(Error::InvalidPageSize);
    }
    if !source.has_more() {
        return Ok(Table::default());
    }

    let mut builder = TableBuilder::new(max_rows, options);
    builder.seed(source.next_document()?)?;
    while builder.rows < max_rows && source.has_more() {
        builder.append(source.next_document()?)?;
    }

    let table = builder.finish();
    debug!(
        rows = table.row_count(),
        columns = table.column_count(),
        warnings = table.warnings().len(),
        "flattened page"
    );
    Ok(table)
}

struct TableBuilder<'o> {
    columns: Vec<Column>,
    rows: usize,
    max_rows: usize,
    options: &'o FlattenOptions,
    warnings: Vec<Warning>,
}

impl<'o> TableBuilder<'o> {
    fn new(max_rows: usize, options: &'o FlattenOptions) -> Self {
        Self {
            columns: Vec::new(),
            rows: 0,
            max_rows,
            options,
            warnings: Vec::new(),
        }
    }

    /// Row 0 creates one column per field, in field order
    fn seed(&mut self, document: Document) -> Result<()> {
        self.columns.reserve(document.len());
        for (key, value) in document {
            let index = self.columns.len();
            self.insert_column(index, key, value)?;
        }
        self.rows = 1;
        Ok(())
    }

    fn append(&mut self, document: Document) -> Result<()> {
        let mut i = 0;
        for (key, value) in document {
            if i < self.columns.len() && self.columns[i].name() != key {
                let found = self.columns[i + 1..]
                    .iter()
                    .position(|c| c.name() == key)
                    .map(|offset| i + 1 + offset);
                match found {
                    Some(j) => {
                        for column in &mut self.columns[i..j] {
                            column.data_mut().push_missing();
                        }
                        i = j;
                    }
                    None => {
                        self.insert_column(i, key, value)?;
                        i += 1;
                        continue;
                    }
                }
            }
            if i >= self.columns.len() {
                self.insert_column(i, key, value)?;
            } else {
                self.store(i, value)?;
            }
            i += 1;
        }
        for column in &mut self.columns[i..] {
            column.data_mut().push_missing();
        }
        self.rows += 1;
        Ok(())
    }

    /// New column at `index`, missing for every earlier row
    fn insert_column(&mut self, index: usize, key: String, value: Value) -> Result<()> {
        let row = self.rows;
        let actual_kind = value.kind();
        let class = classify(value, self.options);
        let column_type = infer_type(&class);
        if class == ValueClass::Null {
            let warning = Warning::NullDefaultedToBool {
                column: key.clone(),
                row,
            };
            warn!("{warning}");
            self.warnings.push(warning);
        }

        let capacity = self.max_rows.min(MAX_PREALLOCATED_ROWS);
        let mut column = Column::with_capacity(key, column_type, capacity);
        column.data_mut().fill_missing(row);
        if row > 0 {
            debug!(column = column.name(), %column_type, row, index, "new column");
        }
        insert(&mut column, class).map_err(|_| Error::HeterogeneousColumn {
            column: column.name().to_string(),
            row,
            expected_type: column_type,
            actual_kind,
        })?;
        self.columns.insert(index, column);
        Ok(())
    }

    fn store(&mut self, index: usize, value: Value) -> Result<()> {
        let row = self.rows;
        let actual_kind = value.kind();
        let class = classify(value, self.options);
        let column = &mut self.columns[index];
        let expected_type = column.element_type();
        insert(column, class).map_err(|_| Error::HeterogeneousColumn {
            column: column.name().to_string(),
            row,
            expected_type,
            actual_kind,
        })
    }

    fn finish(mut self) -> Table {
        for column in &mut self.columns {
            if column.data().capacity() != self.rows {
                column.data_mut().shrink_to(self.rows);
            }
        }
        Table::new(self.columns, self.rows, self.warnings)
    }
}

/// Consecutive pages flattened from one source.
///
/// Ends when the source runs dry. An error is yielded once and ends the
/// iteration.
pub struct Pages<'a, S: DocumentSource + ?Sized> {
    source: &'a mut S,
    page_size: usize,
    options: FlattenOptions,
    pages: usize,
    done: bool,
}

impl<'a, S: DocumentSource + ?Sized> Pages<'a, S> {
    pub fn new(source: &'a mut S, page_size: usize) -> Self {
        Self {
            source,
            page_size,
            options: FlattenOptions::default(),
            pages: 0,
            done: false,
        }
    }

    pub fn with_options(mut self, options: FlattenOptions) -> Self {
        self.options = options;
        self
    }

    /// Pages yielded so far
    pub fn pages_read(&self) -> usize {
        self.pages
    }
}

impl<S: DocumentSource + ?Sized> Iterator for Pages<'_, S> {
    type Item = Result<Table>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match flatten_with(self.source, self.page_size, &self.options) {
            Ok(table) if table.is_empty() => {
                self.done = true;
                None
            }
            Ok(table) => {
                self.pages += 1;
                debug!(page = self.pages, rows = table.row_count(), "page ready");
                Some(Ok(table))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::model::{Cell, ColumnType, ValueKind};
    use crate::source::{IterSource, VecSource};

    fn run(documents: Vec<Document>, max_rows: usize) -> Result<Table> {
        flatten(&mut VecSource::new(documents), max_rows)
    }

    fn names(table: &Table) -> Vec<&str> {
        table.column_names().collect()
    }

    #[test]
    fn test_empty_source() {
        let table = run(vec![], 10).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        assert!(matches!(run(vec![doc! { "a" => 1 }], 0), Err(Error::InvalidPageSize)));
    }

    #[test]
    fn test_schema_is_stable_for_uniform_documents() {
        let docs = (0..5).map(|i| doc! { "a" => i, "b" => "x" }).collect();
        let table = run(docs, 10).unwrap();
        assert_eq!(names(&table), ["a", "b"]);
        assert_eq!(table.row_count(), 5);
        assert_eq!(table.column("a").unwrap().element_type(), ColumnType::Int32);
        assert_eq!(table.column("b").unwrap().element_type(), ColumnType::String);
        for column in table.columns() {
            assert_eq!(column.len(), 5);
            assert_eq!(column.missing_count(), 0, "column {}", column.name());
            assert!(column.cells().all(|cell| !cell.is_missing()));
        }
    }

    #[test]
    fn test_skipped_fields_are_missing() {
        let table = run(vec![doc! { "a" => 1, "b" => 2 }, doc! { "b" => 3 }], 10).unwrap();
        assert_eq!(names(&table), ["a", "b"]);
        assert_eq!(table.column("a").unwrap().as_int32(), Some(&[Some(1), None][..]));
        assert_eq!(table.column("b").unwrap().as_int32(), Some(&[Some(2), Some(3)][..]));
    }

    #[test]
    fn test_trailing_fields_are_missing() {
        let table = run(vec![doc! { "a" => 1, "b" => 2, "c" => 3 }, doc! { "a" => 4 }], 10).unwrap();
        let c = table.column("c").unwrap();
        assert_eq!(c.as_int32(), Some(&[Some(3), None][..]));
        assert_eq!(c.missing_count(), 1);
    }

    #[test]
    fn test_new_field_mid_stream() {
        let table = run(vec![doc! { "a" => 1 }, doc! { "a" => 2, "b" => "x" }], 10).unwrap();
        assert_eq!(names(&table), ["a", "b"]);
        let b = table.column("b").unwrap();
        assert_eq!(b.element_type(), ColumnType::String);
        assert_eq!(b.as_string(), Some(&[None, Some("x".to_string())][..]));
    }

    #[test]
    fn test_new_field_is_inserted_at_cursor() {
        let table = run(
            vec![doc! { "a" => 1, "c" => 3 }, doc! { "a" => 1, "b" => 2, "c" => 3 }],
            10,
        )
        .unwrap();
        assert_eq!(names(&table), ["a", "b", "c"]);
        assert_eq!(table.column("c").unwrap().as_int32(), Some(&[Some(3), Some(3)][..]));
    }

    #[test]
    fn test_reordered_fields_create_a_second_column() {
        let table = run(vec![doc! { "a" => 1, "b" => 2 }, doc! { "b" => 3, "a" => 4 }], 10).unwrap();
        // forward search only: "a" is behind the cursor once "b" matched
        assert_eq!(names(&table), ["a", "b", "a"]);
        assert_eq!(table.columns()[0].as_int32(), Some(&[Some(1), None][..]));
        assert_eq!(table.columns()[1].as_int32(), Some(&[Some(2), Some(3)][..]));
        assert_eq!(table.columns()[2].as_int32(), Some(&[None, Some(4)][..]));
    }

    #[test]
    fn test_int_widens_to_double() {
        let table = run(vec![doc! { "a" => 1 }, doc! { "a" => 2.5 }], 10).unwrap();
        let a = table.column("a").unwrap();
        assert_eq!(a.element_type(), ColumnType::Double);
        assert_eq!(a.as_double(), Some(&[Some(1.0), Some(2.5)][..]));
    }

    #[test]
    fn test_short_page_is_right_sized() {
        let docs = (0..3).map(|i| doc! { "a" => i, "b" => vec![i] }).collect();
        let table = run(docs, 10).unwrap();
        assert_eq!(table.row_count(), 3);
        for column in table.columns() {
            assert_eq!(column.len(), 3);
            assert_eq!(column.data().capacity(), 3);
        }
    }

    #[test]
    fn test_full_page_leaves_rest_in_source() {
        let mut source = VecSource::new((0..5).map(|i| doc! { "a" => i }));
        let table = flatten(&mut source, 2).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(source.remaining(), 3);
    }

    #[test]
    fn test_incompatible_drift_is_an_error() {
        let err = run(vec![doc! { "a" => 1 }, doc! { "a" => doc! { "x" => 1 } }], 10).unwrap_err();
        match err {
            Error::HeterogeneousColumn {
                column,
                row,
                expected_type,
                actual_kind,
            } => {
                assert_eq!(column, "a");
                assert_eq!(row, 1);
                assert_eq!(expected_type, ColumnType::Int32);
                assert_eq!(actual_kind, ValueKind::Document);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_list_and_datetime_do_not_mix() {
        let err = run(
            vec![doc! { "t" => Value::DateTime(0) }, doc! { "t" => vec![1] }],
            10,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::HeterogeneousColumn { expected_type: ColumnType::DateTime, actual_kind: ValueKind::Array, .. }
        ));
    }

    #[test]
    fn test_containers_survive_flattening() {
        let nested = doc! { "x" => 1, "y" => vec!["a", "b"] };
        let bin = Value::Binary { subtype: 0x80, bytes: vec![1, 2] };
        let table = run(
            vec![doc! { "n" => nested.clone() }, doc! { "n" => bin.clone() }],
            10,
        )
        .unwrap();
        let n = table.column("n").unwrap();
        assert_eq!(n.element_type(), ColumnType::List);
        assert_eq!(n.cell(0), Some(Cell::List(&Value::Document(nested))));
        assert_eq!(n.cell(1), Some(Cell::List(&bin)));
    }

    #[test]
    fn test_null_first_defaults_to_bool_with_warning() {
        let table = run(vec![doc! { "a" => Value::Null }, doc! { "a" => true }], 10).unwrap();
        let a = table.column("a").unwrap();
        assert_eq!(a.element_type(), ColumnType::Bool);
        assert_eq!(a.as_bool(), Some(&[None, Some(true)][..]));
        assert_eq!(
            table.warnings(),
            [Warning::NullDefaultedToBool { column: "a".to_string(), row: 0 }]
        );
    }

    #[test]
    fn test_null_in_new_column_mid_stream_warns() {
        let table = run(vec![doc! { "a" => 1 }, doc! { "a" => 2, "b" => Value::Null }], 10).unwrap();
        assert_eq!(table.column("b").unwrap().missing_count(), 2);
        assert_eq!(
            table.warnings(),
            [Warning::NullDefaultedToBool { column: "b".to_string(), row: 1 }]
        );
    }

    #[test]
    fn test_int64_precision_loss() {
        let big = 9_007_199_254_740_993_i64; // 2^53 + 1
        let table = run(vec![doc! { "n" => big }], 10).unwrap();
        let n = table.column("n").unwrap();
        assert_eq!(n.as_double(), Some(&[Some(9_007_199_254_740_992.0)][..]));

        let options = FlattenOptions::new().with_bigint_as_string(true);
        let mut source = VecSource::new([doc! { "n" => big }]);
        let table = flatten_with(&mut source, 10, &options).unwrap();
        let n = table.column("n").unwrap();
        assert_eq!(n.as_string(), Some(&[Some(big.to_string())][..]));
    }

    #[test]
    fn test_date_as_string() {
        let options = FlattenOptions::new().with_date_as_string(true);
        let mut source = VecSource::new([doc! { "d" => Value::DateTime(86_400_000) }]);
        let table = flatten_with(&mut source, 10, &options).unwrap();
        assert_eq!(
            table.column("d").unwrap().as_string(),
            Some(&[Some("1970-01-02T00:00:00.000Z".to_string())][..])
        );
    }

    #[test]
    fn test_source_errors_propagate() {
        let items = vec![Ok(doc! { "a" => 1 }), Err(Error::codec(40, "truncated"))];
        let err = flatten(&mut IterSource::new(items), 10).unwrap_err();
        assert!(matches!(err, Error::Codec { offset: Some(40), .. }));
    }

    #[test]
    fn test_error_in_first_document_propagates() {
        let items: Vec<Result<Document>> = vec![Err(Error::codec(None, "bad"))];
        assert!(flatten(&mut IterSource::new(items), 10).is_err());
    }

    #[test]
    fn test_empty_first_document() {
        let table = run(vec![doc! {}, doc! { "a" => 1 }], 10).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("a").unwrap().as_int32(), Some(&[None, Some(1)][..]));
    }

    #[test]
    fn test_pages() {
        let mut source = VecSource::new((0..5).map(|i| doc! { "a" => i }));
        let mut pages = Pages::new(&mut source, 2);
        let sizes: Vec<usize> = pages.by_ref().map(|t| t.unwrap().row_count()).collect();
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(pages.pages_read(), 3);
    }

    #[test]
    fn test_pages_have_independent_schemas() {
        let mut source = VecSource::new([doc! { "a" => 1 }, doc! { "b" => "x" }]);
        let tables: Vec<Table> = Pages::new(&mut source, 1).collect::<Result<_>>().unwrap();
        assert_eq!(names(&tables[0]), ["a"]);
        assert_eq!(names(&tables[1]), ["b"]);
    }

    #[test]
    fn test_pages_stop_after_error() {
        let items = vec![
            Ok(doc! { "a" => 1 }),
            Err(Error::codec(None, "bad")),
            Ok(doc! { "a" => 2 }),
        ];
        let mut source = IterSource::new(items);
        let results: Vec<_> = Pages::new(&mut source, 1).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
