//! Type inference and coercion of values into typed columns

use tracing::trace;

use crate::config::FlattenOptions;
use crate::model::{format_datetime, format_double, Column, ColumnData, ColumnType, Value};

/// A value reduced to the shape a column can hold
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValueClass {
    Null,
    Bool(bool),
    Int32(i32),
    /// Doubles, and 64-bit integers and decimals narrowed to `f64`
    Double(f64),
    /// Strings, code, symbols and hex ObjectIds
    String(String),
    DateTime(i64),
    /// Arrays, documents, binaries and timestamps, kept whole
    List(Value),
}

pub(crate) fn classify(value: Value, options: &FlattenOptions) -> ValueClass {
    match value {
        Value::Null => ValueClass::Null,
        Value::Bool(b) => ValueClass::Bool(b),
        Value::Int32(i) => ValueClass::Int32(i),
        Value::Int64(i) if options.bigint_as_string => ValueClass::String(i.to_string()),
        Value::Int64(i) => ValueClass::Double(i as f64),
        Value::Double(f) => ValueClass::Double(f),
        Value::Decimal128(d) => ValueClass::Double(d.to_f64()),
        Value::String(s) | Value::Code(s) | Value::Symbol(s) => ValueClass::String(s),
        Value::ObjectId(oid) => ValueClass::String(oid.to_hex()),
        Value::DateTime(ms) if options.date_as_string => ValueClass::String(format_datetime(ms)),
        Value::DateTime(ms) => ValueClass::DateTime(ms),
        value @ (Value::Binary { .. }
        | Value::Timestamp { .. }
        | Value::Array(_)
        | Value::Document(_)) => ValueClass::List(value),
    }
}

/// Column type for a column whose first value has this class.
/// Null defaults to `Bool`.
pub(crate) fn infer_type(class: &ValueClass) -> ColumnType {
    match class {
        ValueClass::Null | ValueClass::Bool(_) => ColumnType::Bool,
        ValueClass::Int32(_) => ColumnType::Int32,
        ValueClass::Double(_) => ColumnType::Double,
        ValueClass::String(_) => ColumnType::String,
        ValueClass::DateTime(_) => ColumnType::DateTime,
        ValueClass::List(_) => ColumnType::List,
    }
}

/// Type the column must be widened to before `class` can be stored
fn widening(column: ColumnType, class: &ValueClass) -> Option<ColumnType> {
    match (column, class) {
        (ColumnType::Bool, ValueClass::Int32(_)) => Some(ColumnType::Int32),
        (ColumnType::Bool | ColumnType::Int32, ValueClass::Double(_)) => Some(ColumnType::Double),
        (ColumnType::Bool | ColumnType::Int32 | ColumnType::Double, ValueClass::String(_)) => {
            Some(ColumnType::String)
        }
        _ => None,
    }
}

/// Append `class` as the next cell of `column`, widening the column first
/// when needed. An incompatible value is handed back untouched.
pub(crate) fn insert(column: &mut Column, class: ValueClass) -> Result<(), ValueClass> {
    if let Some(to) = widening(column.element_type(), &class) {
        trace!(column = column.name(), from = %column.element_type(), %to, "widening column");
        column.data_mut().widen(to);
    }
    push(column.data_mut(), class)
}

fn push(data: &mut ColumnData, class: ValueClass) -> Result<(), ValueClass> {
    match (data, class) {
        (data, ValueClass::Null) => data.push_missing(),

        (ColumnData::Bool(c), ValueClass::Bool(b)) => c.push(Some(b)),

        (ColumnData::Int32(c), ValueClass::Bool(b)) => c.push(Some(i32::from(b))),
        (ColumnData::Int32(c), ValueClass::Int32(i)) => c.push(Some(i)),

        (ColumnData::Double(c), ValueClass::Bool(b)) => c.push(Some(if b { 1.0 } else { 0.0 })),
        (ColumnData::Double(c), ValueClass::Int32(i)) => c.push(Some(f64::from(i))),
        (ColumnData::Double(c), ValueClass::Double(f)) => c.push(Some(f)),

        (ColumnData::String(c), ValueClass::Bool(b)) => c.push(Some(b.to_string())),
        (ColumnData::String(c), ValueClass::Int32(i)) => c.push(Some(i.to_string())),
        (ColumnData::String(c), ValueClass::Double(f)) => c.push(Some(format_double(f))),
        (ColumnData::String(c), ValueClass::String(s)) => c.push(Some(s)),

        (ColumnData::DateTime(c), ValueClass::DateTime(ms)) => c.push(Some(ms)),
        (ColumnData::List(c), ValueClass::List(v)) => c.push(Some(v)),

        (_, class) => return Err(class),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Decimal128, ObjectId};

    fn column_of(class: ValueClass) -> Column {
        let mut column = Column::with_capacity("c", infer_type(&class), 4);
        insert(&mut column, class).unwrap();
        column
    }

    fn defaults() -> FlattenOptions {
        FlattenOptions::default()
    }

    #[test]
    fn test_classify_narrows_wide_numbers() {
        let opts = defaults();
        assert_eq!(classify(Value::Int64(7), &opts), ValueClass::Double(7.0));
        let d: Decimal128 = "2.5".parse().unwrap();
        assert_eq!(classify(Value::Decimal128(d), &opts), ValueClass::Double(2.5));
    }

    #[test]
    fn test_classify_with_options() {
        let opts = FlattenOptions::new()
            .with_bigint_as_string(true)
            .with_date_as_string(true);
        assert_eq!(
            classify(Value::Int64(9_007_199_254_740_993), &opts),
            ValueClass::String("9007199254740993".to_string())
        );
        assert_eq!(
            classify(Value::DateTime(0), &opts),
            ValueClass::String("1970-01-01T00:00:00.000Z".to_string())
        );
    }

    #[test]
    fn test_classify_string_like_and_containers() {
        let opts = defaults();
        let oid = ObjectId::from_bytes([0xab; 12]);
        assert_eq!(
            classify(Value::ObjectId(oid), &opts),
            ValueClass::String("ab".repeat(12))
        );
        assert_eq!(
            classify(Value::Symbol("s".into()), &opts),
            ValueClass::String("s".into())
        );
        let ts = Value::Timestamp { t: 1, i: 2 };
        assert_eq!(classify(ts.clone(), &opts), ValueClass::List(ts));
    }

    #[test]
    fn test_infer_type() {
        assert_eq!(infer_type(&ValueClass::Null), ColumnType::Bool);
        assert_eq!(infer_type(&ValueClass::Int32(1)), ColumnType::Int32);
        assert_eq!(infer_type(&ValueClass::List(Value::Array(vec![]))), ColumnType::List);
    }

    #[test]
    fn test_bool_widens_through_numbers() {
        let mut column = column_of(ValueClass::Bool(true));
        insert(&mut column, ValueClass::Int32(5)).unwrap();
        assert_eq!(column.as_int32(), Some(&[Some(1), Some(5)][..]));
        insert(&mut column, ValueClass::Double(0.5)).unwrap();
        assert_eq!(column.as_double(), Some(&[Some(1.0), Some(5.0), Some(0.5)][..]));
    }

    #[test]
    fn test_narrower_values_are_stored_in_wider_columns() {
        let mut column = column_of(ValueClass::Double(2.5));
        insert(&mut column, ValueClass::Bool(false)).unwrap();
        insert(&mut column, ValueClass::Int32(3)).unwrap();
        assert_eq!(column.as_double(), Some(&[Some(2.5), Some(0.0), Some(3.0)][..]));
    }

    #[test]
    fn test_string_value_widens_scalar_column() {
        let mut column = column_of(ValueClass::Int32(1));
        insert(&mut column, ValueClass::Null).unwrap();
        insert(&mut column, ValueClass::String("x".into())).unwrap();
        insert(&mut column, ValueClass::Bool(true)).unwrap();
        assert_eq!(
            column.as_string(),
            Some(
                &[
                    Some("1".to_string()),
                    None,
                    Some("x".to_string()),
                    Some("true".to_string())
                ][..]
            )
        );
    }

    #[test]
    fn test_null_never_changes_type() {
        let mut column = column_of(ValueClass::DateTime(5));
        insert(&mut column, ValueClass::Null).unwrap();
        assert_eq!(column.element_type(), ColumnType::DateTime);
        assert_eq!(column.as_datetime(), Some(&[Some(5), None][..]));
    }

    #[test]
    fn test_incompatible_values_are_rejected_without_mutation() {
        let mut column = column_of(ValueClass::Int32(1));
        let doc = ValueClass::List(Value::Document(Default::default()));
        assert_eq!(insert(&mut column, doc.clone()), Err(doc));
        assert_eq!(column.element_type(), ColumnType::Int32);
        assert_eq!(column.len(), 1);

        let mut list = column_of(ValueClass::List(Value::Array(vec![])));
        assert_eq!(
            insert(&mut list, ValueClass::DateTime(1)),
            Err(ValueClass::DateTime(1))
        );
        assert_eq!(
            insert(&mut list, ValueClass::String("s".into())),
            Err(ValueClass::String("s".into()))
        );

        let mut dates = column_of(ValueClass::DateTime(1));
        assert!(insert(&mut dates, ValueClass::Int32(1)).is_err());
        assert!(insert(&mut dates, ValueClass::List(Value::Array(vec![]))).is_err());
    }

    #[test]
    fn test_string_column_stringifies_scalars() {
        let mut column = column_of(ValueClass::String("a".into()));
        insert(&mut column, ValueClass::Double(1.5)).unwrap();
        insert(&mut column, ValueClass::Int32(-2)).unwrap();
        let strings: Vec<_> = column.cells().map(|c| c.to_string()).collect();
        assert_eq!(strings, ["a", "1.5", "-2"]);
    }
}
