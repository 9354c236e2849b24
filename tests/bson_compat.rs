//! Decoder cross-checked against documents encoded by the `bson` crate

use bson::spec::BinarySubtype;
use bson::{Bson, Document as BsonDocument};

use bsonframe::codec::decode_document;
use bsonframe::model::{Decimal128, ObjectId, ValueKind};
use bsonframe::{Error, Value};

fn encode(document: &BsonDocument) -> Vec<u8> {
    let mut bytes = Vec::new();
    document.to_writer(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_scalars_match_bson_crate() {
    let oid = [7u8; 12];
    let document = bson::doc! {
        "double": 1.25,
        "string": "héllo",
        "bool": true,
        "null": Bson::Null,
        "int32": 42_i32,
        "int64": (1_i64 << 40),
        "oid": bson::oid::ObjectId::from_bytes(oid),
        "date": bson::DateTime::from_millis(-1500),
        "ts": Bson::Timestamp(bson::Timestamp { time: 100, increment: 7 }),
        "code": Bson::JavaScriptCode("f()".to_string()),
        "symbol": Bson::Symbol("sym".to_string()),
    };

    let decoded = decode_document(&encode(&document)).unwrap();
    let expected = bsonframe::doc! {
        "double" => 1.25,
        "string" => "héllo",
        "bool" => true,
        "null" => Value::Null,
        "int32" => 42,
        "int64" => 1_i64 << 40,
        "oid" => ObjectId::from_bytes(oid),
        "date" => Value::DateTime(-1500),
        "ts" => Value::Timestamp { t: 100, i: 7 },
        "code" => Value::Code("f()".to_string()),
        "symbol" => Value::Symbol("sym".to_string()),
    };
    assert_eq!(decoded, expected);
}

#[test]
fn test_containers_match_bson_crate() {
    let document = bson::doc! {
        "nested": { "z": 1_i32, "a": [1_i32, "two", { "three": 3.0 }] },
        "bin": Bson::Binary(bson::Binary { subtype: BinarySubtype::Generic, bytes: vec![1, 2, 3] }),
        "uuid": Bson::Binary(bson::Binary { subtype: BinarySubtype::Uuid, bytes: vec![0xaa; 16] }),
    };

    let decoded = decode_document(&encode(&document)).unwrap();
    let nested = decoded.get("nested").and_then(Value::as_document).unwrap();
    assert_eq!(nested.keys().collect::<Vec<_>>(), ["z", "a"]);
    assert_eq!(
        nested.get("a"),
        Some(&Value::Array(vec![
            Value::Int32(1),
            Value::from("two"),
            Value::Document(bsonframe::doc! { "three" => 3.0 }),
        ]))
    );
    assert_eq!(
        decoded.get("bin"),
        Some(&Value::Binary { subtype: 0x00, bytes: vec![1, 2, 3] })
    );
    assert_eq!(
        decoded.get("uuid"),
        Some(&Value::Binary { subtype: 0x04, bytes: vec![0xaa; 16] })
    );
}

#[test]
fn test_our_encoding_is_readable_by_bson_crate() {
    let ours = bsonframe::doc! {
        "a" => 1,
        "b" => vec![Value::from("x"), Value::Null],
        "c" => bsonframe::doc! { "d" => Value::DateTime(5) },
    };
    let bytes = bsonframe::encode_document(&ours).unwrap();
    let theirs = BsonDocument::from_reader(&mut bytes.as_slice()).unwrap();
    assert_eq!(
        theirs,
        bson::doc! {
            "a": 1_i32,
            "b": ["x", Bson::Null],
            "c": { "d": bson::DateTime::from_millis(5) },
        }
    );
}

#[test]
fn test_decimal128_from_bson_crate() {
    let ours: Decimal128 = "-12.345".parse().unwrap();
    let document = bson::doc! { "d": bson::Decimal128::from_bytes(ours.bytes()) };
    let decoded = decode_document(&encode(&document)).unwrap();
    match decoded.get("d") {
        Some(Value::Decimal128(d)) => {
            assert_eq!(d.to_string(), "-12.345");
            assert_eq!(d.to_f64(), -12.345);
        }
        other => panic!("unexpected value: {other:?}"),
    }
}

#[test]
fn test_unsupported_types_are_reported() {
    let cases = [
        ("re", Bson::RegularExpression(bson::Regex { pattern: "a+".to_string(), options: "i".to_string() }), 0x0b_u8),
        ("undef", Bson::Undefined, 0x06),
        ("min", Bson::MinKey, 0xff),
        ("max", Bson::MaxKey, 0x7f),
    ];
    for (key, value, wire_type) in cases {
        let mut document = BsonDocument::new();
        document.insert(key, value);
        match decode_document(&encode(&document)) {
            Err(Error::UnsupportedType { key: k, wire_type: w }) => {
                assert_eq!(k, key);
                assert_eq!(w, wire_type);
            }
            other => panic!("expected UnsupportedType for {key}, got {other:?}"),
        }
    }
}

#[test]
fn test_flattened_kinds_from_bson_crate() {
    use bsonframe::source::BsonReader;
    use bsonframe::{flatten, ColumnType};

    let mut bytes = Vec::new();
    for i in 0..3_i32 {
        let document = bson::doc! { "i": i, "big": i64::from(i), "when": bson::DateTime::from_millis(i64::from(i)) };
        document.to_writer(&mut bytes).unwrap();
    }
    let mut reader = BsonReader::new(bytes.as_slice());
    let table = flatten(&mut reader, 10).unwrap();
    assert_eq!(table.row_count(), 3);
    let schema: Vec<_> = table.schema().into_values().collect();
    assert_eq!(schema, [ColumnType::Int32, ColumnType::Double, ColumnType::DateTime]);
    assert_eq!(Value::Int64(1).kind(), ValueKind::Int64);
}
