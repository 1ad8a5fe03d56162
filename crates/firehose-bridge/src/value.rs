// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Header value normalization.
//!
//! Firehose deliveries carry an AMQP header table whose values may be any
//! AMQP field type, nested arbitrarily. Records on disk carry the same
//! headers as JSON. Both are funnelled through [`normalize`] into a single
//! [`NormalizedValue`] tree so that capture and replay agree on shape.
//!
//! This is the only module that knows about AMQP field types.

use lapin::types::{AMQPValue, ByteArray, FieldArray, FieldTable, LongString, ShortString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use std::collections::BTreeMap;

/// Normalized header map, keyed by header name.
pub type HeaderMap = BTreeMap<String, NormalizedValue>;

/// Canonical header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedValue {
    /// AMQP void / JSON null.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer or floating point number.
    Number(Number),
    /// UTF-8 text.
    String(String),
    /// Raw bytes. Only built in memory; wire and file input become `String`.
    Bytes(Vec<u8>),
    /// Ordered list.
    List(Vec<NormalizedValue>),
    /// Keyed map, keys compared case-sensitively.
    Map(BTreeMap<String, NormalizedValue>),
}

impl NormalizedValue {
    /// Borrow as text, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a list, if this is a `List`.
    pub fn as_list(&self) -> Option<&[NormalizedValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Decode a list of strings.
    ///
    /// Returns `None` if this is not a list or any element is not a string.
    pub fn string_list(&self) -> Option<Vec<String>> {
        self.as_list()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

impl From<&str> for NormalizedValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for NormalizedValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for NormalizedValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for NormalizedValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for NormalizedValue {
    fn from(n: i32) -> Self {
        Self::Number(i64::from(n).into())
    }
}

impl<T: Into<NormalizedValue>> From<Vec<T>> for NormalizedValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Anything that can be folded into a [`NormalizedValue`].
pub trait Normalize {
    fn normalize(&self) -> NormalizedValue;
}

/// Normalize a value. Total: never fails.
pub fn normalize<V: Normalize + ?Sized>(value: &V) -> NormalizedValue {
    value.normalize()
}

impl Normalize for NormalizedValue {
    fn normalize(&self) -> NormalizedValue {
        self.clone()
    }
}

impl Normalize for serde_json::Value {
    fn normalize(&self) -> NormalizedValue {
        use serde_json::Value;

        match self {
            Value::Null => NormalizedValue::Null,
            Value::Bool(b) => NormalizedValue::Bool(*b),
            Value::Number(n) => NormalizedValue::Number(n.clone()),
            Value::String(s) => NormalizedValue::String(s.clone()),
            Value::Array(items) => NormalizedValue::List(items.iter().map(normalize).collect()),
            Value::Object(map) => NormalizedValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize(v)))
                    .collect(),
            ),
        }
    }
}

impl Normalize for AMQPValue {
    fn normalize(&self) -> NormalizedValue {
        match self {
            AMQPValue::Void => NormalizedValue::Null,
            AMQPValue::Boolean(b) => NormalizedValue::Bool(*b),
            AMQPValue::ShortShortInt(n) => i64::from(*n).into(),
            AMQPValue::ShortShortUInt(n) => i64::from(*n).into(),
            AMQPValue::ShortInt(n) => i64::from(*n).into(),
            AMQPValue::ShortUInt(n) => i64::from(*n).into(),
            AMQPValue::LongInt(n) => i64::from(*n).into(),
            AMQPValue::LongUInt(n) => i64::from(*n).into(),
            AMQPValue::LongLongInt(n) => (*n).into(),
            AMQPValue::Timestamp(t) => NormalizedValue::Number((*t).into()),
            AMQPValue::Float(f) => float(f64::from(*f)),
            AMQPValue::Double(f) => float(*f),
            AMQPValue::DecimalValue(d) => {
                float(f64::from(d.value) / 10f64.powi(i32::from(d.scale)))
            }
            AMQPValue::ShortString(s) => NormalizedValue::String(s.as_str().to_string()),
            AMQPValue::LongString(s) => text(s.as_bytes()),
            AMQPValue::ByteArray(bytes) => text(bytes.as_slice()),
            AMQPValue::FieldArray(items) => {
                NormalizedValue::List(items.as_slice().iter().map(normalize).collect())
            }
            AMQPValue::FieldTable(table) => NormalizedValue::Map(table_entries(table)),
            #[allow(unreachable_patterns)]
            other => NormalizedValue::String(format!("{:?}", other)),
        }
    }
}

/// Normalize an AMQP header table. An absent table yields an empty map.
pub fn normalize_headers(headers: Option<&FieldTable>) -> HeaderMap {
    headers.map(table_entries).unwrap_or_default()
}

fn table_entries(table: &FieldTable) -> BTreeMap<String, NormalizedValue> {
    table
        .inner()
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), normalize(v)))
        .collect()
}

fn text(bytes: &[u8]) -> NormalizedValue {
    NormalizedValue::String(String::from_utf8_lossy(bytes).into_owned())
}

// NaN and infinities have no JSON number form; keep their text.
fn float(f: f64) -> NormalizedValue {
    match Number::from_f64(f) {
        Some(n) => NormalizedValue::Number(n),
        None => NormalizedValue::String(f.to_string()),
    }
}

/// Convert a normalized value into an AMQP field value for publishing.
pub fn to_wire(value: &NormalizedValue) -> AMQPValue {
    match value {
        NormalizedValue::Null => AMQPValue::Void,
        NormalizedValue::Bool(b) => AMQPValue::Boolean(*b),
        NormalizedValue::Number(n) => match n.as_i64() {
            Some(i) => AMQPValue::LongLongInt(i),
            None => AMQPValue::Double(n.as_f64().unwrap_or_default()),
        },
        NormalizedValue::String(s) => AMQPValue::LongString(LongString::from(s.as_str())),
        NormalizedValue::Bytes(b) => AMQPValue::ByteArray(ByteArray::from(b.clone())),
        NormalizedValue::List(items) => {
            AMQPValue::FieldArray(FieldArray::from(items.iter().map(to_wire).collect::<Vec<_>>()))
        }
        NormalizedValue::Map(map) => AMQPValue::FieldTable(map_to_table(map)),
    }
}

/// Convert a normalized header map into an AMQP header table.
pub fn headers_to_wire(headers: &HeaderMap) -> FieldTable {
    map_to_table(headers)
}

fn map_to_table(map: &BTreeMap<String, NormalizedValue>) -> FieldTable {
    let mut table = FieldTable::default();
    for (k, v) in map {
        table.insert(ShortString::from(k.as_str()), to_wire(v));
    }
    table
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for NormalizedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(|v| normalize(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::types::DecimalValue;
    use serde_json::json;

    #[test]
    fn test_scalar_wire_values() {
        assert_eq!(normalize(&AMQPValue::Boolean(true)), NormalizedValue::Bool(true));
        assert_eq!(normalize(&AMQPValue::ShortInt(-7)), NormalizedValue::from(-7));
        assert_eq!(normalize(&AMQPValue::LongUInt(42)), NormalizedValue::from(42));
        assert_eq!(normalize(&AMQPValue::Void), NormalizedValue::Null);
        assert_eq!(
            normalize(&AMQPValue::Timestamp(1_700_000_000)),
            NormalizedValue::from(1_700_000_000)
        );
    }

    #[test]
    fn test_wire_strings_become_text() {
        let long = AMQPValue::LongString(LongString::from("amq.direct"));
        assert_eq!(normalize(&long), NormalizedValue::from("amq.direct"));

        let bytes = AMQPValue::ByteArray(ByteArray::from(b"raw".to_vec()));
        assert_eq!(normalize(&bytes), NormalizedValue::from("raw"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let value = AMQPValue::LongString(LongString::from(vec![0x66, 0xFF, 0x6F]));
        match normalize(&value) {
            NormalizedValue::String(s) => assert_eq!(s, "f\u{FFFD}o"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_decimal_and_nan() {
        let decimal = AMQPValue::DecimalValue(DecimalValue { scale: 2, value: 1250 });
        assert_eq!(normalize(&decimal), NormalizedValue::Number(Number::from_f64(12.5).expect("finite")));

        assert_eq!(
            normalize(&AMQPValue::Double(f64::NAN)),
            NormalizedValue::String("NaN".into())
        );
    }

    #[test]
    fn test_nested_wire_table() {
        let mut inner = FieldTable::default();
        inner.insert("delivery_mode".into(), AMQPValue::ShortShortUInt(2));
        inner.insert(
            "content_type".into(),
            AMQPValue::LongString(LongString::from("text/plain")),
        );

        let mut headers = FieldTable::default();
        headers.insert("properties".into(), AMQPValue::FieldTable(inner));
        headers.insert(
            "routing_keys".into(),
            AMQPValue::FieldArray(FieldArray::from(vec![
                AMQPValue::LongString(LongString::from("b")),
                AMQPValue::LongString(LongString::from("a")),
            ])),
        );

        let map = normalize_headers(Some(&headers));
        assert_eq!(
            map["routing_keys"].string_list(),
            Some(vec!["b".to_string(), "a".to_string()])
        );

        let properties = match &map["properties"] {
            NormalizedValue::Map(m) => m,
            other => panic!("expected map, got {:?}", other),
        };
        assert_eq!(properties["delivery_mode"], NormalizedValue::from(2));
        assert_eq!(properties["content_type"], NormalizedValue::from("text/plain"));
    }

    #[test]
    fn test_absent_headers_are_empty() {
        assert!(normalize_headers(None).is_empty());
    }

    #[test]
    fn test_json_matches_wire_shape() {
        let from_json = normalize(&json!({
            "exchange_name": "orders",
            "routing_keys": ["eu", "us"],
            "redelivered": false,
        }));

        let mut table = FieldTable::default();
        table.insert("exchange_name".into(), AMQPValue::LongString("orders".into()));
        table.insert(
            "routing_keys".into(),
            AMQPValue::FieldArray(FieldArray::from(vec![
                AMQPValue::LongString("eu".into()),
                AMQPValue::LongString("us".into()),
            ])),
        );
        table.insert("redelivered".into(), AMQPValue::Boolean(false));

        assert_eq!(from_json, NormalizedValue::Map(normalize_headers(Some(&table))));
    }

    #[test]
    fn test_canonical_leaf_is_unchanged() {
        let leaves = vec![
            NormalizedValue::Null,
            NormalizedValue::Bool(false),
            NormalizedValue::from(3),
            NormalizedValue::from("x"),
            NormalizedValue::Bytes(vec![0, 159]),
        ];
        for leaf in leaves {
            assert_eq!(normalize(&leaf), leaf);
        }
    }

    #[test]
    fn test_wire_round_trip() {
        let value = NormalizedValue::Map(BTreeMap::from([
            ("keys".to_string(), NormalizedValue::from(vec!["a", "b"])),
            ("count".to_string(), NormalizedValue::from(5)),
            ("ratio".to_string(), NormalizedValue::Number(Number::from_f64(0.25).expect("finite"))),
            ("flag".to_string(), NormalizedValue::Bool(true)),
            ("nothing".to_string(), NormalizedValue::Null),
        ]));

        assert_eq!(normalize(&to_wire(&value)), value);
    }

    #[test]
    fn test_string_list_rejects_mixed() {
        let mixed = NormalizedValue::List(vec![NormalizedValue::from("a"), NormalizedValue::from(1)]);
        assert_eq!(mixed.string_list(), None);
        assert_eq!(NormalizedValue::from("a").string_list(), None);
        assert_eq!(NormalizedValue::List(vec![]).string_list(), Some(vec![]));
    }

    #[test]
    fn test_serialize_matches_json() {
        let value = NormalizedValue::Map(BTreeMap::from([
            ("a".to_string(), NormalizedValue::from(vec!["x"])),
            ("b".to_string(), NormalizedValue::Null),
        ]));
        let json = serde_json::to_value(&value).expect("serialize");
        assert_eq!(json, json!({"a": ["x"], "b": null}));
    }
}
