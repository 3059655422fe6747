use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::firestore::value::{BytesValue, MapValue};

/// A decoded document field.
#[derive(Clone, Debug, PartialEq)]
pub struct FirestoreValue {
    kind: ValueKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    Bytes(BytesValue),
    Reference(String),
    GeoPoint { latitude: f64, longitude: f64 },
    Array(Vec<FirestoreValue>),
    Map(MapValue),
}

impl From<ValueKind> for FirestoreValue {
    fn from(kind: ValueKind) -> Self {
        Self { kind }
    }
}

impl FirestoreValue {
    pub fn null() -> Self {
        ValueKind::Null.into()
    }

    pub fn from_bool(value: bool) -> Self {
        ValueKind::Boolean(value).into()
    }

    pub fn from_integer(value: i64) -> Self {
        ValueKind::Integer(value).into()
    }

    pub fn from_double(value: f64) -> Self {
        ValueKind::Double(value).into()
    }

    pub fn from_timestamp(value: DateTime<Utc>) -> Self {
        ValueKind::Timestamp(value).into()
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        ValueKind::String(value.into()).into()
    }

    pub fn from_bytes(value: BytesValue) -> Self {
        ValueKind::Bytes(value).into()
    }

    pub fn from_reference(path: impl Into<String>) -> Self {
        ValueKind::Reference(path.into()).into()
    }

    pub fn from_geo_point(latitude: f64, longitude: f64) -> Self {
        ValueKind::GeoPoint {
            latitude,
            longitude,
        }
        .into()
    }

    pub fn from_array(values: Vec<FirestoreValue>) -> Self {
        ValueKind::Array(values).into()
    }

    pub fn from_map(map: BTreeMap<String, FirestoreValue>) -> Self {
        ValueKind::Map(MapValue::new(map)).into()
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_accessor_only_matches_strings() {
        let v = FirestoreValue::from_string("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(FirestoreValue::from_integer(3).as_str(), None);
    }

    #[test]
    fn arrays_hold_nested_values() {
        let v = FirestoreValue::from_array(vec![FirestoreValue::null(), FirestoreValue::from_bool(true)]);
        match v.kind() {
            ValueKind::Array(values) => assert_eq!(values.len(), 2),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
