use std::collections::BTreeMap;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value as JsonValue};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DatabaseId, DocumentKey};
use crate::firestore::value::{BytesValue, FirestoreValue, MapValue, ValueKind};

/// Converts between decoded values and the Firestore REST JSON encoding.
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        format!(
            "{}/{}",
            self.database_id.documents_root(),
            key.path().canonical_string()
        )
    }

    /// Encodes a document the way the REST API returns it, so cached entries
    /// decode through the same path as network responses.
    pub fn encode_document(&self, key: &DocumentKey, map: &MapValue) -> JsonValue {
        json!({
            "name": self.document_name(key),
            "fields": encode_map_fields(map)
        })
    }

    pub fn decode_document_fields(&self, value: &JsonValue) -> FirestoreResult<MapValue> {
        if value.get("fields").is_some() {
            decode_map_value(value)
        } else {
            // Document exists but has no user fields.
            Ok(MapValue::default())
        }
    }
}

fn encode_map_fields(map: &MapValue) -> JsonValue {
    let mut fields = serde_json::Map::new();
    for (key, value) in map.fields() {
        fields.insert(key.clone(), encode_value(value));
    }
    JsonValue::Object(fields)
}

fn encode_value(value: &FirestoreValue) -> JsonValue {
    match value.kind() {
        ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
        ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
        ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        ValueKind::Double(double) => json!({ "doubleValue": double }),
        ValueKind::Timestamp(timestamp) => json!({
            "timestampValue": timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
        }),
        ValueKind::String(string) => json!({ "stringValue": string }),
        ValueKind::Bytes(bytes) => json!({ "bytesValue": bytes.to_base64() }),
        ValueKind::Reference(reference) => json!({ "referenceValue": reference }),
        ValueKind::GeoPoint {
            latitude,
            longitude,
        } => json!({
            "geoPointValue": {
                "latitude": latitude,
                "longitude": longitude,
            }
        }),
        ValueKind::Array(array) => {
            let values = array.iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        ValueKind::Map(map) => json!({
            "mapValue": {
                "fields": encode_map_fields(map)
            }
        }),
    }
}

fn decode_map_value(value: &JsonValue) -> FirestoreResult<MapValue> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected object for map value"))?;
    let fields_object = match map.get("fields") {
        Some(fields_value) => fields_value
            .as_object()
            .ok_or_else(|| invalid_argument("Expected 'fields' to be an object"))?,
        None => return Ok(MapValue::default()),
    };

    let mut fields = BTreeMap::new();
    for (key, value) in fields_object {
        fields.insert(key.clone(), decode_value(value)?);
    }
    Ok(MapValue::new(fields))
}

fn decode_value(value: &JsonValue) -> FirestoreResult<FirestoreValue> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected Firestore value object"))?;
    if object.contains_key("nullValue") {
        return Ok(FirestoreValue::null());
    }
    if let Some(bool_value) = object.get("booleanValue") {
        let value = bool_value
            .as_bool()
            .ok_or_else(|| invalid_argument("booleanValue must be bool"))?;
        return Ok(FirestoreValue::from_bool(value));
    }
    if let Some(integer_value) = object.get("integerValue") {
        let parsed = match integer_value {
            JsonValue::String(value) => i64::from_str(value)
                .map_err(|err| invalid_argument(format!("Invalid integerValue: {err}")))?,
            JsonValue::Number(number) => number
                .as_i64()
                .ok_or_else(|| invalid_argument("Integer out of range"))?,
            _ => return Err(invalid_argument("integerValue must be a string or number")),
        };
        return Ok(FirestoreValue::from_integer(parsed));
    }
    if let Some(double_value) = object.get("doubleValue") {
        let parsed = match double_value {
            JsonValue::Number(number) => number
                .as_f64()
                .ok_or_else(|| invalid_argument("Invalid doubleValue"))?,
            JsonValue::String(value) => value
                .parse::<f64>()
                .map_err(|err| invalid_argument(format!("Invalid doubleValue: {err}")))?,
            _ => return Err(invalid_argument("doubleValue must be a number or string")),
        };
        return Ok(FirestoreValue::from_double(parsed));
    }
    if let Some(timestamp_value) = object.get("timestampValue") {
        let timestamp_str = timestamp_value
            .as_str()
            .ok_or_else(|| invalid_argument("timestampValue must be string"))?;
        let parsed = DateTime::parse_from_rfc3339(timestamp_str)
            .map_err(|err| invalid_argument(format!("Invalid timestamp: {err}")))?;
        return Ok(FirestoreValue::from_timestamp(parsed.with_timezone(&Utc)));
    }
    if let Some(string_value) = object.get("stringValue") {
        let str_value = string_value
            .as_str()
            .ok_or_else(|| invalid_argument("stringValue must be string"))?;
        return Ok(FirestoreValue::from_string(str_value));
    }
    if let Some(bytes_value) = object.get("bytesValue") {
        let str_value = bytes_value
            .as_str()
            .ok_or_else(|| invalid_argument("bytesValue must be base64 string"))?;
        let decoded = BASE64_STANDARD
            .decode(str_value)
            .map_err(|err| invalid_argument(format!("Invalid bytesValue: {err}")))?;
        return Ok(FirestoreValue::from_bytes(BytesValue::from(decoded)));
    }
    if let Some(reference_value) = object.get("referenceValue") {
        let str_value = reference_value
            .as_str()
            .ok_or_else(|| invalid_argument("referenceValue must be string"))?;
        return Ok(FirestoreValue::from_reference(str_value));
    }
    if let Some(geo_point) = object.get("geoPointValue") {
        let latitude = geo_point
            .get("latitude")
            .and_then(|value| value.as_f64())
            .unwrap_or_default();
        let longitude = geo_point
            .get("longitude")
            .and_then(|value| value.as_f64())
            .unwrap_or_default();
        return Ok(FirestoreValue::from_geo_point(latitude, longitude));
    }
    if let Some(array_value) = object.get("arrayValue") {
        let decoded = match array_value.get("values").and_then(JsonValue::as_array) {
            Some(entries) => entries
                .iter()
                .map(decode_value)
                .collect::<FirestoreResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        return Ok(FirestoreValue::from_array(decoded));
    }
    if let Some(map_value) = object.get("mapValue") {
        let map = decode_map_value(map_value)?;
        return Ok(FirestoreValue::from_map(map.fields().clone()));
    }

    Err(invalid_argument("Unknown Firestore value type"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serializer() -> JsonProtoSerializer {
        JsonProtoSerializer::new(DatabaseId::default("project"))
    }

    #[test]
    fn decodes_user_document_response() {
        let response = json!({
            "name": "projects/project/databases/(default)/documents/User/uid-1",
            "fields": {
                "email": { "stringValue": "ada@example.com" },
                "logins": { "integerValue": "42" },
                "verified": { "booleanValue": true },
                "createdAt": { "timestampValue": "2024-03-01T10:00:00.5Z" },
                "tags": { "arrayValue": { "values": [{ "stringValue": "beta" }] } },
                "prefs": { "mapValue": { "fields": { "dark": { "booleanValue": false } } } },
                "avatar": { "nullValue": null }
            },
            "createTime": "2024-03-01T10:00:00Z",
            "updateTime": "2024-03-01T10:00:00Z"
        });
        let map = serializer().decode_document_fields(&response).unwrap();
        assert_eq!(map.get("email").and_then(FirestoreValue::as_str), Some("ada@example.com"));
        assert_eq!(map.get("logins"), Some(&FirestoreValue::from_integer(42)));
        assert_eq!(map.get("avatar"), Some(&FirestoreValue::null()));
        match map.get("createdAt").map(FirestoreValue::kind) {
            Some(ValueKind::Timestamp(ts)) => assert_eq!(ts.timestamp_subsec_millis(), 500),
            other => panic!("expected timestamp, got {other:?}"),
        }
        match map.get("prefs").map(FirestoreValue::kind) {
            Some(ValueKind::Map(prefs)) => {
                assert_eq!(prefs.get("dark"), Some(&FirestoreValue::from_bool(false)))
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn document_without_fields_is_empty() {
        let map = serializer()
            .decode_document_fields(&json!({ "name": "x" }))
            .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn encoded_document_decodes_to_same_fields() {
        let key = DocumentKey::from_string("User/uid-1").unwrap();
        let map = MapValue::new(BTreeMap::from([
            ("email".to_string(), FirestoreValue::from_string("ada@example.com")),
            ("score".to_string(), FirestoreValue::from_double(1.5)),
        ]));
        let encoded = serializer().encode_document(&key, &map);
        assert_eq!(
            encoded["name"],
            "projects/project/databases/(default)/documents/User/uid-1"
        );
        assert_eq!(serializer().decode_document_fields(&encoded).unwrap(), map);
    }

    #[test]
    fn rejects_unknown_value_type() {
        let err = serializer()
            .decode_document_fields(&json!({ "fields": { "x": { "weirdValue": 1 } } }))
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
