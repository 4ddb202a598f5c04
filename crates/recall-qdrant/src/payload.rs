use std::collections::HashMap;

use qdrant_client::qdrant::{value::Kind, ListValue, Struct, Value as QdrantValue};
use recall_core::Metadata;
use serde_json::{Map, Number, Value as JsonValue};

/// Metadata to a Qdrant payload, one payload key per metadata field.
pub(crate) fn metadata_to_payload(metadata: &Metadata) -> HashMap<String, QdrantValue> {
    metadata
        .fields()
        .iter()
        .map(|(k, v)| (k.clone(), json_to_qdrant(v)))
        .collect()
}

pub(crate) fn payload_to_metadata(payload: &HashMap<String, QdrantValue>) -> Metadata {
    payload
        .iter()
        .map(|(k, v)| (k.clone(), qdrant_to_json(v)))
        .collect()
}

fn json_to_qdrant(json: &JsonValue) -> QdrantValue {
    let kind = match json {
        JsonValue::Null => Kind::NullValue(0),
        JsonValue::Bool(b) => Kind::BoolValue(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => Kind::StringValue(s.clone()),
        JsonValue::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(json_to_qdrant).collect(),
        }),
        JsonValue::Object(map) => Kind::StructValue(Struct {
            fields: map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_qdrant(v)))
                .collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}

fn qdrant_to_json(value: &QdrantValue) -> JsonValue {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(*b),
        Some(Kind::IntegerValue(i)) => JsonValue::Number((*i).into()),
        Some(Kind::DoubleValue(d)) => Number::from_f64(*d)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(Kind::StringValue(s)) => JsonValue::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(st)) => {
            let map: Map<String, JsonValue> = st
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), qdrant_to_json(v)))
                .collect();
            JsonValue::Object(map)
        }
    }
}
