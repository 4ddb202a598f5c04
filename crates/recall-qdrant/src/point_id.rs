use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::PointId;
use recall_core::Metadata;
use serde_json::Value;

/// Hashable form of a Qdrant point identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PointKey {
    /// Canonical hyphenated lowercase UUID.
    Uuid(String),
    Num(u64),
}

impl PointKey {
    pub fn from_point_id(id: &PointId) -> Option<Self> {
        match id.point_id_options.as_ref()? {
            PointIdOptions::Num(n) => Some(PointKey::Num(*n)),
            PointIdOptions::Uuid(s) => {
                Some(PointKey::Uuid(canonical_uuid(s).unwrap_or_else(|| s.clone())))
            }
        }
    }
}

impl From<PointKey> for PointId {
    fn from(key: PointKey) -> Self {
        match key {
            PointKey::Uuid(s) => PointId::from(s),
            PointKey::Num(n) => PointId::from(n),
        }
    }
}

/// Derive the point identifier for one record of an upsert batch.
///
/// The `id` field is used when present and non-empty, otherwise `hash`:
/// - a string that parses as a UUID becomes that UUID,
/// - an unsigned integer is used as is,
/// - any other string becomes the integer value of its first 16 hex digits.
///
/// Anything else falls back to `index`, the position within the batch.
pub fn derive_point_id(meta: &Metadata, index: usize) -> PointKey {
    let candidate = [meta.id(), meta.get("hash")]
        .into_iter()
        .flatten()
        .find(|v| !is_blank(v));

    candidate
        .and_then(key_from_value)
        .unwrap_or(PointKey::Num(index as u64))
}

fn key_from_value(value: &Value) -> Option<PointKey> {
    match value {
        Value::Number(n) => n.as_u64().map(PointKey::Num),
        Value::String(s) => {
            if let Some(uuid) = canonical_uuid(s) {
                return Some(PointKey::Uuid(uuid));
            }
            let prefix: String = s.chars().take(16).collect();
            u64::from_str_radix(&prefix, 16).ok().map(PointKey::Num)
        }
        _ => None,
    }
}

fn canonical_uuid(s: &str) -> Option<String> {
    uuid::Uuid::parse_str(s).ok().map(|u| u.hyphenated().to_string())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_u64() == Some(0),
        _ => false,
    }
}
