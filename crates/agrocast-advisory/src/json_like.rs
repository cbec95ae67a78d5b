//! Closed view of an advisory payload, decided once at the boundary.

use agrocast_agent::decode_json_text;
use serde_json::{Number, Value};

/// Shape of an advisory payload value.
///
/// Mappings keep the key order the payload arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonLike {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Mapping(Vec<(String, JsonLike)>),
    Sequence(Vec<JsonLike>),
}

impl JsonLike {
    /// Decode JSON text of any nesting depth.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        decode_json_text(text).map(Self::from)
    }

    /// Textual form of a scalar; `None` for containers.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Mapping(_) | Self::Sequence(_) => None,
        }
    }
}

impl From<Value> for JsonLike {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(fields) => {
                Self::Mapping(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for JsonLike {
    fn from(value: &Value) -> Self {
        Self::from(value.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_keeps_payload_order() {
        let like = JsonLike::parse(r#"{"zeta": 1, "alpha": [true, null], "mid": "x"}"#).unwrap();
        let JsonLike::Mapping(entries) = like else {
            panic!("expected mapping");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(
            entries[1].1,
            JsonLike::Sequence(vec![JsonLike::Bool(true), JsonLike::Null])
        );
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(JsonLike::from(json!(2.5)).scalar_text().as_deref(), Some("2.5"));
        assert_eq!(JsonLike::from(json!(false)).scalar_text().as_deref(), Some("false"));
        assert_eq!(JsonLike::Null.scalar_text().as_deref(), Some(""));
        assert!(JsonLike::from(json!({})).scalar_text().is_none());
    }

    #[test]
    fn test_parse_rejects_plain_text() {
        assert!(JsonLike::parse("Soil Type: Loamy").is_err());
    }
}
