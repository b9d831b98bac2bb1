use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Identifier of a JSON-RPC call.
///
/// Kept exactly as received: a numeric id keeps its textual form (`1e2`,
/// `1.50` and integers wider than 64 bits come back unchanged) and a string
/// id stays a string. An explicit `null` id is a request, not a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(Number),
    Null,
}

impl RequestId {
    /// Read an id from a raw envelope member. Returns `None` for kinds that
    /// are not valid ids (booleans, arrays, objects).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RequestId::String(s.clone())),
            Value::Number(n) => Some(RequestId::Number(n.clone())),
            Value::Null => Some(RequestId::Null),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RequestId::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "Invalid JSON-RPC id: expected string, number or null, got {}",
                value
            ))
        })
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

/// Protocol revision of an envelope.
///
/// JSON-RPC 1.0 is not represented: its class-hinted calls are rejected by
/// the parser rather than translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JsonRpcVersion {
    V1_1,
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V1_1 => "1.1",
            JsonRpcVersion::V2_0 => "2.0",
        }
    }

    /// Envelope member that carries the version tag for this revision.
    pub fn field_name(&self) -> &'static str {
        match self {
            JsonRpcVersion::V1_1 => "version",
            JsonRpcVersion::V2_0 => "jsonrpc",
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "2.0" => Ok(JsonRpcVersion::V2_0),
            "1.1" => Ok(JsonRpcVersion::V1_1),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_serialization() {
        let id_str = RequestId::String("test".to_string());
        let id_num = RequestId::from(42);

        assert_eq!(serde_json::to_string(&id_str).unwrap(), r#""test""#);
        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
        assert_eq!(serde_json::to_string(&RequestId::Null).unwrap(), "null");
    }

    #[test]
    fn test_request_id_keeps_numeric_representation() {
        let float_id = RequestId::from_value(&json!(1.5)).unwrap();
        assert_eq!(serde_json::to_string(&float_id).unwrap(), "1.5");

        let string_one = RequestId::from_value(&json!("1")).unwrap();
        let number_one = RequestId::from_value(&json!(1)).unwrap();
        assert_ne!(string_one, number_one);
    }

    #[test]
    fn test_request_id_keeps_number_text() {
        for raw in ["1e2", "1.50", "12345678901234567890123", "-0"] {
            let value: Value = serde_json::from_str(raw).unwrap();
            let id = RequestId::from_value(&value).unwrap();
            assert_eq!(serde_json::to_string(&id).unwrap(), raw);
        }
    }

    #[test]
    fn test_request_id_deserialize() {
        let id: RequestId = serde_json::from_str("1.50").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "1.50");
        assert!(serde_json::from_str::<RequestId>("[1]").is_err());
    }

    #[test]
    fn test_request_id_rejects_structured_values() {
        assert!(RequestId::from_value(&json!(true)).is_none());
        assert!(RequestId::from_value(&json!([1])).is_none());
        assert!(RequestId::from_value(&json!({"id": 1})).is_none());
    }

    #[test]
    fn test_json_rpc_version() {
        assert_eq!(JsonRpcVersion::V2_0.as_str(), "2.0");
        assert_eq!(JsonRpcVersion::V1_1.field_name(), "version");
        assert_eq!(
            serde_json::to_string(&JsonRpcVersion::V2_0).unwrap(),
            r#""2.0""#
        );
        assert!(serde_json::from_str::<JsonRpcVersion>(r#""1.0""#).is_err());
    }
}
