//! Envelope parsing: raw text to logical requests.
//!
//! Structural problems are reported per request so that one malformed batch
//! element never affects its siblings.

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::error::{JsonRpcErrorObject, details};
use crate::request::{JsonRpcRequest, RequestParams};
use crate::response::JsonRpcResponse;
use crate::types::{JsonRpcVersion, RequestId};

/// Member used by JSON-RPC 1.0 class hinting.
const CLASS_HINT: &str = "__jsonclass__";

/// A request that failed structural validation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeError {
    /// Id of the offending request, or null when it could not be read
    pub id: RequestId,
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
}

impl EnvelopeError {
    fn invalid(id: RequestId, version: JsonRpcVersion, reason: impl std::fmt::Display) -> Self {
        Self {
            id,
            version,
            error: JsonRpcErrorObject::invalid_request(Some(details(reason))),
        }
    }

    /// Structural errors always get a response, notification or not.
    pub fn into_response(self) -> JsonRpcResponse {
        JsonRpcResponse::error(self.version, self.id, self.error)
    }
}

/// Outcome of parsing a raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// A single request object
    Single(Result<JsonRpcRequest, EnvelopeError>),
    /// A non-empty batch, elements in input order
    Batch(Vec<Result<JsonRpcRequest, EnvelopeError>>),
    /// The payload as a whole is unusable; answer with this response
    Rejected(JsonRpcResponse),
}

/// Parses payloads according to a service configuration.
#[derive(Debug, Clone)]
pub struct EnvelopeParser {
    allow_v1_1: bool,
    max_batch_size: Option<usize>,
}

impl Default for EnvelopeParser {
    fn default() -> Self {
        Self::new(&ServiceConfig::default())
    }
}

impl EnvelopeParser {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            allow_v1_1: config.allow_v1_1,
            max_batch_size: config.max_batch_size,
        }
    }

    /// Parse raw text. Malformed JSON is a parse error with a null id.
    pub fn parse(&self, raw: &str) -> ParsedMessage {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.parse_value(value),
            Err(err) => {
                warn!("Rejected unparsable JSON-RPC payload: {}", err);
                ParsedMessage::Rejected(JsonRpcResponse::unattributed(
                    JsonRpcErrorObject::parse_error(Some(details(err))),
                ))
            }
        }
    }

    /// Parse an already decoded JSON value.
    pub fn parse_value(&self, value: Value) -> ParsedMessage {
        match value {
            Value::Array(elements) => {
                if elements.is_empty() {
                    let error = JsonRpcErrorObject::invalid_request(Some(details(
                        "Batch request array is empty",
                    )));
                    return ParsedMessage::Rejected(JsonRpcResponse::unattributed(error));
                }
                if let Some(limit) = self.max_batch_size.filter(|limit| elements.len() > *limit) {
                    warn!("Rejected batch of {} requests (limit {})", elements.len(), limit);
                    return ParsedMessage::Rejected(JsonRpcResponse::unattributed(
                        JsonRpcErrorObject::invalid_request(Some(details(format!(
                            "Batch of {} requests exceeds the limit of {}",
                            elements.len(),
                            limit
                        )))),
                    ));
                }
                ParsedMessage::Batch(elements.into_iter().map(|e| self.parse_request(e)).collect())
            }
            other => ParsedMessage::Single(self.parse_request(other)),
        }
    }

    /// Validate one request object.
    pub fn parse_request(&self, value: Value) -> Result<JsonRpcRequest, EnvelopeError> {
        let Value::Object(mut object) = value else {
            return Err(EnvelopeError::invalid(
                RequestId::Null,
                JsonRpcVersion::V2_0,
                "Request must be a JSON object",
            ));
        };

        let id = match object.remove("id") {
            None => None,
            Some(raw) => match RequestId::from_value(&raw) {
                Some(id) => Some(id),
                None => {
                    return Err(EnvelopeError::invalid(
                        RequestId::Null,
                        detect_version(&object).unwrap_or_default(),
                        "Request id must be a string, a number or null",
                    ));
                }
            },
        };
        let reply_id = id.clone().unwrap_or(RequestId::Null);

        let version = detect_version(&object).map_err(|reason| {
            EnvelopeError::invalid(reply_id.clone(), JsonRpcVersion::V2_0, reason)
        })?;
        if version == JsonRpcVersion::V1_1 && !self.allow_v1_1 {
            return Err(EnvelopeError::invalid(
                reply_id,
                JsonRpcVersion::V2_0,
                "Only JSON-RPC 2.0 requests are accepted",
            ));
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            Some(Value::String(_)) => {
                return Err(EnvelopeError::invalid(
                    reply_id,
                    version,
                    "Method name must not be empty",
                ));
            }
            Some(_) => {
                return Err(EnvelopeError::invalid(
                    reply_id,
                    version,
                    "Method name must be a string",
                ));
            }
            None => {
                return Err(EnvelopeError::invalid(reply_id, version, "Missing method name"));
            }
        };

        let params = match object.remove("params") {
            None => None,
            Some(params) if contains_class_hint(&params) => {
                return Err(EnvelopeError::invalid(
                    reply_id,
                    version,
                    "Class-hinted parameters (JSON-RPC 1.0) are not supported",
                ));
            }
            Some(Value::Array(values)) => Some(RequestParams::Array(values)),
            Some(Value::Object(map)) => Some(RequestParams::from(map)),
            Some(_) => {
                return Err(EnvelopeError::invalid(
                    reply_id,
                    version,
                    "Params must be an array or an object",
                ));
            }
        };

        Ok(JsonRpcRequest {
            version,
            id,
            method,
            params,
        })
    }
}

/// Parse with the default configuration.
pub fn parse_message(raw: &str) -> ParsedMessage {
    EnvelopeParser::default().parse(raw)
}

/// Work out the protocol revision from the envelope's version markers.
fn detect_version(object: &Map<String, Value>) -> Result<JsonRpcVersion, String> {
    if let Some(tag) = object.get("jsonrpc") {
        return match tag.as_str() {
            Some("2.0") => Ok(JsonRpcVersion::V2_0),
            _ => Err(format!("Unsupported jsonrpc version {}", tag)),
        };
    }
    match object.get("version") {
        None => Ok(JsonRpcVersion::V1_1),
        Some(tag) if tag.as_str() == Some("1.1") => Ok(JsonRpcVersion::V1_1),
        Some(tag) => Err(format!("Unsupported version {}", tag)),
    }
}

fn contains_class_hint(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(CLASS_HINT) || map.values().any(contains_class_hint),
        Value::Array(values) => values.iter().any(contains_class_hint),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(raw: &str) -> Result<JsonRpcRequest, EnvelopeError> {
        match parse_message(raw) {
            ParsedMessage::Single(result) => result,
            other => panic!("expected a single request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_valid_request() {
        let request =
            single(r#"{"jsonrpc": "2.0", "method": "test", "params": [1, 2], "id": 1}"#).unwrap();

        assert_eq!(request.version, JsonRpcVersion::V2_0);
        assert_eq!(request.method, "test");
        assert_eq!(request.id, Some(RequestId::from(1)));
        assert_eq!(request.params, Some(RequestParams::Array(vec![json!(1), json!(2)])));
    }

    #[test]
    fn test_parse_valid_notification() {
        let request = single(r#"{"jsonrpc": "2.0", "method": "notify"}"#).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_null_id_is_a_request() {
        let request = single(r#"{"jsonrpc": "2.0", "method": "m", "id": null}"#).unwrap();
        assert_eq!(request.id, Some(RequestId::Null));
    }

    #[test]
    fn test_parse_invalid_json() {
        let ParsedMessage::Rejected(response) = parse_message(r#"{"jsonrpc": "2.0", "method": "test""#) else {
            panic!("expected a rejected payload");
        };
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error_object().unwrap().code, -32700);
    }

    #[test]
    fn test_parse_empty_batch() {
        let ParsedMessage::Rejected(response) = parse_message("[]") else {
            panic!("expected a rejected payload");
        };
        assert_eq!(response.error_object().unwrap().code, -32600);
    }

    #[test]
    fn test_parse_invalid_version() {
        let err = single(r#"{"jsonrpc": "1.0", "method": "test", "id": 1}"#).unwrap_err();
        assert_eq!(err.error.code, -32600);
        assert_eq!(err.id, RequestId::from(1));

        let err = single(r#"{"jsonrpc": "9999", "method": "noop", "params": {"kwarg": 5}}"#).unwrap_err();
        assert_eq!(err.id, RequestId::Null);
    }

    #[test]
    fn test_v11_detection() {
        let request = single(r#"{"version": "1.1", "method": "echo", "params": ["x"], "id": "a"}"#).unwrap();
        assert_eq!(request.version, JsonRpcVersion::V1_1);

        let request = single(r#"{"method": "echo", "params": ["x"], "id": 3}"#).unwrap();
        assert_eq!(request.version, JsonRpcVersion::V1_1);

        assert!(single(r#"{"version": "1.0", "method": "echo", "id": 3}"#).is_err());
    }

    #[test]
    fn test_v11_rejected_when_disabled() {
        let parser = EnvelopeParser::new(&ServiceConfig::default().with_allow_v1_1(false));
        let ParsedMessage::Single(Err(err)) = parser.parse(r#"{"method": "echo", "id": 3}"#) else {
            panic!("expected an envelope error");
        };
        assert_eq!(err.error.code, -32600);
        assert_eq!(err.id, RequestId::from(3));
    }

    #[test]
    fn test_class_hint_rejected() {
        let err = single(
            r#"{"method": "store", "params": [{"__jsonclass__": ["Date", [2010]]}], "id": 9}"#,
        )
        .unwrap_err();
        assert_eq!(err.error.code, -32600);
        assert_eq!(err.version, JsonRpcVersion::V1_1);
    }

    #[test]
    fn test_invalid_members() {
        assert!(single(r#"{"jsonrpc": "2.0", "method": 1, "id": 1}"#).is_err());
        assert!(single(r#"{"jsonrpc": "2.0", "method": "", "id": 1}"#).is_err());
        assert!(single(r#"{"jsonrpc": "2.0", "id": 1}"#).is_err());
        assert!(single(r#"{"jsonrpc": "2.0", "method": "m", "params": "bar", "id": 1}"#).is_err());
        assert!(single(r#"{"jsonrpc": "2.0", "method": "m", "params": null, "id": 1}"#).is_err());

        let err = single(r#"{"jsonrpc": "2.0", "method": "m", "id": [1]}"#).unwrap_err();
        assert_eq!(err.id, RequestId::Null);

        let err = single(r#""just a string""#).unwrap_err();
        assert_eq!(err.id, RequestId::Null);
    }

    #[test]
    fn test_batch_isolates_elements() {
        let ParsedMessage::Batch(elements) = parse_message(
            r#"[{"jsonrpc": "2.0", "method": "a", "id": 1}, 1, {"jsonrpc": "2.0", "id": 3}]"#,
        ) else {
            panic!("expected a batch");
        };
        assert_eq!(elements.len(), 3);
        assert!(elements[0].is_ok());
        assert_eq!(elements[1].as_ref().unwrap_err().id, RequestId::Null);
        assert_eq!(elements[2].as_ref().unwrap_err().id, RequestId::from(3));
    }

    #[test]
    fn test_batch_limit() {
        let parser = EnvelopeParser::new(&ServiceConfig::default().with_max_batch_size(Some(1)));
        let parsed = parser.parse(
            r#"[{"jsonrpc": "2.0", "method": "a", "id": 1}, {"jsonrpc": "2.0", "method": "a", "id": 2}]"#,
        );
        assert!(matches!(parsed, ParsedMessage::Rejected(_)));
    }
}
