use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::error;

use crate::error::JsonRpcErrorObject;
use crate::types::{JsonRpcVersion, RequestId};

/// Outcome carried by a response: exactly one of result or error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Method return value. `Value::Null` is a valid result.
    Result(Value),
    Error(JsonRpcErrorObject),
}

/// A single JSON-RPC response.
///
/// Serializes as `{"jsonrpc":"2.0", ...}` for 2.0 requests and
/// `{"version":"1.1", ...}` for 1.1 requests; the result/error/id members
/// are shaped the same for both.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    pub fn success(version: JsonRpcVersion, id: RequestId, result: Value) -> Self {
        Self {
            version,
            id,
            outcome: ResponseOutcome::Result(result),
        }
    }

    pub fn error(version: JsonRpcVersion, id: RequestId, error: JsonRpcErrorObject) -> Self {
        Self {
            version,
            id,
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// Response for a dispatched call. Notifications (no id) get none,
    /// whether the call succeeded or not.
    pub fn for_call(
        version: JsonRpcVersion,
        id: Option<RequestId>,
        outcome: Result<Value, JsonRpcErrorObject>,
    ) -> Option<Self> {
        let id = id?;
        Some(match outcome {
            Ok(result) => Self::success(version, id, result),
            Err(error) => Self::error(version, id, error),
        })
    }

    /// Top-level error for a payload that could not be read far enough to
    /// learn its id or version.
    pub fn unattributed(error: JsonRpcErrorObject) -> Self {
        Self::error(JsonRpcVersion::V2_0, RequestId::Null, error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match &self.outcome {
            ResponseOutcome::Error(error) => Some(error),
            ResponseOutcome::Result(_) => None,
        }
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(self.version.field_name(), self.version.as_str())?;
        match &self.outcome {
            ResponseOutcome::Result(value) => map.serialize_entry("result", value)?,
            ResponseOutcome::Error(error) => map.serialize_entry("error", error)?,
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

/// Everything a processed payload can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessageResult {
    /// Response to a single request (or a top-level envelope error)
    Single(JsonRpcResponse),
    /// Responses to a batch, in input order
    Batch(Vec<JsonRpcResponse>),
    /// No response needed (notifications only)
    NoResponse,
}

impl JsonRpcMessageResult {
    /// Aggregate batch element responses. A batch of only notifications
    /// produces no response at all rather than an empty array.
    pub fn from_batch(responses: Vec<JsonRpcResponse>) -> Self {
        if responses.is_empty() {
            JsonRpcMessageResult::NoResponse
        } else {
            JsonRpcMessageResult::Batch(responses)
        }
    }

    /// Convert to JSON string if there's a response to send
    pub fn to_json_string(&self) -> Option<String> {
        let rendered = match self {
            JsonRpcMessageResult::Single(response) => serde_json::to_string(response),
            JsonRpcMessageResult::Batch(responses) => serde_json::to_string(responses),
            JsonRpcMessageResult::NoResponse => return None,
        };
        match rendered {
            Ok(json) => Some(json),
            Err(err) => {
                error!("Failed to serialize JSON-RPC response: {}", err);
                render_internal_error()
            }
        }
    }

    pub fn to_value(&self) -> Option<Value> {
        self.to_json_string()
            .and_then(|json| serde_json::from_str(&json).ok())
    }

    /// Check if this result needs a response
    pub fn needs_response(&self) -> bool {
        !matches!(self, JsonRpcMessageResult::NoResponse)
    }

    /// All responses carried, in output order.
    pub fn responses(&self) -> &[JsonRpcResponse] {
        match self {
            JsonRpcMessageResult::Single(response) => std::slice::from_ref(response),
            JsonRpcMessageResult::Batch(responses) => responses,
            JsonRpcMessageResult::NoResponse => &[],
        }
    }
}

/// Sent in place of a response that cannot be rendered as text.
fn render_internal_error() -> Option<String> {
    let response = JsonRpcResponse::unattributed(JsonRpcErrorObject::internal_error(None));
    serde_json::to_string(&response).ok()
}
