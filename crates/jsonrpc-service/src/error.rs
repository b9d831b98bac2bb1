use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

use crate::error_codes;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
        }
    }

    /// Build a server error code, rejecting values outside -32099..=-32000.
    pub fn server(code: i64) -> Result<Self, ServiceError> {
        if (error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END).contains(&code) {
            Ok(JsonRpcErrorCode::ServerError(code))
        } else {
            Err(ServiceError::InvalidServerErrorCode(code))
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Wraps a human readable failure description the way every error `data`
/// payload in this crate is shaped.
pub fn details(message: impl fmt::Display) -> Value {
    json!({ "details": message.to_string() })
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            None,
        )
    }

    /// Invalid params with the failure description carried in `data`.
    pub fn invalid_params(detail: impl fmt::Display) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, None, Some(details(detail)))
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, None, data)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

/// Configuration-time failures of the service API.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Duplicate method name for JSON-RPC service: '{0}'")]
    DuplicateMethod(String),

    #[error("Invalid parameter validation spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid server error code {0}; must be in the range -32099 to -32000")]
    InvalidServerErrorCode(i64),
}

/// Failure raised by a registered method.
///
/// Converted into an error object by the dispatcher. Without an explicit
/// code it becomes a generic server error (-32000).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MethodError {
    code: Option<JsonRpcErrorCode>,
    message: String,
    data: Option<Value>,
}

impl MethodError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    /// Failure with an implementation-defined server error code.
    pub fn with_code(code: i64, message: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            code: Some(JsonRpcErrorCode::server(code)?),
            message: message.into(),
            data: None,
        })
    }

    /// The method rejected its arguments after being invoked.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: Some(JsonRpcErrorCode::InvalidParams),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> Option<JsonRpcErrorCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert into the wire error object for a call to `method`.
    ///
    /// `data` always carries `details`; server errors add `method`. A payload
    /// attached with [`MethodError::with_data`] is nested under `data`.
    pub fn to_error_object(&self, method: &str) -> JsonRpcErrorObject {
        let (code, mut data) = match self.code {
            Some(JsonRpcErrorCode::InvalidParams) => {
                (JsonRpcErrorCode::InvalidParams, details(&self.message))
            }
            code => (
                code.unwrap_or(JsonRpcErrorCode::ServerError(error_codes::SERVER_ERROR_END)),
                json!({ "method": method, "details": self.message }),
            ),
        };

        if let (Some(payload), Value::Object(fields)) = (&self.data, &mut data) {
            fields.insert("data".to_string(), payload.clone());
        }
        JsonRpcErrorObject::new(code, None, Some(data))
    }
}

impl From<serde_json::Error> for MethodError {
    fn from(err: serde_json::Error) -> Self {
        MethodError::invalid_params(err.to_string())
    }
}
