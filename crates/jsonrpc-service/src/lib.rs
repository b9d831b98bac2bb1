//! # JSON-RPC Service
//!
//! A transport-agnostic JSON-RPC request processor. Register methods with a
//! calling convention and optional parameter validation, then hand raw
//! payloads to [`JsonRpcService::process_message`] and send back whatever it
//! returns. Sockets, framing and connection handling belong to the caller.
//!
//! ## Features
//! - JSON-RPC 2.0 with 1.1 interoperability (1.0 class hinting is rejected)
//! - Single requests, notifications and batches with per-element isolation
//! - Positional and named argument binding against a declared signature
//! - Optional JSON Schema parameter validation, plus external validators
//! - Every failure converted to a JSON-RPC error object
//!
//! ```rust
//! use jsonrpc_service::prelude::*;
//! use serde_json::json;
//!
//! let service = JsonRpcService::new();
//! service
//!     .register_fn(
//!         "add",
//!         |args, _ctx| {
//!             let (a, b): (i64, i64) = args.parse()?;
//!             Ok(json!(a + b))
//!         },
//!         RegisterOptions::new().signature(Signature::arity(2)),
//!     )
//!     .unwrap();
//!
//! let reply = service.process_message_blocking(
//!     r#"{"jsonrpc": "2.0", "method": "add", "params": [2, 3], "id": 1}"#,
//! );
//! assert_eq!(reply.as_deref(), Some(r#"{"jsonrpc":"2.0","result":5,"id":1}"#));
//! ```

pub mod binder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod parser;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod service;
pub mod signature;
pub mod types;
pub mod validation;

// Re-export main types
pub use binder::CallArgs;
pub use config::ServiceConfig;
pub use dispatcher::{CallContext, Dispatcher, FunctionHandler, RpcMethod, SyncHandler};
pub use error::{JsonRpcErrorCode, JsonRpcErrorObject, MethodError, ServiceError};
pub use parser::{EnvelopeError, EnvelopeParser, ParsedMessage, parse_message};
pub use registry::{MethodEntry, MethodRegistry, RegisterOptions};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessageResult, JsonRpcResponse, ResponseOutcome};
pub use service::JsonRpcService;
pub use signature::{ParamSpec, Signature};
pub use types::{JsonRpcVersion, RequestId};
pub use validation::{Constraint, ParamValidation, ParamValidator, SchemaConstraint};

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
