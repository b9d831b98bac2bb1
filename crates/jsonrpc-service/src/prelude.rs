//! # JSON-RPC Service Prelude
//!
//! Re-exports of the types most method implementations and transports need.
//!
//! ```rust
//! use jsonrpc_service::prelude::*;
//! ```

pub use crate::binder::CallArgs;
pub use crate::config::ServiceConfig;
pub use crate::dispatcher::{CallContext, RpcMethod};
pub use crate::error::{JsonRpcErrorObject, MethodError, ServiceError};
pub use crate::registry::RegisterOptions;
pub use crate::response::JsonRpcMessageResult;
pub use crate::service::JsonRpcService;
pub use crate::signature::{ParamSpec, Signature};
pub use crate::types::{JsonRpcVersion, RequestId};
pub use crate::validation::{Constraint, ParamValidation};

// Standard error codes
pub use crate::error_codes::*;
