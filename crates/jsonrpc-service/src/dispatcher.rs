use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::binder::{self, CallArgs};
use crate::error::{JsonRpcErrorObject, MethodError};
use crate::registry::{MethodEntry, MethodRegistry};
use crate::request::JsonRpcRequest;
use crate::types::{JsonRpcVersion, RequestId};

/// Per-call context handed to a method next to its arguments.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Name the method was invoked under
    pub method: String,
    /// Id of the originating request; `None` for notifications
    pub request_id: Option<RequestId>,
    pub version: JsonRpcVersion,
    /// Registered metadata defaults overlaid with call-time metadata
    pub metadata: HashMap<String, Value>,
}

impl CallContext {
    pub fn is_notification(&self) -> bool {
        self.request_id.is_none()
    }
}

/// Trait for registered JSON-RPC methods
#[async_trait]
pub trait RpcMethod: Send + Sync {
    /// Run the method. Failures are domain errors; the dispatcher turns
    /// them into JSON-RPC error objects.
    async fn call(&self, args: CallArgs, context: CallContext) -> Result<Value, MethodError>;
}

/// Async function-based method
pub struct FunctionHandler<F>
where
    F: Fn(CallArgs, CallContext) -> BoxFuture<'static, Result<Value, MethodError>> + Send + Sync,
{
    handler_fn: F,
}

impl<F> FunctionHandler<F>
where
    F: Fn(CallArgs, CallContext) -> BoxFuture<'static, Result<Value, MethodError>> + Send + Sync,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

#[async_trait]
impl<F> RpcMethod for FunctionHandler<F>
where
    F: Fn(CallArgs, CallContext) -> BoxFuture<'static, Result<Value, MethodError>> + Send + Sync,
{
    async fn call(&self, args: CallArgs, context: CallContext) -> Result<Value, MethodError> {
        (self.handler_fn)(args, context).await
    }
}

/// Synchronous function-based method
pub struct SyncHandler<F>
where
    F: Fn(CallArgs, &CallContext) -> Result<Value, MethodError> + Send + Sync,
{
    handler_fn: F,
}

impl<F> SyncHandler<F>
where
    F: Fn(CallArgs, &CallContext) -> Result<Value, MethodError> + Send + Sync,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

#[async_trait]
impl<F> RpcMethod for SyncHandler<F>
where
    F: Fn(CallArgs, &CallContext) -> Result<Value, MethodError> + Send + Sync,
{
    async fn call(&self, args: CallArgs, context: CallContext) -> Result<Value, MethodError> {
        (self.handler_fn)(args, &context)
    }
}

/// Looks up, binds and invokes methods from a shared registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    expose_methods_on_not_found: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<MethodRegistry>) -> Self {
        Self {
            registry,
            expose_methods_on_not_found: false,
        }
    }

    /// Attach the sorted list of registered names to method-not-found errors.
    pub fn with_exposed_methods(mut self, expose: bool) -> Self {
        self.expose_methods_on_not_found = expose;
        self
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Run one request to completion.
    ///
    /// `metadata` is call-time context merged over the entry's registered
    /// metadata. Every failure comes back as an error object.
    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        metadata: &HashMap<String, Value>,
    ) -> Result<Value, JsonRpcErrorObject> {
        let Some(entry) = self.registry.lookup(&request.method) else {
            debug!("JSON-RPC method '{}' not found", request.method);
            let mut error = JsonRpcErrorObject::method_not_found(&request.method);
            if self.expose_methods_on_not_found {
                let available = self.registry.method_names();
                error = error.with_data(json!({ "available_methods": available }));
            }
            return Err(error);
        };

        let args = binder::bind(&entry, request.params)?;

        let mut call_metadata = entry.metadata().clone();
        call_metadata.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        let context = CallContext {
            method: request.method,
            request_id: request.id,
            version: request.version,
            metadata: call_metadata,
        };

        invoke(&entry, args, context).await
    }
}

/// Invoke a bound call, converting method failures and panics.
pub async fn invoke(
    entry: &MethodEntry,
    args: CallArgs,
    context: CallContext,
) -> Result<Value, JsonRpcErrorObject> {
    if args.is_empty() {
        if let Some(required) = entry.signature().required_count().filter(|n| *n > 0) {
            return Err(JsonRpcErrorObject::invalid_params(format!(
                "method '{}' requires {} parameters, none supplied",
                entry.name(),
                required
            )));
        }
    }

    debug!(
        method = entry.name(),
        id = ?context.request_id,
        "Dispatching JSON-RPC call"
    );

    let outcome = AssertUnwindSafe(entry.handler().call(args, context))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(method_error)) => {
            warn!("Method {} failed: {}", entry.name(), method_error);
            Err(method_error.to_error_object(entry.name()))
        }
        Err(panic) => {
            let details = panic_message(panic.as_ref());
            error!("Method {} panicked: {}", entry.name(), details);
            Err(MethodError::new(details).to_error_object(entry.name()))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "method panicked".to_string()
    }
}
