//! The request/response entry point consumed by transports.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use serde_json::Value;
use tracing::debug;

use crate::binder::CallArgs;
use crate::config::ServiceConfig;
use crate::dispatcher::{CallContext, Dispatcher, FunctionHandler, RpcMethod, SyncHandler};
use crate::error::{MethodError, ServiceError};
use crate::parser::{EnvelopeError, EnvelopeParser, ParsedMessage};
use crate::registry::{MethodEntry, MethodRegistry, RegisterOptions};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessageResult, JsonRpcResponse};

/// A JSON-RPC service: a method registry plus the processing pipeline.
///
/// Cloning is cheap and clones share the registry.
#[derive(Debug, Clone)]
pub struct JsonRpcService {
    config: ServiceConfig,
    parser: EnvelopeParser,
    dispatcher: Dispatcher,
}

impl Default for JsonRpcService {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRpcService {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        Self::with_registry(Arc::new(MethodRegistry::new()), config)
    }

    /// Build a service around an existing, possibly shared, registry.
    pub fn with_registry(registry: Arc<MethodRegistry>, config: ServiceConfig) -> Self {
        let dispatcher =
            Dispatcher::new(registry).with_exposed_methods(config.expose_methods_on_not_found);
        Self {
            parser: EnvelopeParser::new(&config),
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        self.dispatcher.registry()
    }

    /// Register a method. Strict when either the options or the service
    /// configuration ask for it.
    pub fn register<H>(
        &self,
        name: impl Into<String>,
        handler: H,
        options: RegisterOptions,
    ) -> Result<(), ServiceError>
    where
        H: RpcMethod + 'static,
    {
        let strict = options.is_strict() || self.config.strict_registration;
        let entry = MethodEntry::new(name, handler, options)?;
        self.registry().insert(entry, strict)
    }

    /// Register a synchronous closure.
    pub fn register_fn<F>(
        &self,
        name: impl Into<String>,
        handler_fn: F,
        options: RegisterOptions,
    ) -> Result<(), ServiceError>
    where
        F: Fn(CallArgs, &CallContext) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.register(name, SyncHandler::new(handler_fn), options)
    }

    /// Register a closure returning a boxed future.
    pub fn register_async<F>(
        &self,
        name: impl Into<String>,
        handler_fn: F,
        options: RegisterOptions,
    ) -> Result<(), ServiceError>
    where
        F: Fn(CallArgs, CallContext) -> BoxFuture<'static, Result<Value, MethodError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, FunctionHandler::new(handler_fn), options)
    }

    /// Remove a method; a no-op when the name is not registered.
    pub fn unregister(&self, name: &str) {
        self.registry().unregister(name);
    }

    /// Process a raw payload. Returns `None` when nothing should be sent
    /// back (a notification, or a batch made only of notifications).
    pub async fn process_message(&self, raw: &str) -> Option<String> {
        self.process_message_with_metadata(raw, &HashMap::new()).await
    }

    /// Like [`process_message`](Self::process_message), passing call-time
    /// metadata to every method invoked for this payload.
    pub async fn process_message_with_metadata(
        &self,
        raw: &str,
        metadata: &HashMap<String, Value>,
    ) -> Option<String> {
        let parsed = self.parser.parse(raw);
        self.handle_parsed(parsed, metadata).await.to_json_string()
    }

    /// Blocking variant for synchronous transports.
    ///
    /// Drives the pipeline on the current thread. Methods that need a
    /// specific async runtime must not be called this way from inside that
    /// runtime.
    pub fn process_message_blocking(&self, raw: &str) -> Option<String> {
        futures::executor::block_on(self.process_message(raw))
    }

    /// Process an already decoded payload and return structured responses.
    pub async fn process_value(
        &self,
        value: Value,
        metadata: &HashMap<String, Value>,
    ) -> JsonRpcMessageResult {
        let parsed = self.parser.parse_value(value);
        self.handle_parsed(parsed, metadata).await
    }

    async fn handle_parsed(
        &self,
        parsed: ParsedMessage,
        metadata: &HashMap<String, Value>,
    ) -> JsonRpcMessageResult {
        match parsed {
            ParsedMessage::Rejected(response) => JsonRpcMessageResult::Single(response),
            ParsedMessage::Single(element) => match self.handle_element(element, metadata).await {
                Some(response) => JsonRpcMessageResult::Single(response),
                None => JsonRpcMessageResult::NoResponse,
            },
            ParsedMessage::Batch(elements) => {
                debug!("Processing JSON-RPC batch of {} elements", elements.len());
                let responses = if self.config.concurrent_batches {
                    // join_all yields outputs in input order
                    future::join_all(
                        elements
                            .into_iter()
                            .map(|element| self.handle_element(element, metadata)),
                    )
                    .await
                } else {
                    let mut responses = Vec::with_capacity(elements.len());
                    for element in elements {
                        responses.push(self.handle_element(element, metadata).await);
                    }
                    responses
                };
                JsonRpcMessageResult::from_batch(responses.into_iter().flatten().collect())
            }
        }
    }

    async fn handle_element(
        &self,
        element: Result<JsonRpcRequest, EnvelopeError>,
        metadata: &HashMap<String, Value>,
    ) -> Option<JsonRpcResponse> {
        match element {
            Ok(request) => self.handle_request(request, metadata).await,
            Err(envelope_error) => Some(envelope_error.into_response()),
        }
    }

    /// Dispatch a parsed request and assemble its response, if any.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        metadata: &HashMap<String, Value>,
    ) -> Option<JsonRpcResponse> {
        let version = request.version;
        let id = request.id.clone();
        let outcome = self.dispatcher.dispatch(request, metadata).await;
        JsonRpcResponse::for_call(version, id, outcome)
    }
}
