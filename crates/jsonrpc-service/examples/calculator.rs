//! Calculator JSON-RPC Example
//!
//! Registers a few arithmetic methods and feeds the service a series of
//! raw payloads: named and positional calls, a notification, a batch, and
//! several failing requests.

use async_trait::async_trait;
use jsonrpc_service::prelude::*;
use serde_json::{Value, json};
use tracing::info;

/// Division implemented as a full `RpcMethod` instead of a closure
struct DivideMethod;

#[async_trait]
impl RpcMethod for DivideMethod {
    async fn call(&self, args: CallArgs, context: CallContext) -> Result<Value, MethodError> {
        let dividend: f64 = args.require(0, "dividend")?;
        let divisor: f64 = args.require(1, "divisor")?;

        if divisor == 0.0 {
            let error = MethodError::with_code(-32010, "division by zero")
                .map_err(|err| MethodError::new(err.to_string()))?;
            return Err(error.with_data(json!({"dividend": dividend})));
        }

        if let Some(user) = context.metadata.get("user") {
            info!("{} dividing {} by {}", user, dividend, divisor);
        }
        Ok(json!(dividend / divisor))
    }
}

fn build_service() -> Result<JsonRpcService, ServiceError> {
    let service = JsonRpcService::with_config(
        ServiceConfig::default()
            .with_strict_registration(true)
            .with_expose_methods_on_not_found(true),
    );

    service.register_fn(
        "add",
        |args, _ctx| {
            let a: f64 = args.require(0, "a")?;
            let b: f64 = args.require(1, "b")?;
            Ok(json!(a + b))
        },
        RegisterOptions::new()
            .signature(Signature::required_names(["a", "b"]))
            .validation_spec(&json!({
                "a": {"type": "number"},
                "b": {"type": "number", "minimum": -1000, "maximum": 1000}
            }))?,
    )?;

    service.register_fn(
        "subtract",
        |args, _ctx| {
            let a: f64 = args.require(0, "a")?;
            let b: f64 = args.require(1, "b")?;
            Ok(json!(a - b))
        },
        RegisterOptions::new()
            .signature(Signature::required_names(["a", "b"]))
            .validation_spec(&json!(["number", "number"]))?,
    )?;

    service.register(
        "divide",
        DivideMethod,
        RegisterOptions::new()
            .signature(Signature::required_names(["dividend", "divisor"]))
            .metadata("user", json!("calculator-example")),
    )?;

    service.register_fn(
        "log",
        |args, ctx| {
            info!("log notification={} args={}", ctx.is_notification(), args.to_value());
            Ok(Value::Null)
        },
        RegisterOptions::new(),
    )?;

    Ok(service)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jsonrpc_service=debug".into()),
        )
        .init();

    info!("Calculator JSON-RPC example");
    let service = build_service()?;
    info!("Registered methods: {}", service.registry().method_names().join(", "));

    let test_requests = [
        r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": 5, "b": 3}, "id": 1}"#,
        r#"{"jsonrpc": "2.0", "method": "subtract", "params": [10, 4], "id": 2}"#,
        r#"{"jsonrpc": "2.0", "method": "divide", "params": [1, 4], "id": "three"}"#,
        r#"{"jsonrpc": "2.0", "method": "log", "params": ["notification"]}"#,
        r#"[{"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 5},
            {"jsonrpc": "2.0", "method": "log", "params": ["in a batch"]},
            {"jsonrpc": "2.0", "method": "multiply", "params": [2, 3], "id": 6}]"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": "invalid", "b": 5}, "id": 7}"#,
        r#"{"jsonrpc": "2.0", "method": "divide", "params": [1, 0], "id": 8}"#,
        r#"{"version": "1.1", "method": "subtract", "params": [3, 1], "id": 9}"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": [1, 2"#,
        r#"[]"#,
    ];

    for (i, request_json) in test_requests.iter().enumerate() {
        info!("Test {}: request {}", i + 1, request_json);
        match service.process_message(request_json).await {
            Some(response) => info!("Test {}: response {}", i + 1, response),
            None => info!("Test {}: no response (notification)", i + 1),
        }
    }

    Ok(())
}
