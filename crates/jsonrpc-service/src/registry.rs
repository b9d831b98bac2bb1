//! Method registry shared between configuration code and dispatch.
//!
//! Entries are immutable once built; re-registering a name swaps the whole
//! entry under a write lock, so readers never observe a partial entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::dispatcher::RpcMethod;
use crate::error::ServiceError;
use crate::signature::Signature;
use crate::validation::{Constraint, ParamValidation};

/// Registration options for a method.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    signature: Signature,
    validation: ParamValidation,
    metadata: HashMap<String, Value>,
    strict: bool,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn validation(mut self, validation: ParamValidation) -> Self {
        self.validation = validation;
        self
    }

    /// Read the validation spec from its JSON form.
    pub fn validation_spec(self, spec: &Value) -> Result<Self, ServiceError> {
        Ok(self.validation(ParamValidation::from_value(spec)?))
    }

    /// Validate the params value as a whole against one JSON Schema.
    pub fn params_schema(self, schema: Value) -> Result<Self, ServiceError> {
        Ok(self.validation(ParamValidation::Whole(Constraint::schema(schema)?)))
    }

    /// Default metadata handed to the method on every call.
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Fail instead of replacing an existing method of the same name.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// A registered method: handler plus calling convention.
pub struct MethodEntry {
    name: String,
    handler: Arc<dyn RpcMethod>,
    signature: Signature,
    validation: ParamValidation,
    metadata: HashMap<String, Value>,
}

impl MethodEntry {
    pub fn new<H>(
        name: impl Into<String>,
        handler: H,
        options: RegisterOptions,
    ) -> Result<Self, ServiceError>
    where
        H: RpcMethod + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(ServiceError::InvalidSpec("method name must not be empty".to_string()));
        }
        options.signature.check()?;
        options.validation.check_against(&options.signature)?;

        Ok(Self {
            name,
            handler: Arc::new(handler),
            signature: options.signature,
            validation: options.validation,
            metadata: options.metadata,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &Arc<dyn RpcMethod> {
        &self.handler
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn validation(&self) -> &ParamValidation {
        &self.validation
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("validation", &self.validation)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Name to method mapping.
#[derive(Default)]
pub struct MethodRegistry {
    methods: RwLock<HashMap<String, Arc<MethodEntry>>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`. Replaces an existing entry unless
    /// the options ask for strict registration.
    pub fn register<H>(
        &self,
        name: impl Into<String>,
        handler: H,
        options: RegisterOptions,
    ) -> Result<(), ServiceError>
    where
        H: RpcMethod + 'static,
    {
        let strict = options.is_strict();
        let entry = MethodEntry::new(name, handler, options)?;
        self.insert(entry, strict)
    }

    /// Insert a prebuilt entry.
    pub fn insert(&self, entry: MethodEntry, strict: bool) -> Result<(), ServiceError> {
        let mut methods = self.methods.write();
        if strict && methods.contains_key(entry.name()) {
            return Err(ServiceError::DuplicateMethod(entry.name().to_string()));
        }

        let name = entry.name().to_string();
        if methods.insert(name.clone(), Arc::new(entry)).is_some() {
            info!("Replaced JSON-RPC method '{}'", name);
        } else {
            info!("Registered JSON-RPC method '{}'", name);
        }
        Ok(())
    }

    /// Remove a method. Returns the removed entry, if there was one.
    pub fn unregister(&self, name: &str) -> Option<Arc<MethodEntry>> {
        let removed = self.methods.write().remove(name);
        if removed.is_some() {
            info!("Unregistered JSON-RPC method '{}'", name);
        } else {
            debug!("Unregister of unknown JSON-RPC method '{}' ignored", name);
        }
        removed
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<MethodEntry>> {
        self.methods.read().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.methods.read().contains_key(name)
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.methods.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.read().is_empty()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}
