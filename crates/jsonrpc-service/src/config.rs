use serde::{Deserialize, Serialize};

/// Configuration for a [`JsonRpcService`](crate::JsonRpcService)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Reject registration of a name that is already taken instead of
    /// replacing the existing method
    pub strict_registration: bool,
    /// Accept JSON-RPC 1.1 envelopes next to 2.0 ones
    pub allow_v1_1: bool,
    /// Largest accepted batch; `None` means unlimited
    pub max_batch_size: Option<usize>,
    /// Drive the elements of a batch concurrently
    pub concurrent_batches: bool,
    /// List registered method names in method-not-found errors
    pub expose_methods_on_not_found: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            strict_registration: false,
            allow_v1_1: true,
            max_batch_size: None,
            concurrent_batches: true,
            expose_methods_on_not_found: false,
        }
    }
}

impl ServiceConfig {
    pub fn with_strict_registration(mut self, strict: bool) -> Self {
        self.strict_registration = strict;
        self
    }

    pub fn with_allow_v1_1(mut self, allow: bool) -> Self {
        self.allow_v1_1 = allow;
        self
    }

    pub fn with_max_batch_size(mut self, limit: Option<usize>) -> Self {
        self.max_batch_size = limit;
        self
    }

    pub fn with_concurrent_batches(mut self, concurrent: bool) -> Self {
        self.concurrent_batches = concurrent;
        self
    }

    pub fn with_expose_methods_on_not_found(mut self, expose: bool) -> Self {
        self.expose_methods_on_not_found = expose;
        self
    }
}
