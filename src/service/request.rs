//! A2A service request types

use std::{collections::HashMap, time::Duration};

use crate::{codec::RequestId, protocol::operation::A2AOperation};

/// A request to the A2A service
///
/// This wraps an A2A operation with the correlation id of its envelope and
/// the context needed for execution.
#[derive(Debug, Clone)]
pub struct A2ARequest {
    /// The A2A operation to execute
    pub operation: A2AOperation,

    /// Correlation id of the JSON-RPC envelope
    pub request_id: RequestId,

    /// Request context (timeouts, metadata)
    pub context: RequestContext,
}

impl A2ARequest {
    /// Create a new A2A request with a freshly generated correlation id
    pub fn new(operation: A2AOperation, context: RequestContext) -> Self {
        Self {
            operation,
            request_id: RequestId::generate(),
            context,
        }
    }

    /// Use a caller-chosen correlation id
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Request context containing metadata and configuration
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Endpoint URL of the target agent
    pub agent_url: String,

    /// Deadline for unary exchanges
    pub timeout: Option<Duration>,

    /// Additional metadata headers
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
            timeout: Some(Duration::from_secs(30)),
            metadata: HashMap::new(),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a metadata header
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("")
    }
}
