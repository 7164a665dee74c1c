//! Client configuration

use std::time::Duration;

/// Configuration for an A2A client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint URL of the agent
    pub agent_url: String,

    /// Deadline of unary requests; streams are not bounded
    pub timeout: Duration,

    /// Retry attempts when fetching the agent card
    pub max_retries: u32,

    /// Enable request and response validation
    pub validate_responses: bool,

    /// Events buffered between the network and a slow subscriber
    pub stream_buffer: usize,

    /// Streaming support advertised by the agent card, if known
    pub streaming: Option<bool>,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            validate_responses: true,
            stream_buffer: 64,
            streaming: None,
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Enable or disable validation
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_responses = enabled;
        self
    }

    /// Set the subscription buffer size (at least one event)
    pub fn with_stream_buffer(mut self, events: usize) -> Self {
        self.stream_buffer = events.max(1);
        self
    }

    /// Record whether the agent advertises streaming
    pub fn with_streaming(mut self, supported: Option<bool>) -> Self {
        self.streaming = supported;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}
