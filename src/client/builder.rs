//! Client builder for constructing A2A clients with composable layers

use std::{sync::Arc, time::Duration};

use tower::ServiceBuilder;
use url::Url;

use crate::{
    client::{AgentClient, ClientConfig},
    codec::{Codec, JsonRpcCodec},
    layer::{A2AValidationLayer, A2AValidationService},
    protocol::{
        agent::AgentCard,
        error::{A2AError, A2AResult},
    },
    service::A2AProtocolService,
    transport::{HttpTransport, Transport, WebSocketTransport},
};

/// Client type produced by [`A2AClientBuilder::build`]
pub type A2AClient<T> = AgentClient<A2AValidationService<A2AProtocolService<T>>>;

/// Builder for constructing A2A clients
///
/// This builder provides a fluent API for configuring and building an A2A client
/// with customizable transport, codec, timeouts, and validation.
///
/// # Example
///
/// ```rust,no_run
/// use a2a_relay::prelude::*;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let url = "https://agent.example.com".parse().unwrap();
/// let mut client = A2AClientBuilder::new_http(url)
///     .with_timeout(Duration::from_secs(60))
///     .build()?;
///
/// let agent_card = client.discover().await?;
/// println!("Connected to: {}", agent_card.name);
/// # Ok(())
/// # }
/// ```
///
/// # Compiler Error
/// This will fail to compile if it is not clear to the compiler which type
/// implementing `Transport` is being used as underlying transport. This is
/// expected behaviour.
///
/// ```compile_fail
/// let client = A2AClientBuilder::new(agent_url()).build();
/// ```
pub struct A2AClientBuilder<T: Transport> {
    agent_url: Url,
    transport: Option<T>,
    codec: Option<Arc<dyn Codec>>,
    timeout: Duration,
    max_retries: u32,
    validate_responses: bool,
    stream_buffer: Option<usize>,
    streaming: Option<bool>,
}

impl<T: Transport> A2AClientBuilder<T> {
    /// Start a builder for the agent at `agent_url`; a transport must be supplied
    pub fn new(agent_url: Url) -> Self {
        Self {
            agent_url,
            transport: None,
            codec: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            validate_responses: true,
            stream_buffer: None,
            streaming: None,
        }
    }

    /// Use a custom transport
    ///
    /// # Arguments
    ///
    /// * `transport` - The transport implementation to use
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom codec
    ///
    /// # Arguments
    ///
    /// * `codec` - The codec implementation to use
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the deadline of unary requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retry attempts for card discovery
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Maximum number of retries (default: 3)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Enable or disable request and response validation
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether to validate (default: true)
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_responses = enabled;
        self
    }

    /// Events buffered for a subscriber that falls behind
    pub fn with_stream_buffer(mut self, events: usize) -> Self {
        self.stream_buffer = Some(events);
        self
    }

    /// Declare whether the agent streams, usually taken from its card
    pub fn with_streaming(mut self, supported: bool) -> Self {
        self.streaming = Some(supported);
        self
    }

    /// Build the A2A client
    ///
    /// This assembles the validation layer over the protocol service and
    /// returns a configured client.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport has been configured
    pub fn build(self) -> Result<A2AClient<T>, A2AError> {
        let transport = self.transport.ok_or_else(|| {
            A2AError::Protocol(
                "Transport not configured. Call new_http() or with_transport()".into(),
            )
        })?;

        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonRpcCodec));

        let validation = if self.validate_responses {
            A2AValidationLayer::new()
        } else {
            A2AValidationLayer::disabled()
        };
        let service = ServiceBuilder::new()
            .layer(validation)
            .service(A2AProtocolService::new(transport, codec));

        let mut config = ClientConfig::new(self.agent_url)
            .with_timeout(self.timeout)
            .with_max_retries(self.max_retries)
            .with_validation(self.validate_responses)
            .with_streaming(self.streaming);
        if let Some(events) = self.stream_buffer {
            config = config.with_stream_buffer(events);
        }

        Ok(AgentClient::new(service, config))
    }
}

impl A2AClientBuilder<HttpTransport> {
    /// Create a new client builder with HTTP transport
    ///
    /// # Arguments
    ///
    /// * `agent_url` - The endpoint URL of the agent (e.g., "<https://agent.example.com>")
    pub fn new_http(agent_url: Url) -> Self {
        let transport = HttpTransport::new(agent_url.clone());
        Self::new(agent_url).with_transport(transport)
    }

    /// Builder for the agent described by `card`
    ///
    /// `discovered_from` is the base URL the card was fetched from. The
    /// card's streaming capability decides whether streaming calls are
    /// attempted at all.
    pub fn for_card(card: &AgentCard, discovered_from: &Url) -> A2AResult<Self> {
        let endpoint = card.endpoint(discovered_from)?;
        Ok(Self::new_http(endpoint).with_streaming(card.capabilities.streaming))
    }
}

impl A2AClientBuilder<WebSocketTransport> {
    /// Create a new client builder talking JSON-RPC over one WebSocket
    pub fn new_websocket(agent_url: Url) -> Self {
        let transport = WebSocketTransport::new(agent_url.clone());
        Self::new(agent_url).with_transport(transport)
    }
}

#[cfg(test)]
mod tests {
    use crate::{protocol::agent::AgentCapabilities, transport::mock::MockTransport};

    use super::*;

    fn agent_url() -> Url {
        "https://example.com".parse().unwrap()
    }

    #[test]
    fn test_builder_with_http() {
        let client = A2AClientBuilder::new_http(agent_url()).build();

        assert!(client.is_ok());
    }

    #[test]
    fn test_builder_with_mock_transport() {
        let client = A2AClientBuilder::new(agent_url())
            .with_transport(MockTransport::ok())
            .with_codec(Arc::new(JsonRpcCodec))
            .build();

        assert!(client.is_ok());
    }

    #[test]
    fn test_builder_without_transport() {
        let client = A2AClientBuilder::<MockTransport>::new(agent_url()).build();

        assert!(matches!(client, Err(A2AError::Protocol(_))));
    }

    #[test]
    fn test_builder_all_options() {
        let client = A2AClientBuilder::new_http(agent_url())
            .with_timeout(Duration::from_secs(45))
            .with_max_retries(5)
            .with_validation(false)
            .with_stream_buffer(8)
            .build()
            .unwrap();

        let config = client.config();
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.max_retries, 5);
        assert!(!config.validate_responses);
        assert_eq!(config.stream_buffer, 8);
        assert_eq!(config.streaming, None);
    }

    #[test]
    fn test_builder_for_card() {
        let card = AgentCard::new("Echo", "", "http://localhost:10000/")
            .with_capabilities(AgentCapabilities::default().with_streaming());
        let discovered_from: Url = "http://agents.internal:10000/".parse().unwrap();

        let client = A2AClientBuilder::for_card(&card, &discovered_from)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(client.config().agent_url, "http://agents.internal:10000/");
        assert_eq!(client.config().streaming, Some(true));
    }

    #[test]
    fn test_builder_with_websocket() {
        let url: Url = "ws://localhost:9000".parse().unwrap();
        assert!(A2AClientBuilder::new_websocket(url).build().is_ok());
    }
}
