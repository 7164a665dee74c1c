use std::{
    sync::Arc,
    task::{Context, Poll},
};

use async_trait::async_trait;
use url::Url;

use crate::{
    protocol::error::{A2AError, A2AResult},
    transport::{FrameStream, Transport, TransportRequest, TransportResponse},
};

type UnaryHandler = Arc<dyn Fn(TransportRequest) -> TransportResponse + Send + Sync>;
type StreamHandler = Arc<dyn Fn(TransportRequest) -> Vec<A2AResult<String>> + Send + Sync>;

/// Mock transport for internal testing
///
/// Answers unary requests through a handler closure and streaming requests
/// with a canned list of frames, without a network connection.
#[derive(Clone)]
pub(crate) struct MockTransport {
    handler: UnaryHandler,
    frames: Option<StreamHandler>,
    base_url: Url,
}

impl MockTransport {
    /// Create a new mock transport with a custom request handler
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(TransportRequest) -> TransportResponse + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            frames: None,
            base_url: Url::parse("mock://agent").expect("static url"),
        }
    }

    /// Create a mock transport answering streaming requests with `handler`
    pub fn streaming<F>(handler: F) -> Self
    where
        F: Fn(TransportRequest) -> Vec<A2AResult<String>> + Send + Sync + 'static,
    {
        let mut transport = Self::new(|_| TransportResponse::new(500));
        transport.frames = Some(Arc::new(handler));
        transport
    }

    /// Create a mock transport that always returns 200 OK
    pub fn ok() -> Self {
        Self::new(|_| TransportResponse::new(200))
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        Poll::Ready(Ok(()))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        Ok((self.handler)(request))
    }

    async fn execute_streaming(&self, request: TransportRequest) -> A2AResult<FrameStream> {
        let handler = self.frames.as_ref().ok_or_else(|| {
            A2AError::UnsupportedOperation("Mock transport has no frames".to_string())
        })?;
        Ok(Box::pin(futures::stream::iter(handler(request))))
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn supports_streaming(&self) -> bool {
        self.frames.is_some()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport").finish()
    }
}
