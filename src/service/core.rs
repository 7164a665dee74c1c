//! Core A2A protocol service implementation

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tower_service::Service;

use crate::{
    codec::{Codec, EventDecoder, JsonRpcResponse},
    protocol::error::A2AError,
    service::{A2ARequest, A2AResponse},
    transport::{Transport, TransportRequest, TransportResponse},
};

/// Core A2A protocol service that wraps a transport
///
/// This service implements the Tower `Service` trait. Unary operations come
/// back as decoded responses; streaming operations come back as
/// [`A2AResponse::Events`], an [`EventDecoder`] bound to the request id and
/// task id of the call.
pub struct A2AProtocolService<T> {
    transport: T,
    codec: Arc<dyn Codec>,
}

impl<T> A2AProtocolService<T>
where
    T: Transport,
{
    /// Create a new A2A protocol service
    ///
    /// # Arguments
    ///
    /// * `transport` - The underlying transport implementation
    /// * `codec` - The codec for serialization/deserialization
    pub fn new(transport: T, codec: Arc<dyn Codec>) -> Self {
        Self { transport, codec }
    }

    /// Build a transport request from an A2A request
    fn build_transport_request(
        req: &A2ARequest,
        codec: &dyn Codec,
    ) -> Result<TransportRequest, A2AError> {
        let mut transport_req = TransportRequest::new("", "POST")
            .header("Content-Type", codec.content_type())
            .body(codec.encode_request(&req.request_id, &req.operation)?);

        if !req.operation.is_streaming() {
            transport_req = transport_req
                .header("Accept", codec.content_type())
                .timeout(req.context.timeout);
        }

        for (key, value) in &req.context.metadata {
            transport_req = transport_req.header(key.clone(), value.clone());
        }

        Ok(transport_req)
    }

    /// Parse a transport response into an A2A response
    fn parse_transport_response(
        transport_resp: TransportResponse,
        codec: &dyn Codec,
        req: &A2ARequest,
    ) -> Result<A2AResponse, A2AError> {
        if !transport_resp.is_success() {
            return Err(Self::handle_error_response(&transport_resp));
        }

        codec.decode_response(&transport_resp.body, &req.request_id, &req.operation)
    }

    /// Handle error responses from the transport
    ///
    /// Agents may answer a failed exchange with a non-2xx status and a
    /// JSON-RPC error body; that error wins over the bare status.
    fn handle_error_response(transport_resp: &TransportResponse) -> A2AError {
        if let Ok(envelope) = serde_json::from_slice::<JsonRpcResponse>(&transport_resp.body) {
            if let Some(error) = envelope.error {
                return error.into();
            }
        }

        let body = String::from_utf8_lossy(&transport_resp.body);
        if body.trim().is_empty() {
            A2AError::Transport(format!("HTTP error: {}", transport_resp.status))
        } else {
            A2AError::Transport(format!("HTTP {}: {}", transport_resp.status, body.trim()))
        }
    }
}

impl<T> Service<A2ARequest> for A2AProtocolService<T>
where
    T: Transport + Clone,
{
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.transport.poll_ready(cx)
    }

    fn call(&mut self, req: A2ARequest) -> Self::Future {
        let transport = self.transport.clone();
        let codec = self.codec.clone();

        Box::pin(async move {
            let transport_req = Self::build_transport_request(&req, codec.as_ref())?;

            tracing::debug!(
                method = %req.operation.method(),
                request_id = %req.request_id,
                task_id = %req.operation.task_id(),
                url = %transport.base_url(),
                "Sending A2A request"
            );

            if req.operation.is_streaming() {
                if !transport.supports_streaming() {
                    return Err(A2AError::UnsupportedOperation(format!(
                        "{} requires a streaming transport",
                        req.operation.method()
                    )));
                }

                let frames = transport.execute_streaming(transport_req).await?;
                let events = EventDecoder::new(frames, codec, req.operation.task_id())
                    .correlated_with(req.request_id.clone());
                return Ok(A2AResponse::Events(events));
            }

            let transport_resp = transport.execute(transport_req).await?;
            Self::parse_transport_response(transport_resp, codec.as_ref(), &req)
        })
    }
}

impl<T> Clone for A2AProtocolService<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            codec: self.codec.clone(),
        }
    }
}
