//! Serialization codecs for the A2A protocol binding
//!
//! [`JsonRpcCodec`] wraps operations in JSON-RPC 2.0 envelopes, [`SseCodec`]
//! splits a Server-Sent Events body into envelope frames and [`EventDecoder`]
//! turns those frames into an ordered stream of [`StreamEvent`]s.

pub mod events;
pub mod jsonrpc;
pub mod sse;

pub use events::EventDecoder;
pub use jsonrpc::{JsonRpcCodec, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use sse::SseCodec;

use bytes::Bytes;

use crate::{
    protocol::{error::A2AError, event::StreamEvent, operation::A2AOperation},
    service::response::A2AResponse,
};

/// Codec trait for encoding and decoding A2A protocol messages
pub trait Codec: Send + Sync {
    /// Serialize an operation into a request body correlated by `request_id`
    ///
    /// # Arguments
    ///
    /// * `request_id` - Correlation id placed in the envelope
    /// * `operation` - The A2A operation to encode
    ///
    /// # Returns
    ///
    /// The serialized bytes or an error
    fn encode_request(
        &self,
        request_id: &RequestId,
        operation: &A2AOperation,
    ) -> Result<Bytes, A2AError>;

    /// Deserialize the body answering a unary operation
    ///
    /// # Arguments
    ///
    /// * `body` - The response body bytes
    /// * `request_id` - Correlation id the response must carry
    /// * `operation` - The original operation (selects the result type)
    fn decode_response(
        &self,
        body: &[u8],
        request_id: &RequestId,
        operation: &A2AOperation,
    ) -> Result<A2AResponse, A2AError>;

    /// Deserialize a single frame of a streaming response
    ///
    /// A frame that cannot be parsed is a [`A2AError::Decode`]; a well-formed
    /// frame correlated with another request is a [`A2AError::Protocol`].
    fn decode_event(
        &self,
        frame: &str,
        request_id: Option<&RequestId>,
    ) -> Result<StreamEvent, A2AError>;

    /// Get the content type for this codec
    fn content_type(&self) -> &str;
}
