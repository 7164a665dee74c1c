//! HTTP transport implementation for A2A protocol

use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream;
use url::Url;

use crate::{
    codec::SseCodec,
    protocol::error::{A2AError, A2AResult},
};

use super::{FrameStream, Transport, TransportRequest, TransportResponse};

/// HTTP transport implementation using reqwest
///
/// Unary exchanges are plain POSTs; streaming exchanges expect a
/// `text/event-stream` answer.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// # Arguments
    ///
    /// * `base_url` - The agent endpoint (e.g., "<https://agent.example.com>")
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a new HTTP transport with a custom reqwest client
    pub fn with_client(base_url: Url, client: reqwest::Client) -> Self {
        Self { client, base_url }
    }

    fn url_for(&self, endpoint: &str) -> A2AResult<Url> {
        if endpoint.is_empty() {
            return Ok(self.base_url.clone());
        }
        self.base_url
            .join(endpoint)
            .map_err(|e| A2AError::Transport(format!("Invalid endpoint {}: {}", endpoint, e)))
    }

    fn request_builder(&self, request: &TransportRequest) -> A2AResult<reqwest::RequestBuilder> {
        let url = self.url_for(&request.endpoint)?;

        let mut req_builder = match request.method.as_str() {
            "POST" => self.client.post(url),
            "GET" => self.client.get(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            _ => {
                return Err(A2AError::Transport(format!(
                    "Unsupported HTTP method: {}",
                    request.method
                )))
            }
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if !request.body.is_empty() {
            req_builder = req_builder.body(request.body.clone());
        }

        Ok(req_builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        // HTTP client is always ready
        Poll::Ready(Ok(()))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        let mut req_builder = self.request_builder(&request)?;
        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    async fn execute_streaming(&self, request: TransportRequest) -> A2AResult<FrameStream> {
        let response = self
            .request_builder(&request)?
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(A2AError::Transport(format!(
                "HTTP streaming request failed with status {}: {}",
                status, body
            )));
        }

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        if is_event_stream {
            return Ok(SseCodec::new().frames(response.bytes_stream()));
        }

        // Agents reject a streaming request with a plain JSON-RPC error body
        tracing::debug!(url = %self.base_url, "Streaming request answered without an event stream");
        let body = response.text().await?;
        Ok(Box::pin(stream::once(async move { Ok(body) })))
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new(Url::parse("https://example.com").unwrap());
        assert_eq!(transport.base_url().as_str(), "https://example.com/");
        assert!(transport.supports_streaming());
    }

    #[test]
    fn test_url_for_endpoint() {
        let transport = HttpTransport::new(Url::parse("https://example.com/a2a/").unwrap());
        assert_eq!(
            transport.url_for("").unwrap().as_str(),
            "https://example.com/a2a/"
        );
        assert_eq!(
            transport.url_for("tasks").unwrap().as_str(),
            "https://example.com/a2a/tasks"
        );
    }

    #[test]
    fn test_unsupported_method() {
        let transport = HttpTransport::new(Url::parse("https://example.com").unwrap());
        let request = TransportRequest::new("", "PATCH");
        assert!(matches!(
            transport.request_builder(&request),
            Err(A2AError::Transport(_))
        ));
    }
}
