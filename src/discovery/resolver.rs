//! Agent card resolution

use std::time::Duration;

use url::Url;

use crate::protocol::{
    agent::{agent_card_url, AgentCard},
    error::{A2AError, A2AResult},
};

/// Fetches agent cards from `<base>/.well-known/agent.json`
///
/// Network failures and 5xx answers are retried up to `max_retries` times;
/// every failure surfaces as [`A2AError::Discovery`]. Optional card fields
/// that the agent leaves out take their defaults.
#[derive(Debug, Clone)]
pub struct CardResolver {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl CardResolver {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_millis(200),
        }
    }

    /// Deadline of a single fetch attempt
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay between attempts, multiplied by the attempt number
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Fetch and parse the card of the agent rooted at `base_url`
    pub async fn discover(&self, base_url: &Url) -> A2AResult<AgentCard> {
        let card_url = agent_card_url(base_url).map_err(|e| A2AError::Discovery {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let failed = |reason: String| A2AError::Discovery {
            url: card_url.to_string(),
            reason,
        };

        let mut attempt = 0;
        let body = loop {
            match self.fetch(&card_url).await {
                Ok(body) => break body,
                Err(Fetch::Retryable(reason)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(url = %card_url, attempt, %reason, "Agent card fetch failed, retrying");
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(Fetch::Retryable(reason)) | Err(Fetch::Fatal(reason)) => {
                    tracing::warn!(url = %card_url, %reason, "Could not get agent card");
                    return Err(failed(reason));
                }
            }
        };

        let card = AgentCard::from_slice(&body)
            .map_err(|e| failed(format!("Malformed agent card: {}", e)))?;

        tracing::info!(url = %card_url, agent = %card.name, "Resolved agent card");
        Ok(card)
    }

    async fn fetch(&self, card_url: &Url) -> Result<bytes::Bytes, Fetch> {
        let response = self
            .client
            .get(card_url.clone())
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Fetch::Retryable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Fetch::Retryable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(Fetch::Fatal(format!("HTTP {}", status)));
        }

        response
            .bytes()
            .await
            .map_err(|e| Fetch::Retryable(e.to_string()))
    }
}

impl Default for CardResolver {
    fn default() -> Self {
        Self::new()
    }
}

enum Fetch {
    Retryable(String),
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_agent_is_discovery_error() {
        let resolver = CardResolver::new()
            .with_max_retries(0)
            .with_timeout(Duration::from_secs(2));

        // nothing listens on port 9 of the loopback interface
        let url = Url::parse("http://127.0.0.1:9").unwrap();
        let err = resolver.discover(&url).await.unwrap_err();

        assert!(matches!(err, A2AError::Discovery { .. }));
        assert!(err.is_transport_error());
    }
}
