//! Agent discovery and capability types

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{A2AError, A2AResult};

/// Path of the agent card relative to an agent's base URL
pub const AGENT_CARD_PATH: &str = ".well-known/agent.json";

/// Agent Card for agent discovery
///
/// The Agent Card is published under [`AGENT_CARD_PATH`] and describes the
/// agent's endpoint, capabilities and skills. Every field other than `name`
/// and `url` may be omitted by the agent and falls back to a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Name of the agent
    pub name: String,

    /// Human-readable description of the agent
    #[serde(default)]
    pub description: String,

    /// Endpoint that accepts task requests
    pub url: String,

    #[serde(default)]
    pub version: String,

    /// URL to agent documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,

    #[serde(default)]
    pub capabilities: AgentCapabilities,

    #[serde(default = "default_modes")]
    pub default_input_modes: Vec<String>,

    #[serde(default = "default_modes")]
    pub default_output_modes: Vec<String>,

    /// Advertised skills, in the agent's order
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

fn default_modes() -> Vec<String> {
    vec!["text".to_string()]
}

impl AgentCard {
    /// Create a new agent card with no capabilities and no skills
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            version: String::new(),
            documentation_url: None,
            provider: None,
            capabilities: AgentCapabilities::default(),
            default_input_modes: default_modes(),
            default_output_modes: default_modes(),
            skills: Vec::new(),
        }
    }

    /// Parse a card document, defaulting every optional field
    pub fn from_slice(body: &[u8]) -> A2AResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Set the agent version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Append a skill
    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Endpoint to send task requests to
    ///
    /// Agents started locally often advertise a loopback URL even when they
    /// are reached through another host. When the card points at a loopback
    /// host but was fetched from a different one, the discovery base URL wins.
    pub fn endpoint(&self, discovered_from: &Url) -> A2AResult<Url> {
        let advertised = Url::parse(&self.url)
            .map_err(|e| A2AError::Validation(format!("Invalid agent url {}: {}", self.url, e)))?;

        let loopback = matches!(
            advertised.host_str(),
            Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0") | Some("[::1]")
        );
        if loopback && advertised.host_str() != discovered_from.host_str() {
            tracing::warn!(
                advertised = %advertised,
                using = %discovered_from,
                "Agent card advertises a loopback url, using the discovery url instead"
            );
            return Ok(discovered_from.clone());
        }

        Ok(advertised)
    }
}

/// Location of the agent card for an agent rooted at `base_url`
pub fn agent_card_url(base_url: &Url) -> A2AResult<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(AGENT_CARD_PATH)
        .map_err(|e| A2AError::Validation(format!("Invalid agent base url {}: {}", base_url, e)))
}

/// Optional protocol features an agent supports
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Supports `tasks/sendSubscribe`
    #[serde(default)]
    pub streaming: bool,

    /// Supports push notification configuration
    #[serde(default)]
    pub push_notifications: bool,

    /// Keeps the status history of its tasks
    #[serde(default)]
    pub state_transition_history: bool,
}

impl AgentCapabilities {
    /// Enable streaming
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Enable push notifications
    pub fn with_push_notifications(mut self) -> Self {
        self.push_notifications = true;
        self
    }

    pub fn with_state_transition_history(mut self) -> Self {
        self.state_transition_history = true;
        self
    }
}

/// A capability the agent advertises
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSkill {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl AgentSkill {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            examples: Vec::new(),
        }
    }
}

/// Organization operating the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProvider {
    pub organization: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_card_defaults() {
        let card =
            AgentCard::from_slice(br#"{"name": "Echo", "url": "http://agent.example.com/"}"#)
                .unwrap();

        assert_eq!(card.name, "Echo");
        assert_eq!(card.description, "");
        assert_eq!(card.capabilities, AgentCapabilities::default());
        assert!(card.skills.is_empty());
        assert_eq!(card.default_input_modes, vec!["text"]);
    }

    #[test]
    fn test_full_card() {
        let body = br#"{
            "name": "ADK Agent",
            "description": "Echoes input",
            "url": "http://agent.example.com/",
            "version": "0.1.0",
            "capabilities": {"streaming": true, "pushNotifications": false, "stateTransitionHistory": true},
            "skills": [{"id": "basic-chat", "name": "Basic chat", "description": "Chat"}]
        }"#;
        let card = AgentCard::from_slice(body).unwrap();

        assert!(card.capabilities.streaming);
        assert!(card.capabilities.state_transition_history);
        assert_eq!(card.skills[0].id, "basic-chat");
    }

    #[test]
    fn test_card_missing_name_fails() {
        assert!(AgentCard::from_slice(br#"{"url": "http://a/"}"#).is_err());
    }

    #[test]
    fn test_agent_card_url() {
        let base = Url::parse("http://agent.example.com").unwrap();
        assert_eq!(
            agent_card_url(&base).unwrap().as_str(),
            "http://agent.example.com/.well-known/agent.json"
        );

        let nested = Url::parse("http://gateway.example.com/agents/echo").unwrap();
        assert_eq!(
            agent_card_url(&nested).unwrap().as_str(),
            "http://gateway.example.com/agents/echo/.well-known/agent.json"
        );
    }

    #[test]
    fn test_endpoint_prefers_discovery_url_over_loopback() {
        let card = AgentCard::new("a", "b", "http://localhost:10002/");
        let discovered = Url::parse("http://agents.internal:10002/").unwrap();
        assert_eq!(card.endpoint(&discovered).unwrap(), discovered);

        let local = Url::parse("http://localhost:10002/").unwrap();
        assert_eq!(card.endpoint(&local).unwrap(), local);

        let remote = AgentCard::new("a", "b", "https://agent.example.com/a2a");
        assert_eq!(
            remote.endpoint(&discovered).unwrap().as_str(),
            "https://agent.example.com/a2a"
        );
    }
}
