//! Messages and their parts

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{A2AError, A2AResult};

/// A single conversational turn exchanged between a caller and an agent
///
/// Messages are carried inside task submissions and accumulate in a task's
/// history. A message holds an ordered sequence of parts; the core only
/// interprets text parts, other parts are forwarded untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Who produced the message
    pub role: Role,

    /// Ordered content parts
    pub parts: Vec<Part>,

    /// Free-form metadata attached by the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl Message {
    /// Create a message with a single text part
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an agent message with text content
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    /// Create a message from explicit parts
    pub fn from_parts(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role,
            parts,
            metadata: None,
        }
    }

    /// Append a part
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a metadata field to the message
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    /// Iterate over the text of every text part, in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(Part::as_text)
    }

    /// All text parts joined by newlines and trimmed
    ///
    /// Returns `None` when the message carries no non-blank text.
    pub fn text_content(&self) -> Option<String> {
        let joined = self.texts().collect::<Vec<_>>().join("\n");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the delegating side
    User,

    /// Message from the agent executing the task
    Agent,
}

/// File payload carried by a [`Part::File`]
///
/// Exactly one of `bytes` (base64) or `uri` is expected to be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Base64-encoded inline content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,

    /// Reference to externally hosted content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl FileContent {
    /// Decode the inline content, if any
    pub fn decode_bytes(&self) -> A2AResult<Option<Vec<u8>>> {
        self.bytes
            .as_deref()
            .map(|encoded| {
                STANDARD
                    .decode(encoded)
                    .map_err(|e| A2AError::Validation(format!("Invalid base64 file content: {}", e)))
            })
            .transpose()
    }
}

/// One piece of message or artifact content
///
/// The wire form is discriminated by the `type` field. Only `text` is
/// interpreted by the protocol core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    /// Plain text
    Text { text: String },

    /// A file, inline or by reference
    File { file: FileContent },

    /// Structured JSON object
    Data { data: Map<String, Value> },
}

impl Part {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a file part holding `content` inline
    pub fn file_bytes(name: impl Into<String>, mime_type: Option<String>, content: &[u8]) -> Self {
        Self::File {
            file: FileContent {
                name: Some(name.into()),
                mime_type,
                bytes: Some(STANDARD.encode(content)),
                uri: None,
            },
        }
    }

    /// Create a file part pointing at `uri`
    pub fn file_uri(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::File {
            file: FileContent {
                name: Some(name.into()),
                mime_type: None,
                bytes: None,
                uri: Some(uri.into()),
            },
        }
    }

    /// Create a data part
    pub fn data(data: Map<String, Value>) -> Self {
        Self::Data { data }
    }

    /// Borrow the text of a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.parts, vec![Part::text("Hello, agent!")]);
    }

    #[test]
    fn test_text_part_wire_form() {
        let json = serde_json::to_value(Message::agent("hi")).unwrap();
        assert_eq!(
            json,
            json!({"role": "agent", "parts": [{"type": "text", "text": "hi"}]})
        );
    }

    #[test]
    fn test_text_content_joins_and_trims() {
        let msg = Message::user("  first ")
            .with_part(Part::data(Map::new()))
            .with_part(Part::text("second  "));
        assert_eq!(msg.text_content().as_deref(), Some("first \nsecond"));

        let blank = Message::from_parts(Role::User, vec![Part::text("   ")]);
        assert_eq!(blank.text_content(), None);
    }

    #[test]
    fn test_file_part_bytes() {
        let part = Part::file_bytes("notes.txt", Some("text/plain".into()), b"hello");
        let Part::File { file } = &part else {
            panic!("Expected file part");
        };
        assert_eq!(file.bytes.as_deref(), Some("aGVsbG8="));
        assert_eq!(file.decode_bytes().unwrap(), Some(b"hello".to_vec()));

        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["file"]["mimeType"], "text/plain");
    }

    #[test]
    fn test_file_part_invalid_base64() {
        let file = FileContent {
            name: None,
            mime_type: None,
            bytes: Some("not base64!".into()),
            uri: None,
        };
        assert!(matches!(file.decode_bytes(), Err(A2AError::Validation(_))));
    }

    #[test]
    fn test_unknown_part_type_is_rejected() {
        let result = serde_json::from_value::<Part>(json!({"type": "video", "src": "x"}));
        assert!(result.is_err());
    }
}
