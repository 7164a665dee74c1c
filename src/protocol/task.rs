//! Task types and the task state machine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::{Message, Part};

/// A unit of delegated work
///
/// A task is identified by its caller-supplied `id`. It is created by the first
/// submission under that id and then evolves only through status transitions,
/// artifact updates and appended history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,

    /// Conversation this task belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Current status of the task
    pub status: TaskStatus,

    /// Messages exchanged so far, oldest first
    #[serde(default)]
    pub history: Vec<Message>,

    /// Outputs produced so far
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Task {
    /// Create a freshly submitted task
    pub fn new(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: Some(session_id.into()),
            status: TaskStatus::new(TaskState::Submitted),
            history: Vec::new(),
            artifacts: Vec::new(),
            metadata: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        self.status.state
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Check if the task is suspended waiting for a follow-up submission
    pub fn requires_input(&self) -> bool {
        self.status.state == TaskState::InputRequired
    }

    /// Replace the status, appending its message (if any) to the history
    pub fn apply_status(&mut self, status: TaskStatus) {
        if let Some(message) = &status.message {
            self.history.push(message.clone());
        }
        self.status = status;
    }

    /// Insert an artifact, replacing any existing artifact with the same id
    pub fn upsert_artifact(&mut self, artifact: Artifact) {
        match self.artifacts.iter_mut().find(|a| a.id == artifact.id) {
            Some(existing) => *existing = artifact,
            None => self.artifacts.push(artifact),
        }
    }

    /// A copy of this task keeping only the last `length` history entries
    pub fn with_history_length(&self, length: Option<usize>) -> Task {
        let mut task = self.clone();
        if let Some(length) = length {
            let skip = task.history.len().saturating_sub(length);
            task.history.drain(..skip);
        }
        task
    }

    /// The most recent agent message, if any
    pub fn last_agent_message(&self) -> Option<&Message> {
        self.status
            .message
            .as_ref()
            .into_iter()
            .chain(self.history.iter().rev())
            .find(|m| m.role == super::Role::Agent)
    }
}

/// Task lifecycle state
///
/// ```text
/// submitted -> working* -> { input-required -> submitted -> ... } -> completed | failed | canceled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted, not yet picked up
    Submitted,

    /// Being processed
    Working,

    /// Suspended until the caller submits a follow-up message under the same id
    InputRequired,

    Completed,

    Failed,

    /// Only reachable through an explicit cancel request
    Canceled,
}

impl TaskState {
    /// No further events or submissions are valid once terminal
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Whether reaching this state ends the current call
    pub fn is_call_terminal(self) -> bool {
        self.is_terminal() || self == TaskState::InputRequired
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;

        match self {
            Submitted | Working => !matches!(next, Submitted),
            InputRequired => matches!(next, Submitted | Canceled | Failed),
            Completed | Failed | Canceled => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a task at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,

    /// Agent message accompanying the transition, e.g. a prompt or a diagnostic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    /// A status in `state` stamped with the current time
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Attach a message to the status
    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

/// A named output produced while executing a task
///
/// Artifacts are keyed by `id`: a second artifact with the same id replaces
/// the first, a new id appends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Application-defined artifact kind
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Artifact content
    #[serde(alias = "content", default)]
    pub parts: Vec<Part>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Artifact {
    /// Create an artifact holding a single text part
    pub fn text(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            description: None,
            kind: None,
            mime_type: Some("text/plain".into()),
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }
}

/// Parameters of `tasks/send` and `tasks/sendSubscribe`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSendParams {
    pub id: String,

    pub session_id: String,

    pub message: Message,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notification: Option<PushNotificationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TaskSendParams {
    pub fn new(id: impl Into<String>, session_id: impl Into<String>, message: Message) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            message,
            history_length: None,
            push_notification: None,
            metadata: None,
        }
    }
}

/// Parameters naming a single task (`tasks/cancel`, `tasks/resubscribe`, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskIdParams {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TaskIdParams {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: None,
        }
    }
}

/// Parameters of `tasks/get`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,

    /// Return at most this many trailing history entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}

/// Where the agent should deliver task updates out of band
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushNotificationConfig {
    pub url: String,

    /// Sent as a bearer token with every notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Push notification configuration bound to a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPushNotificationConfig {
    pub id: String,

    pub push_notification_config: PushNotificationConfig,
}
