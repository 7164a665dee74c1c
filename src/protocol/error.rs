//! Error types for A2A protocol operations

use serde_json::Value;
use thiserror::Error;

use super::task::TaskState;

/// Main error type for A2A protocol operations
///
/// A task the agent reports as failed is not an error: it comes back as an
/// ordinary [`Task`](super::Task) whose state is
/// [`TaskState::Failed`].
#[derive(Debug, Error)]
pub enum A2AError {
    /// The agent card could not be fetched or parsed
    #[error("Discovery failed for {url}: {reason}")]
    Discovery { url: String, reason: String },

    /// Transport-level error (network, connection, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed envelope, missing field or out-of-order frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A single frame of an otherwise healthy stream could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The stream closed before a call-terminal event was observed
    #[error("Stream for task {task_id} ended before a final result")]
    AbnormalTermination { task_id: String },

    /// Error object returned by the remote agent
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// Validation error (invalid request or response)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request timeout error
    #[error("Request timeout")]
    Timeout,

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Task {task_id} cannot be canceled")]
    TaskNotCancelable { task_id: String },

    /// A submission would move a task out of a state that does not allow it
    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },

    /// The task already has an active execution
    #[error("Task {task_id} is already executing")]
    TaskBusy { task_id: String },

    /// This client already has an open stream for the task
    #[error("A stream for task {task_id} is already open")]
    StreamInProgress { task_id: String },

    #[error("Push notifications are not supported")]
    PushNotificationNotSupported,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl A2AError {
    /// Whether the agent could not be reached at all
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            A2AError::Transport(_) | A2AError::Timeout | A2AError::Discovery { .. }
        )
    }

    /// Whether the agent answered with something that breaks the protocol
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            A2AError::Protocol(_)
                | A2AError::Decode(_)
                | A2AError::AbnormalTermination { .. }
                | A2AError::InvalidTransition { .. }
        )
    }
}

/// Result type alias for A2A operations
pub type A2AResult<T> = Result<T, A2AError>;

impl From<reqwest::Error> for A2AError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            A2AError::Timeout
        } else if err.is_connect() {
            A2AError::Transport(format!("Connection error: {}", err))
        } else {
            A2AError::Transport(err.to_string())
        }
    }
}

impl From<String> for A2AError {
    fn from(s: String) -> Self {
        A2AError::Other(s)
    }
}
