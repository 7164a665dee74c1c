//! The seam between the task manager and agent business logic

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::protocol::{
    error::{A2AError, A2AResult},
    message::Message,
    task::{Artifact, TaskState, TaskStatus},
};

/// Opaque state an executor leaves behind when it asks for input
///
/// The task manager stores it per task id and hands it back unchanged on the
/// submission that resumes the task.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationHandle(Value);

impl ContinuationHandle {
    pub fn new(state: Value) -> Self {
        Self(state)
    }

    pub fn state(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Everything an executor is told about one submission
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub task_id: String,
    pub session_id: String,

    /// The message of this submission
    pub message: Message,

    /// Task history up to and including `message`
    pub history: Vec<Message>,

    /// Set when this submission resumes a task that asked for input
    pub continuation: Option<ContinuationHandle>,

    pub metadata: Option<Value>,
}

impl ExecutionContext {
    /// Text of the submitted message, if it has any
    pub fn user_text(&self) -> Option<String> {
        self.message.text_content()
    }

    pub fn is_resumption(&self) -> bool {
        self.continuation.is_some()
    }
}

#[derive(Debug)]
pub(crate) enum TaskUpdate {
    Status {
        status: TaskStatus,
        continuation: Option<ContinuationHandle>,
    },
    Artifact(Artifact),
}

/// Reports progress of one execution back to the task manager
///
/// Updates are applied in the order they are sent. Once the execution has
/// ended (finished, suspended or canceled) every method fails.
#[derive(Debug, Clone)]
pub struct TaskUpdater {
    task_id: String,
    updates: mpsc::UnboundedSender<TaskUpdate>,
}

impl TaskUpdater {
    pub(crate) fn new(task_id: impl Into<String>, updates: mpsc::UnboundedSender<TaskUpdate>) -> Self {
        Self {
            task_id: task_id.into(),
            updates,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    fn send(&self, update: TaskUpdate) -> A2AResult<()> {
        self.updates
            .send(update)
            .map_err(|_| A2AError::Other(format!("Task {} is no longer executing", self.task_id)))
    }

    fn status(&self, state: TaskState, message: Option<Message>) -> A2AResult<()> {
        let mut status = TaskStatus::new(state);
        status.message = message;
        self.send(TaskUpdate::Status {
            status,
            continuation: None,
        })
    }

    /// Move the task to `working`, optionally with a progress message
    pub fn start_work(&self, message: Option<Message>) -> A2AResult<()> {
        self.status(TaskState::Working, message)
    }

    /// Publish an artifact; an earlier artifact with the same id is replaced
    pub fn add_artifact(&self, artifact: Artifact) -> A2AResult<()> {
        self.send(TaskUpdate::Artifact(artifact))
    }

    /// Suspend the task until the caller answers `prompt`
    ///
    /// `continuation` comes back in the [`ExecutionContext`] of the
    /// resuming submission.
    pub fn require_input(
        &self,
        prompt: Message,
        continuation: Option<ContinuationHandle>,
    ) -> A2AResult<()> {
        self.send(TaskUpdate::Status {
            status: TaskStatus::new(TaskState::InputRequired).with_message(prompt),
            continuation,
        })
    }

    pub fn complete(&self, message: Option<Message>) -> A2AResult<()> {
        self.status(TaskState::Completed, message)
    }

    /// Report a domain failure with a diagnostic for the caller
    pub fn fail(&self, diagnostic: impl Into<String>) -> A2AResult<()> {
        self.status(TaskState::Failed, Some(Message::agent(diagnostic)))
    }
}

/// Agent business logic
///
/// `execute` runs once per admitted submission. It reports progress through
/// the updater and returns when the task is finished or suspended. Returning
/// `Ok` without a final update completes the task; returning `Err` or
/// panicking fails it with the error as diagnostic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentExecutor: Send + Sync + 'static {
    async fn execute(&self, context: ExecutionContext, updater: TaskUpdater) -> anyhow::Result<()>;
}
