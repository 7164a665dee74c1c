//! Core A2A protocol types and definitions

pub mod agent;
pub mod error;
pub mod event;
pub mod message;
pub mod operation;
pub mod task;

pub use agent::{AgentCapabilities, AgentCard, AgentProvider, AgentSkill};
pub use error::{A2AError, A2AResult};
pub use event::{StreamEvent, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
pub use message::{FileContent, Message, Part, Role};
pub use operation::A2AOperation;
pub use task::{
    Artifact, PushNotificationConfig, Task, TaskIdParams, TaskPushNotificationConfig,
    TaskQueryParams, TaskSendParams, TaskState, TaskStatus,
};
