//! A2A service response types

use std::fmt;

use crate::{
    codec::EventDecoder,
    protocol::{
        error::{A2AError, A2AResult},
        task::{Task, TaskPushNotificationConfig},
    },
};

/// Response from an A2A service operation
pub enum A2AResponse {
    /// Task snapshot (from send, get and cancel)
    Task(Box<Task>),

    /// Push notification configuration of a task
    PushNotificationConfig(TaskPushNotificationConfig),

    /// Event sequence of a streaming operation
    Events(EventDecoder),

    /// Empty response (for operations with no return value)
    Empty,
}

impl A2AResponse {
    /// Extract a task from the response
    pub fn into_task(self) -> A2AResult<Task> {
        match self {
            A2AResponse::Task(task) => Ok(*task),
            other => Err(other.unexpected("task")),
        }
    }

    /// Extract the event sequence from the response
    pub fn into_events(self) -> A2AResult<EventDecoder> {
        match self {
            A2AResponse::Events(events) => Ok(events),
            other => Err(other.unexpected("event stream")),
        }
    }

    /// Extract a push notification configuration, if the agent returned one
    pub fn into_push_config(self) -> A2AResult<Option<TaskPushNotificationConfig>> {
        match self {
            A2AResponse::PushNotificationConfig(config) => Ok(Some(config)),
            A2AResponse::Empty => Ok(None),
            other => Err(other.unexpected("push notification config")),
        }
    }

    /// Check if the response is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, A2AResponse::Empty)
    }

    fn unexpected(&self, wanted: &str) -> A2AError {
        A2AError::Protocol(format!("Expected {} response, got {:?}", wanted, self))
    }
}

impl fmt::Debug for A2AResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            A2AResponse::Task(task) => f.debug_tuple("Task").field(task).finish(),
            A2AResponse::PushNotificationConfig(config) => f
                .debug_tuple("PushNotificationConfig")
                .field(config)
                .finish(),
            A2AResponse::Events(events) => f
                .debug_struct("Events")
                .field("task_id", &events.task_id())
                .finish(),
            A2AResponse::Empty => f.write_str("Empty"),
        }
    }
}
