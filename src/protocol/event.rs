//! Events carried by a streaming task exchange

use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::task::{Artifact, Task, TaskState, TaskStatus};

/// Wire tag of [`StreamEvent::StatusUpdate`]
pub const KIND_STATUS_UPDATE: &str = "status-update";

/// Wire tag of [`StreamEvent::ArtifactUpdate`]
pub const KIND_ARTIFACT_UPDATE: &str = "artifact-update";

/// Wire tag of [`StreamEvent::FinalTask`]
pub const KIND_TASK: &str = "task";

/// A status transition reported while a task executes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusUpdateEvent {
    /// Task the update belongs to
    pub id: String,

    pub status: TaskStatus,

    /// Set on the last event of the call
    #[serde(rename = "final", default)]
    pub is_final: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// An artifact produced or replaced while a task executes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskArtifactUpdateEvent {
    /// Task the artifact belongs to
    pub id: String,

    pub artifact: Artifact,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// One event of a streaming exchange
///
/// Classified by the `kind` field of the event object. Kinds this crate does
/// not know are kept as [`StreamEvent::Unknown`] so the consumer can decide
/// what to do with them.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
    /// The task snapshot that closes the exchange
    FinalTask(Box<Task>),
    Unknown { kind: String, payload: Value },
}

impl StreamEvent {
    /// Build a status update event
    pub fn status(id: impl Into<String>, status: TaskStatus, is_final: bool) -> Self {
        StreamEvent::StatusUpdate(TaskStatusUpdateEvent {
            id: id.into(),
            status,
            is_final,
            metadata: None,
        })
    }

    /// Build an artifact update event
    pub fn artifact(id: impl Into<String>, artifact: Artifact) -> Self {
        StreamEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
            id: id.into(),
            artifact,
            metadata: None,
        })
    }

    /// Build the closing event
    pub fn final_task(task: Task) -> Self {
        StreamEvent::FinalTask(Box::new(task))
    }

    /// Wire tag of this event
    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::StatusUpdate(_) => KIND_STATUS_UPDATE,
            StreamEvent::ArtifactUpdate(_) => KIND_ARTIFACT_UPDATE,
            StreamEvent::FinalTask(_) => KIND_TASK,
            StreamEvent::Unknown { kind, .. } => kind,
        }
    }

    /// Id of the task this event is about, when it names one
    pub fn task_id(&self) -> Option<&str> {
        match self {
            StreamEvent::StatusUpdate(e) => Some(&e.id),
            StreamEvent::ArtifactUpdate(e) => Some(&e.id),
            StreamEvent::FinalTask(task) => Some(&task.id),
            StreamEvent::Unknown { payload, .. } => payload.get("id").and_then(Value::as_str),
        }
    }

    /// Task state carried by the event, if any
    pub fn state(&self) -> Option<TaskState> {
        match self {
            StreamEvent::StatusUpdate(e) => Some(e.status.state),
            StreamEvent::FinalTask(task) => Some(task.status.state),
            _ => None,
        }
    }

    /// Whether no further events follow this one in the same call
    pub fn ends_call(&self) -> bool {
        match self {
            StreamEvent::FinalTask(_) => true,
            StreamEvent::StatusUpdate(e) => e.is_final,
            _ => false,
        }
    }

    /// Decode an event object
    ///
    /// Objects without a `kind` tag are classified by shape: an `artifact`
    /// field marks an artifact update, a `final` flag a status update and a
    /// bare `status` a task snapshot.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = match value.get("kind").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None if value.get("artifact").is_some() => KIND_ARTIFACT_UPDATE.to_string(),
            None if value.get("final").is_some() => KIND_STATUS_UPDATE.to_string(),
            None if value.get("status").is_some() => KIND_TASK.to_string(),
            None => String::new(),
        };

        Ok(match kind.as_str() {
            KIND_STATUS_UPDATE => StreamEvent::StatusUpdate(serde_json::from_value(value)?),
            KIND_ARTIFACT_UPDATE => StreamEvent::ArtifactUpdate(serde_json::from_value(value)?),
            KIND_TASK => StreamEvent::FinalTask(Box::new(serde_json::from_value(value)?)),
            _ => StreamEvent::Unknown {
                kind,
                payload: value,
            },
        })
    }

    /// Encode the event object, including its `kind` tag
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = match self {
            StreamEvent::StatusUpdate(e) => serde_json::to_value(e)?,
            StreamEvent::ArtifactUpdate(e) => serde_json::to_value(e)?,
            StreamEvent::FinalTask(task) => serde_json::to_value(task)?,
            StreamEvent::Unknown { payload, .. } => payload.clone(),
        };

        let kind = self.kind();
        if let (Value::Object(map), false) = (&mut value, kind.is_empty()) {
            map.insert("kind".into(), Value::String(kind.to_string()));
        }
        Ok(value)
    }
}

impl Serialize for StreamEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StreamEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        StreamEvent::from_value(value).map_err(D::Error::custom)
    }
}
