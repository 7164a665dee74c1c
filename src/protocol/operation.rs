//! A2A protocol operations

use serde_json::Value;

use super::{
    error::{A2AError, A2AResult},
    task::{TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskSendParams},
};

pub const METHOD_SEND: &str = "tasks/send";
pub const METHOD_SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";
pub const METHOD_GET: &str = "tasks/get";
pub const METHOD_CANCEL: &str = "tasks/cancel";
pub const METHOD_SET_PUSH: &str = "tasks/pushNotification/set";
pub const METHOD_GET_PUSH: &str = "tasks/pushNotification/get";
pub const METHOD_RESUBSCRIBE: &str = "tasks/resubscribe";

/// A2A protocol operations
///
/// Each variant maps to exactly one JSON-RPC method. The same enum is used
/// on the client, to build requests, and on the agent side, to dispatch them.
#[derive(Debug, Clone, PartialEq)]
pub enum A2AOperation {
    /// Submit a message and wait for one task snapshot
    SendTask(TaskSendParams),

    /// Submit a message and receive a stream of events
    SendTaskSubscribe(TaskSendParams),

    /// Fetch the current snapshot of a task
    GetTask(TaskQueryParams),

    CancelTask(TaskIdParams),

    SetTaskPushNotification(TaskPushNotificationConfig),

    GetTaskPushNotification(TaskIdParams),

    /// Reattach to the event stream of an existing task
    Resubscribe(TaskQueryParams),
}

impl A2AOperation {
    /// Get the JSON-RPC method name for this operation
    pub fn method(&self) -> &'static str {
        match self {
            A2AOperation::SendTask(_) => METHOD_SEND,
            A2AOperation::SendTaskSubscribe(_) => METHOD_SEND_SUBSCRIBE,
            A2AOperation::GetTask(_) => METHOD_GET,
            A2AOperation::CancelTask(_) => METHOD_CANCEL,
            A2AOperation::SetTaskPushNotification(_) => METHOD_SET_PUSH,
            A2AOperation::GetTaskPushNotification(_) => METHOD_GET_PUSH,
            A2AOperation::Resubscribe(_) => METHOD_RESUBSCRIBE,
        }
    }

    /// Check if this operation expects a streaming response
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            A2AOperation::SendTaskSubscribe(_) | A2AOperation::Resubscribe(_)
        )
    }

    /// The task this operation is about
    pub fn task_id(&self) -> &str {
        match self {
            A2AOperation::SendTask(p) | A2AOperation::SendTaskSubscribe(p) => &p.id,
            A2AOperation::GetTask(p) | A2AOperation::Resubscribe(p) => &p.id,
            A2AOperation::CancelTask(p) | A2AOperation::GetTaskPushNotification(p) => &p.id,
            A2AOperation::SetTaskPushNotification(p) => &p.id,
        }
    }

    /// Encode the `params` member of the request envelope
    pub fn params(&self) -> A2AResult<Value> {
        let value = match self {
            A2AOperation::SendTask(p) | A2AOperation::SendTaskSubscribe(p) => {
                serde_json::to_value(p)?
            }
            A2AOperation::GetTask(p) | A2AOperation::Resubscribe(p) => serde_json::to_value(p)?,
            A2AOperation::CancelTask(p) | A2AOperation::GetTaskPushNotification(p) => {
                serde_json::to_value(p)?
            }
            A2AOperation::SetTaskPushNotification(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }

    /// Rebuild an operation from a method name and its raw params
    ///
    /// Unknown methods yield [`A2AError::MethodNotFound`], params that do not
    /// fit the method yield [`A2AError::Validation`].
    pub fn from_rpc(method: &str, params: Value) -> A2AResult<Self> {
        fn parse<T: serde::de::DeserializeOwned>(method: &str, params: Value) -> A2AResult<T> {
            serde_json::from_value(params)
                .map_err(|e| A2AError::Validation(format!("Invalid params for {}: {}", method, e)))
        }

        Ok(match method {
            METHOD_SEND => A2AOperation::SendTask(parse(method, params)?),
            METHOD_SEND_SUBSCRIBE => A2AOperation::SendTaskSubscribe(parse(method, params)?),
            METHOD_GET => A2AOperation::GetTask(parse(method, params)?),
            METHOD_CANCEL => A2AOperation::CancelTask(parse(method, params)?),
            METHOD_SET_PUSH => A2AOperation::SetTaskPushNotification(parse(method, params)?),
            METHOD_GET_PUSH => A2AOperation::GetTaskPushNotification(parse(method, params)?),
            METHOD_RESUBSCRIBE => A2AOperation::Resubscribe(parse(method, params)?),
            other => return Err(A2AError::MethodNotFound(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::protocol::message::Message;

    use super::*;

    #[test]
    fn test_operation_methods() {
        let params = TaskSendParams::new("t1", "s1", Message::user("test"));

        let op = A2AOperation::SendTask(params.clone());
        assert_eq!(op.method(), "tasks/send");
        assert!(!op.is_streaming());
        assert_eq!(op.task_id(), "t1");

        let op = A2AOperation::SendTaskSubscribe(params);
        assert_eq!(op.method(), "tasks/sendSubscribe");
        assert!(op.is_streaming());

        let op = A2AOperation::CancelTask(TaskIdParams::new("t2"));
        assert_eq!(op.method(), "tasks/cancel");
        assert_eq!(op.task_id(), "t2");
    }

    #[test]
    fn test_send_params_wire_form() {
        let op = A2AOperation::SendTask(TaskSendParams::new("t1", "s1", Message::user("hello")));
        let params = op.params().unwrap();

        assert_eq!(params["id"], "t1");
        assert_eq!(params["sessionId"], "s1");
        assert_eq!(params["message"]["parts"][0]["text"], "hello");
        assert!(params.get("historyLength").is_none());
    }

    #[test]
    fn test_from_rpc() {
        let op = A2AOperation::from_rpc("tasks/get", json!({"id": "t1", "historyLength": 2}))
            .unwrap();
        assert_eq!(
            op,
            A2AOperation::GetTask(TaskQueryParams {
                id: "t1".into(),
                history_length: Some(2),
            })
        );

        assert!(matches!(
            A2AOperation::from_rpc("tasks/list", json!({})),
            Err(A2AError::MethodNotFound(_))
        ));
        assert!(matches!(
            A2AOperation::from_rpc("tasks/send", json!({"id": "t1"})),
            Err(A2AError::Validation(_))
        ));
    }
}
