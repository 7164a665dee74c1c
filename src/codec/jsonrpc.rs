//! JSON-RPC 2.0 envelope and codec for the A2A protocol
//!
//! Every A2A exchange, unary or streaming, travels in JSON-RPC 2.0
//! envelopes. Streaming responses are a sequence of response envelopes that
//! all carry the id of the originating request.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    codec::Codec,
    protocol::{
        error::{A2AError, A2AResult},
        event::StreamEvent,
        operation::A2AOperation,
        task::TaskState,
    },
    service::response::A2AResponse,
};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const TASK_NOT_FOUND: i64 = -32001;
pub const TASK_NOT_CANCELABLE: i64 = -32002;
pub const PUSH_NOTIFICATION_NOT_SUPPORTED: i64 = -32003;
pub const UNSUPPORTED_OPERATION: i64 = -32004;

/// Correlation id of a JSON-RPC exchange
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Str(String),
    Num(i64),
}

impl RequestId {
    /// A fresh, time-ordered id
    pub fn generate() -> Self {
        RequestId::Str(Uuid::now_v7().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Str(s) => f.write_str(s),
            RequestId::Num(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::Str(s.to_string())
    }
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    pub method: String,

    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Parse an inbound request body
    ///
    /// On failure the returned error object is ready to be sent back, carrying
    /// the request id when it could be recovered.
    pub fn parse(body: &[u8]) -> Result<Self, (Option<RequestId>, JsonRpcError)> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| (None, JsonRpcError::parse_error(e.to_string())))?;

        let id = value
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

        let request: JsonRpcRequest = serde_json::from_value(value)
            .map_err(|e| (id.clone(), JsonRpcError::invalid_request(e.to_string())))?;

        if request.jsonrpc != JSONRPC_VERSION {
            return Err((
                id,
                JsonRpcError::invalid_request(format!(
                    "Unsupported jsonrpc version {}",
                    request.jsonrpc
                )),
            ));
        }

        Ok(request)
    }
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,

    #[serde(default)]
    pub id: Option<RequestId>,

    /// `Some(Value::Null)` when the peer sent `"result": null`
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Fail unless the envelope answers `expected`
    ///
    /// A response without an id is accepted: some agents drop it on errors.
    fn check_id(&self, expected: &RequestId) -> A2AResult<()> {
        match &self.id {
            Some(id) if id != expected => Err(A2AError::Protocol(format!(
                "Response id {} does not match request id {}",
                id, expected
            ))),
            _ => Ok(()),
        }
    }

    /// Unwrap the result, turning an error object into an [`A2AError`]
    pub fn into_result(self) -> A2AResult<Value> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        self.result.ok_or_else(|| {
            A2AError::Protocol("JSON-RPC response missing 'result' field".to_string())
        })
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::new(PARSE_ERROR, format!("Parse error: {}", detail.into()))
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, format!("Invalid request: {}", detail.into()))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, format!("Invalid params: {}", detail.into()))
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, format!("Internal error: {}", detail.into()))
    }

    fn task_id(&self) -> Option<String> {
        self.data
            .as_ref()?
            .get("taskId")?
            .as_str()
            .map(str::to_string)
    }

    fn state(&self, key: &str) -> Option<TaskState> {
        serde_json::from_value(self.data.as_ref()?.get(key)?.clone()).ok()
    }
}

impl From<&A2AError> for JsonRpcError {
    fn from(err: &A2AError) -> Self {
        let message = err.to_string();
        match err {
            A2AError::TaskNotFound { task_id } => JsonRpcError::new(TASK_NOT_FOUND, message)
                .with_data(json!({ "taskId": task_id })),
            A2AError::TaskNotCancelable { task_id } => {
                JsonRpcError::new(TASK_NOT_CANCELABLE, message)
                    .with_data(json!({ "taskId": task_id }))
            }
            A2AError::InvalidTransition { task_id, from, to } => {
                JsonRpcError::new(INVALID_PARAMS, message)
                    .with_data(json!({ "taskId": task_id, "from": from, "to": to }))
            }
            A2AError::TaskBusy { task_id } => JsonRpcError::new(INVALID_REQUEST, message)
                .with_data(json!({ "taskId": task_id, "reason": "busy" })),
            A2AError::PushNotificationNotSupported => {
                JsonRpcError::new(PUSH_NOTIFICATION_NOT_SUPPORTED, message)
            }
            A2AError::UnsupportedOperation(_) => JsonRpcError::new(UNSUPPORTED_OPERATION, message),
            A2AError::MethodNotFound(_) => JsonRpcError::new(METHOD_NOT_FOUND, message),
            A2AError::Validation(_) => JsonRpcError::new(INVALID_PARAMS, message),
            A2AError::Serialization(_) | A2AError::Decode(_) => {
                JsonRpcError::new(PARSE_ERROR, message)
            }
            A2AError::JsonRpc {
                code,
                message,
                data,
            } => JsonRpcError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            _ => JsonRpcError::new(INTERNAL_ERROR, message),
        }
    }
}

impl From<JsonRpcError> for A2AError {
    fn from(err: JsonRpcError) -> Self {
        let task_id = err.task_id();
        match (err.code, task_id) {
            (TASK_NOT_FOUND, Some(task_id)) => A2AError::TaskNotFound { task_id },
            (TASK_NOT_CANCELABLE, Some(task_id)) => A2AError::TaskNotCancelable { task_id },
            (INVALID_PARAMS, Some(task_id)) => match (err.state("from"), err.state("to")) {
                (Some(from), Some(to)) => A2AError::InvalidTransition { task_id, from, to },
                _ => A2AError::JsonRpc {
                    code: err.code,
                    message: err.message,
                    data: err.data,
                },
            },
            (INVALID_REQUEST, Some(task_id))
                if err
                    .data
                    .as_ref()
                    .and_then(|d| d.get("reason"))
                    .and_then(Value::as_str)
                    == Some("busy") =>
            {
                A2AError::TaskBusy { task_id }
            }
            (PUSH_NOTIFICATION_NOT_SUPPORTED, _) => A2AError::PushNotificationNotSupported,
            (UNSUPPORTED_OPERATION, _) => A2AError::UnsupportedOperation(err.message),
            _ => A2AError::JsonRpc {
                code: err.code,
                message: err.message,
                data: err.data,
            },
        }
    }
}

/// JSON-RPC 2.0 codec for A2A operations
#[derive(Debug, Clone, Default)]
pub struct JsonRpcCodec;

impl JsonRpcCodec {
    /// Create a new JSON-RPC codec
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonRpcCodec {
    fn encode_request(
        &self,
        request_id: &RequestId,
        operation: &A2AOperation,
    ) -> Result<Bytes, A2AError> {
        let request = JsonRpcRequest::new(
            request_id.clone(),
            operation.method(),
            operation.params()?,
        );
        Ok(Bytes::from(serde_json::to_vec(&request)?))
    }

    fn decode_response(
        &self,
        body: &[u8],
        request_id: &RequestId,
        operation: &A2AOperation,
    ) -> Result<A2AResponse, A2AError> {
        let envelope: JsonRpcResponse = serde_json::from_slice(body)
            .map_err(|e| A2AError::Protocol(format!("Failed to parse JSON-RPC response: {}", e)))?;
        envelope.check_id(request_id)?;

        let result = envelope.into_result()?;
        let malformed =
            |e: serde_json::Error| A2AError::Protocol(format!("Malformed result: {}", e));

        match operation {
            A2AOperation::SendTask(_) | A2AOperation::GetTask(_) | A2AOperation::CancelTask(_) => {
                let task = serde_json::from_value(result).map_err(malformed)?;
                Ok(A2AResponse::Task(Box::new(task)))
            }
            A2AOperation::SetTaskPushNotification(_)
            | A2AOperation::GetTaskPushNotification(_) => {
                if result.is_null() {
                    return Ok(A2AResponse::Empty);
                }
                let config = serde_json::from_value(result).map_err(malformed)?;
                Ok(A2AResponse::PushNotificationConfig(config))
            }
            A2AOperation::SendTaskSubscribe(_) | A2AOperation::Resubscribe(_) => {
                Err(A2AError::Protocol(format!(
                    "{} answers with a stream, not a single response",
                    operation.method()
                )))
            }
        }
    }

    fn decode_event(
        &self,
        frame: &str,
        request_id: Option<&RequestId>,
    ) -> Result<StreamEvent, A2AError> {
        let envelope: JsonRpcResponse = serde_json::from_str(frame)
            .map_err(|e| A2AError::Decode(format!("Invalid envelope frame: {}", e)))?;

        if let Some(expected) = request_id {
            envelope.check_id(expected)?;
        }

        let result = envelope.into_result()?;
        StreamEvent::from_value(result)
            .map_err(|e| A2AError::Decode(format!("Invalid event payload: {}", e)))
    }

    fn content_type(&self) -> &str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::{
        message::Message,
        task::{TaskIdParams, TaskQueryParams, TaskSendParams},
    };

    use super::*;

    fn get_task(id: &str) -> A2AOperation {
        A2AOperation::GetTask(TaskQueryParams {
            id: id.to_string(),
            history_length: None,
        })
    }

    #[test]
    fn test_encode_send_task() {
        let codec = JsonRpcCodec::new();
        let operation =
            A2AOperation::SendTask(TaskSendParams::new("t1", "s1", Message::user("Hello")));

        let bytes = codec
            .encode_request(&RequestId::from("req-1"), &operation)
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "tasks/send");
        assert_eq!(json["id"], "req-1");
        assert_eq!(json["params"]["id"], "t1");
        assert_eq!(json["params"]["sessionId"], "s1");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_decode_success_response() {
        let json = r#"{
            "jsonrpc": "2.0",
            "result": {
                "id": "task-123",
                "sessionId": "s1",
                "status": {"state": "completed"}
            },
            "id": "req-123"
        }"#;

        let response = JsonRpcCodec
            .decode_response(json.as_bytes(), &"req-123".into(), &get_task("task-123"))
            .unwrap();

        match response {
            A2AResponse::Task(task) => {
                assert_eq!(task.id, "task-123");
                assert_eq!(task.state(), TaskState::Completed);
            }
            _ => panic!("Expected Task response"),
        }
    }

    #[test]
    fn test_decode_error_response() {
        let json = r#"{
            "jsonrpc": "2.0",
            "error": {"code": -32600, "message": "Invalid Request"},
            "id": "req-123"
        }"#;

        let result =
            JsonRpcCodec.decode_response(json.as_bytes(), &"req-123".into(), &get_task("t"));

        match result {
            Err(A2AError::JsonRpc { code, message, .. }) => {
                assert_eq!(code, -32600);
                assert_eq!(message, "Invalid Request");
            }
            other => panic!("Expected JSON-RPC error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_result() {
        let json = r#"{"jsonrpc": "2.0", "id": "req-123"}"#;
        let result =
            JsonRpcCodec.decode_response(json.as_bytes(), &"req-123".into(), &get_task("t"));

        match result {
            Err(A2AError::Protocol(msg)) => assert!(msg.contains("missing 'result' field")),
            other => panic!("Expected Protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_mismatched_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "other", "result": {}}"#;
        let result =
            JsonRpcCodec.decode_response(json.as_bytes(), &"req-123".into(), &get_task("t"));
        assert!(matches!(result, Err(A2AError::Protocol(_))));
    }

    #[test]
    fn test_decode_event_frames() {
        let codec = JsonRpcCodec;
        let id = RequestId::from("r1");

        let frame = r#"{"jsonrpc":"2.0","id":"r1","result":{"kind":"status-update","id":"t1","status":{"state":"working"},"final":false}}"#;
        let event = codec.decode_event(frame, Some(&id)).unwrap();
        assert!(matches!(event, StreamEvent::StatusUpdate(_)));

        assert!(matches!(
            codec.decode_event("{not json", Some(&id)),
            Err(A2AError::Decode(_))
        ));

        let foreign = r#"{"jsonrpc":"2.0","id":"r2","result":{"kind":"task"}}"#;
        assert!(matches!(
            codec.decode_event(foreign, Some(&id)),
            Err(A2AError::Protocol(_))
        ));
    }

    #[test]
    fn test_error_mapping_round_trip() {
        let cases = [
            A2AError::TaskNotFound {
                task_id: "t1".into(),
            },
            A2AError::TaskNotCancelable {
                task_id: "t1".into(),
            },
            A2AError::InvalidTransition {
                task_id: "t1".into(),
                from: TaskState::Completed,
                to: TaskState::Submitted,
            },
            A2AError::TaskBusy {
                task_id: "t1".into(),
            },
            A2AError::PushNotificationNotSupported,
        ];

        for err in cases {
            let wire = JsonRpcError::from(&err);
            let back = A2AError::from(wire);
            assert_eq!(back.to_string(), err.to_string());
        }
    }

    #[test]
    fn test_error_codes() {
        let err = JsonRpcError::from(&A2AError::TaskNotFound {
            task_id: "t1".into(),
        });
        assert_eq!(err.code, TASK_NOT_FOUND);

        let err = JsonRpcError::from(&A2AError::MethodNotFound("tasks/list".into()));
        assert_eq!(err.code, METHOD_NOT_FOUND);

        let err = JsonRpcError::from(&A2AError::Other("boom".into()));
        assert_eq!(err.code, INTERNAL_ERROR);
    }

    #[test]
    fn test_parse_inbound_request() {
        let request = JsonRpcRequest::parse(
            br#"{"jsonrpc":"2.0","id":7,"method":"tasks/cancel","params":{"id":"t1"}}"#,
        )
        .unwrap();
        assert_eq!(request.id, Some(RequestId::Num(7)));
        let op = A2AOperation::from_rpc(&request.method, request.params).unwrap();
        assert_eq!(op, A2AOperation::CancelTask(TaskIdParams::new("t1")));

        let (id, err) = JsonRpcRequest::parse(b"{oops").unwrap_err();
        assert_eq!(id, None);
        assert_eq!(err.code, PARSE_ERROR);

        let (id, err) = JsonRpcRequest::parse(br#"{"jsonrpc":"1.0","id":"x","method":"m"}"#)
            .unwrap_err();
        assert_eq!(id, Some(RequestId::from("x")));
        assert_eq!(err.code, INVALID_REQUEST);
    }
}
