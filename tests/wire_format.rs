//! Wire format tests
//!
//! These tests pin the JSON shapes exchanged with other A2A agents.

use a2a_relay::{
    codec::{Codec, JsonRpcCodec, RequestId},
    protocol::{
        A2AError, A2AOperation, AgentCard, Artifact, Message, Part, Role, StreamEvent, Task,
        TaskSendParams, TaskState, TaskStatus,
    },
};
use serde_json::{json, Map};

#[test]
fn test_role_serialization() {
    let json = serde_json::to_value(Message::user("Hello")).unwrap();
    assert_eq!(json["role"], "user");

    let json = serde_json::to_value(Message::agent("Hi there")).unwrap();
    assert_eq!(json["role"], "agent");
}

#[test]
fn test_parts_are_tagged_by_type() {
    let json = serde_json::to_value(Part::text("Hello, world!")).unwrap();
    assert_eq!(json, json!({"type": "text", "text": "Hello, world!"}));

    let json = serde_json::to_value(Part::file_uri("doc.pdf", "https://example.com/doc.pdf")).unwrap();
    assert_eq!(json["type"], "file");
    assert_eq!(json["file"]["name"], "doc.pdf");
    assert_eq!(json["file"]["uri"], "https://example.com/doc.pdf");
    assert!(json["file"].get("bytes").is_none());

    let json = serde_json::to_value(Part::file_bytes("a.bin", Some("application/octet-stream".into()), b"hi")).unwrap();
    assert_eq!(json["file"]["bytes"], "aGk=");
    assert_eq!(json["file"]["mimeType"], "application/octet-stream");

    let mut data = Map::new();
    data.insert("count".into(), json!(42));
    let json = serde_json::to_value(Part::data(data)).unwrap();
    assert_eq!(json, json!({"type": "data", "data": {"count": 42}}));
}

#[test]
fn test_message_from_peer() {
    let message: Message = serde_json::from_value(json!({
        "role": "agent",
        "parts": [
            {"type": "text", "text": "Forecast ready"},
            {"type": "file", "file": {"name": "map.png", "bytes": "aGk="}}
        ],
        "metadata": {"source": "weather"}
    }))
    .unwrap();

    assert_eq!(message.role, Role::Agent);
    assert_eq!(message.text_content().as_deref(), Some("Forecast ready"));
    let Part::File { file } = &message.parts[1] else {
        panic!("expected a file part");
    };
    assert_eq!(file.decode_bytes().unwrap(), Some(b"hi".to_vec()));
}

#[test]
fn test_task_state_serialization() {
    for (state, wire) in [
        (TaskState::Submitted, "submitted"),
        (TaskState::Working, "working"),
        (TaskState::InputRequired, "input-required"),
        (TaskState::Completed, "completed"),
        (TaskState::Failed, "failed"),
        (TaskState::Canceled, "canceled"),
    ] {
        assert_eq!(serde_json::to_value(state).unwrap(), wire);
    }
}

#[test]
fn test_task_field_naming() {
    let mut task = Task::new("task-123", "session-1");
    task.apply_status(TaskStatus::new(TaskState::Working));
    task.upsert_artifact(Artifact::text("a1", "answer", "42"));

    let json = serde_json::to_value(&task).unwrap();

    assert_eq!(json["id"], "task-123");
    assert_eq!(json["sessionId"], "session-1");
    assert!(json.get("session_id").is_none());
    assert_eq!(json["status"]["state"], "working");
    assert_eq!(json["artifacts"][0]["parts"][0]["text"], "42");
    assert!(json.get("metadata").is_none());
}

#[test]
fn test_task_survives_the_wire() {
    let mut request = Message::user("summarize the attachment");
    request
        .parts
        .push(Part::file_bytes("notes.txt", Some("text/plain".into()), b"line one"));

    let mut task = Task::new("task-9", "session-9");
    task.history.push(request);
    task.apply_status(
        TaskStatus::new(TaskState::Working).with_message(Message::agent("Reading notes.txt")),
    );
    task.upsert_artifact(Artifact::text("summary", "summary", "One line."));
    assert!(task.status.timestamp.is_some());
    assert_eq!(task.history.len(), 2);

    let decoded: Task = serde_json::from_value(serde_json::to_value(&task).unwrap()).unwrap();

    assert_eq!(decoded, task);
}

#[test]
fn test_artifact_accepts_content_alias() {
    let artifact: Artifact = serde_json::from_value(json!({
        "id": "report",
        "type": "summary",
        "content": [{"type": "text", "text": "done"}]
    }))
    .unwrap();

    assert_eq!(artifact.kind.as_deref(), Some("summary"));
    assert_eq!(artifact.parts, vec![Part::text("done")]);
}

#[test]
fn test_send_request_envelope() {
    let mut params = TaskSendParams::new("t1", "s1", Message::user("hello"));
    params.history_length = Some(2);
    let request_id = RequestId::Num(9);

    let body = JsonRpcCodec
        .encode_request(&request_id, &A2AOperation::SendTask(params))
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["jsonrpc"], "2.0");
    assert_eq!(json["id"], 9);
    assert_eq!(json["method"], "tasks/send");
    assert_eq!(json["params"]["id"], "t1");
    assert_eq!(json["params"]["sessionId"], "s1");
    assert_eq!(json["params"]["historyLength"], 2);
    assert_eq!(json["params"]["message"]["parts"][0]["text"], "hello");
}

#[test]
fn test_event_frames() {
    let codec = JsonRpcCodec;

    let frame = json!({
        "jsonrpc": "2.0", "id": 1,
        "result": {"id": "t1", "status": {"state": "working"}, "final": false}
    });
    let event = codec.decode_event(&frame.to_string(), None).unwrap();
    assert_eq!(event.kind(), "status-update");
    assert_eq!(event.state(), Some(TaskState::Working));
    assert!(!event.ends_call());

    let frame = json!({
        "jsonrpc": "2.0", "id": 1,
        "result": {"kind": "task", "id": "t1", "status": {"state": "completed"}}
    });
    let event = codec.decode_event(&frame.to_string(), None).unwrap();
    assert!(matches!(event, StreamEvent::FinalTask(_)));
    assert!(event.ends_call());

    let frame = json!({"jsonrpc": "2.0", "id": 1, "result": {"kind": "heartbeat"}});
    let event = codec.decode_event(&frame.to_string(), None).unwrap();
    assert_eq!(event.kind(), "heartbeat");

    let err = codec.decode_event("{\"jsonrpc\":", None).unwrap_err();
    assert!(matches!(err, A2AError::Decode(_)));
}

#[test]
fn test_error_envelope_maps_to_typed_error() {
    let body = json!({
        "jsonrpc": "2.0", "id": 4,
        "error": {"code": -32001, "message": "Task not found", "data": {"taskId": "gone"}}
    });
    let operation = A2AOperation::from_rpc("tasks/get", json!({"id": "gone"})).unwrap();

    let err = JsonRpcCodec
        .decode_response(body.to_string().as_bytes(), &RequestId::Num(4), &operation)
        .unwrap_err();

    assert!(matches!(err, A2AError::TaskNotFound { task_id } if task_id == "gone"));
}

#[test]
fn test_agent_card_defaults() {
    let card = AgentCard::from_slice(br#"{"name": "Weather", "url": "https://weather.example/a2a"}"#).unwrap();

    assert_eq!(card.name, "Weather");
    assert!(!card.capabilities.streaming);
    assert_eq!(card.default_input_modes, vec!["text".to_string()]);
    assert!(card.skills.is_empty());
}
