//! Streaming exchanges that break before a final result

use a2a_relay::prelude::*;
use futures::StreamExt;
use serde_json::{json, Value};
use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

fn sse(frames: &[Value]) -> String {
    frames
        .iter()
        .map(|frame| format!("data: {}\n\n", frame))
        .collect()
}

fn envelope(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "result": result})
}

async fn agent(body: String, content_type: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(&server)
        .await;
    server
}

async fn client(server: &MockServer) -> A2AClient<a2a_relay::transport::HttpTransport> {
    A2AClientBuilder::new_http(server.uri().parse().unwrap())
        .with_streaming(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_truncated_stream_aborts_after_delivered_events() {
    let body = sse(&[
        envelope(json!({"id": "t1", "status": {"state": "working"}, "final": false})),
        envelope(json!({
            "id": "t1",
            "artifact": {"id": "partial", "parts": [{"type": "text", "text": "half"}]}
        })),
    ]);
    let server = agent(body, "text/event-stream").await;
    let mut client = client(&server).await;
    let mut seen = Vec::new();

    let completion = client
        .stream_task(Message::user("go"), "t1", "s1", |event| seen.push(event))
        .await
        .unwrap();

    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].as_ref().unwrap().kind(), "status-update");
    assert_eq!(seen[1].as_ref().unwrap().kind(), "artifact-update");
    assert!(matches!(
        seen[2],
        Err(A2AError::AbnormalTermination { ref task_id }) if task_id == "t1"
    ));

    assert!(matches!(completion.outcome, StreamOutcome::Aborted { .. }));
    assert!(!completion.is_final());
    assert_eq!(completion.task.artifacts[0].id, "partial");
}

#[tokio::test]
async fn test_corrupt_frame_ends_stream() {
    let mut body = sse(&[envelope(
        json!({"id": "t1", "status": {"state": "working"}, "final": false}),
    )]);
    body.push_str("data: {\"jsonrpc\": \"2.0\", \"result\": \n\n");
    body.push_str(&sse(&[envelope(
        json!({"kind": "task", "id": "t1", "status": {"state": "completed"}}),
    )]));
    let server = agent(body, "text/event-stream").await;
    let mut client = client(&server).await;

    let mut subscription = client
        .subscribe_task(Message::user("go"), "t1", "s1")
        .await
        .unwrap();

    assert!(subscription.next().await.unwrap().is_ok());
    assert!(matches!(subscription.next().await, Some(Err(A2AError::Decode(_)))));
    assert!(subscription.next().await.is_none());
}

#[tokio::test]
async fn test_suspended_stream_may_close() {
    let body = sse(&[envelope(json!({
        "id": "t1",
        "status": {"state": "input-required", "message": {"role": "agent", "parts": [{"type": "text", "text": "Amount?"}]}},
        "final": false
    }))]);
    let server = agent(body, "text/event-stream").await;
    let mut client = client(&server).await;

    let completion = client
        .stream_task(Message::user("convert"), "t1", "s1", |_| {})
        .await
        .unwrap();

    assert!(completion.requires_input());
    assert_eq!(completion.prompt_text().as_deref(), Some("Amount?"));
}

#[tokio::test]
async fn test_rejected_stream_surfaces_agent_error() {
    let body = json!({
        "jsonrpc": "2.0",
        "error": {"code": -32004, "message": "Streaming is not supported"}
    });
    let server = agent(body.to_string(), "application/json").await;
    let mut client = client(&server).await;
    let mut errors = Vec::new();

    let completion = client
        .stream_task(Message::user("go"), "t1", "s1", |event| {
            if let Err(e) = event {
                errors.push(e.to_string());
            }
        })
        .await
        .unwrap();

    assert_eq!(errors.len(), 1);
    assert!(matches!(completion.outcome, StreamOutcome::Aborted { .. }));
}
