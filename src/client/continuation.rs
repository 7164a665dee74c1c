//! Multi-turn exchanges under one task id

use tower_service::Service;
use uuid::Uuid;

use crate::{
    client::{
        agent::AgentClient,
        tracker::{StreamCompletion, StreamOutcome},
    },
    protocol::{
        error::{A2AError, A2AResult},
        event::StreamEvent,
        message::Message,
        task::{Task, TaskState, TaskStatus},
    },
    service::{A2ARequest, A2AResponse},
};

/// Where a conversation stands between calls
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationState {
    /// No call has settled yet, or the last one broke off
    Open,

    /// The agent asked a question; the next message answers it
    AwaitingInput { prompt: Option<Message> },

    /// The task finished; further submissions are refused
    Closed(TaskState),
}

/// A task that may need several submissions to finish
///
/// Every submission reuses the same task and session ids, which is how the
/// agent knows a message continues a suspended task rather than starting a
/// new one.
///
/// ```rust,no_run
/// use a2a_relay::prelude::*;
///
/// # async fn example() -> Result<(), A2AError> {
/// let mut client = A2AClientBuilder::new_http("http://localhost:10000".parse().unwrap()).build()?;
/// let mut conversation = Conversation::generate();
///
/// let mut task = conversation.send(&mut client, Message::user("Book a table")).await?;
/// while let Some(question) = conversation.prompt_text() {
///     println!("Agent asks: {}", question);
///     task = conversation.send(&mut client, Message::user("Tomorrow, 8pm")).await?;
/// }
/// println!("Finished as {}", task.state());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Conversation {
    task_id: String,
    session_id: String,
    state: ConversationState,
}

impl Conversation {
    pub fn new(task_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            session_id: session_id.into(),
            state: ConversationState::Open,
        }
    }

    /// Start a conversation with freshly generated ids
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7().to_string(), Uuid::now_v7().to_string())
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ConversationState::Closed(_))
    }

    /// The question the agent is waiting on, if any
    pub fn input_prompt(&self) -> Option<&Message> {
        match &self.state {
            ConversationState::AwaitingInput { prompt } => prompt.as_ref(),
            _ => None,
        }
    }

    /// Text of the pending question
    ///
    /// `None` when the agent is not waiting for input. An agent that asks
    /// without any text yields an empty string.
    pub fn prompt_text(&self) -> Option<String> {
        match &self.state {
            ConversationState::AwaitingInput { prompt } => Some(
                prompt
                    .as_ref()
                    .and_then(Message::text_content)
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }

    /// Submit the next message and wait for the task to settle
    pub async fn send<S>(&mut self, client: &mut AgentClient<S>, message: Message) -> A2AResult<Task>
    where
        S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Send + 'static,
        S::Future: Send,
    {
        self.ensure_open()?;
        let task = client
            .send_task(message, self.task_id.clone(), self.session_id.clone())
            .await?;
        self.observe(&task.status);
        Ok(task)
    }

    /// Submit the next message over a stream
    pub async fn stream<S, F>(
        &mut self,
        client: &mut AgentClient<S>,
        message: Message,
        on_event: F,
    ) -> A2AResult<StreamCompletion>
    where
        S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Send + 'static,
        S::Future: Send,
        F: FnMut(A2AResult<StreamEvent>) + Send,
    {
        self.ensure_open()?;
        let completion = client
            .stream_task(
                message,
                self.task_id.clone(),
                self.session_id.clone(),
                on_event,
            )
            .await?;

        match &completion.outcome {
            StreamOutcome::Aborted { .. } => self.state = ConversationState::Open,
            _ => self.observe(&completion.task.status),
        }
        Ok(completion)
    }

    /// Record a status learned outside this conversation, e.g. from `get_task`
    pub fn observe(&mut self, status: &TaskStatus) {
        self.state = match status.state {
            state if state.is_terminal() => ConversationState::Closed(state),
            TaskState::InputRequired => ConversationState::AwaitingInput {
                prompt: status.message.clone(),
            },
            _ => ConversationState::Open,
        };
        tracing::debug!(task_id = %self.task_id, state = %status.state, "Conversation updated");
    }

    fn ensure_open(&self) -> A2AResult<()> {
        match self.state {
            ConversationState::Closed(from) => Err(A2AError::InvalidTransition {
                task_id: self.task_id.clone(),
                from,
                to: TaskState::Submitted,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use bytes::Bytes;
    use serde_json::{json, Value};

    use crate::{
        client::ClientConfig,
        codec::JsonRpcCodec,
        service::A2AProtocolService,
        transport::{mock::MockTransport, TransportResponse},
    };

    use super::*;

    /// An agent that asks one question, then completes
    fn asking_agent(calls: Arc<AtomicUsize>) -> MockTransport {
        MockTransport::new(move |req| {
            let envelope: Value = serde_json::from_slice(&req.body).unwrap();
            let id = envelope["params"]["id"].as_str().unwrap();
            let mut task = Task::new(id, envelope["params"]["sessionId"].as_str().unwrap());

            let status = if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                TaskStatus::new(TaskState::InputRequired).with_message(Message::agent("Which city?"))
            } else {
                TaskStatus::new(TaskState::Completed).with_message(Message::agent("Sunny"))
            };
            task.apply_status(status);

            let body = json!({"jsonrpc": "2.0", "id": envelope["id"], "result": task});
            TransportResponse::new(200).body(Bytes::from(body.to_string()))
        })
    }

    fn client(transport: MockTransport) -> AgentClient<A2AProtocolService<MockTransport>> {
        let service = A2AProtocolService::new(transport, Arc::new(JsonRpcCodec));
        AgentClient::new(service, ClientConfig::new("mock://agent"))
    }

    #[tokio::test]
    async fn test_two_turns_same_ids() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut client = client(asking_agent(calls.clone()));
        let mut conversation = Conversation::new("t1", "s1");

        let task = conversation
            .send(&mut client, Message::user("weather"))
            .await
            .unwrap();
        assert!(task.requires_input());
        assert_eq!(conversation.prompt_text().as_deref(), Some("Which city?"));

        let task = conversation
            .send(&mut client, Message::user("Paris"))
            .await
            .unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.state(), TaskState::Completed);
        assert!(conversation.is_closed());
        assert_eq!(conversation.prompt_text(), None);
    }

    #[tokio::test]
    async fn test_closed_conversation_refuses_without_network() {
        let calls = Arc::new(AtomicUsize::new(1));
        let mut client = client(asking_agent(calls.clone()));
        let mut conversation = Conversation::new("t1", "s1");

        conversation
            .send(&mut client, Message::user("weather"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let err = conversation
            .send(&mut client, Message::user("again"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            A2AError::InvalidTransition {
                from: TaskState::Completed,
                to: TaskState::Submitted,
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_prompt_without_text() {
        let mut conversation = Conversation::generate();
        conversation.observe(&TaskStatus::new(TaskState::InputRequired));

        assert_eq!(conversation.prompt_text().as_deref(), Some(""));
        assert!(conversation.input_prompt().is_none());
        assert_ne!(conversation.task_id(), conversation.session_id());
    }
}
