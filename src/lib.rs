//! # A2A Relay
//!
//! Task delegation between agents over the Agent2Agent (A2A) protocol.
//!
//! The client side discovers a remote agent through its card, submits tasks
//! and follows them either with one request/response exchange or as a stream
//! of status and artifact events. Tasks that pause for input are resumed by
//! a [`Conversation`](client::Conversation) reusing the same task and session
//! ids. The server side exposes an [`AgentExecutor`](server::AgentExecutor)
//! through a task manager that enforces the task lifecycle.
//!
//! Requests travel through Tower services, so transport and middleware can be
//! swapped without touching the protocol logic.
//!
//! ## Example
//!
//! ```rust,no_run
//! use a2a_relay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), A2AError> {
//!     let base = "http://localhost:10000".parse().unwrap();
//!     let card = CardResolver::new().discover(&base).await?;
//!     let mut client = A2AClientBuilder::for_card(&card, &base)?.build()?;
//!
//!     let mut conversation = Conversation::generate();
//!     let task = conversation
//!         .send(&mut client, Message::user("What is the weather in Paris?"))
//!         .await?;
//!     println!("{} -> {:?}", task.id, task.status.state);
//!
//!     if let Some(question) = conversation.prompt_text() {
//!         println!("Agent asks: {}", question);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod discovery;
pub mod layer;
pub mod protocol;
pub mod server;
pub mod service;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        client::{
            A2AClient, A2AClientBuilder, AgentClient, Conversation, ConversationState,
            StreamCompletion, StreamOutcome, TaskSubscription,
        },
        discovery::{AgentCardCache, CardResolver},
        protocol::{
            A2AError, A2AResult, AgentCapabilities, AgentCard, AgentSkill, Artifact, Message,
            Part, Role, StreamEvent, Task, TaskSendParams, TaskState, TaskStatus,
        },
        server::{
            A2AServer, AgentExecutor, ExecutionContext, InMemoryTaskManager, TaskManager,
            TaskUpdater,
        },
    };
}
