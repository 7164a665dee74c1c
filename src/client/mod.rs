//! High-level client API for A2A protocol

pub mod agent;
pub mod builder;
pub mod config;
pub mod continuation;
pub mod subscription;
pub mod tracker;

pub use agent::AgentClient;
pub use builder::{A2AClient, A2AClientBuilder};
pub use config::ClientConfig;
pub use continuation::{Conversation, ConversationState};
pub use subscription::TaskSubscription;
pub use tracker::{Reconciled, StreamCompletion, StreamOutcome, TaskTracker};
