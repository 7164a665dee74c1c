//! Agent side of the protocol
//!
//! A task manager owns task state and runs business logic through an
//! [`AgentExecutor`]; the JSON-RPC handler and the axum server expose it.

pub mod executor;
pub mod http;
pub mod jsonrpc;
pub mod manager;
pub mod push;

pub use executor::{AgentExecutor, ContinuationHandle, ExecutionContext, TaskUpdater};
pub use http::A2AServer;
pub use jsonrpc::{JsonRpcHandler, RpcReply};
pub use manager::{EventStream, InMemoryTaskManager, TaskManager, TaskManagerConfig};
pub use push::PushNotifier;
