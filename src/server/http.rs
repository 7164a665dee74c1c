//! HTTP binding of an agent: card discovery plus JSON-RPC over POST

use std::{future::Future, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use tokio::net::TcpListener;

use crate::{
    protocol::{
        agent::{AgentCard, AGENT_CARD_PATH},
        error::{A2AError, A2AResult},
    },
    server::{
        jsonrpc::{JsonRpcHandler, RpcReply},
        manager::TaskManager,
    },
};

struct AppState<M> {
    card: Arc<AgentCard>,
    handler: JsonRpcHandler<M>,
}

impl<M> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            card: self.card.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// Serves one agent over HTTP
///
/// `GET /.well-known/agent.json` returns the card. `POST /` takes a JSON-RPC
/// envelope and answers with JSON, or with a server-sent event stream for
/// streaming methods.
pub struct A2AServer<M> {
    state: AppState<M>,
}

impl<M: TaskManager> A2AServer<M> {
    pub fn new(card: AgentCard, manager: M) -> Self {
        Self::with_manager(card, Arc::new(manager))
    }

    /// Serve a manager that is also used elsewhere
    pub fn with_manager(card: AgentCard, manager: Arc<M>) -> Self {
        Self {
            state: AppState {
                card: Arc::new(card),
                handler: JsonRpcHandler::new(manager),
            },
        }
    }

    pub fn card(&self) -> &AgentCard {
        &self.state.card
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(&format!("/{}", AGENT_CARD_PATH), get(agent_card::<M>))
            .route("/", post(rpc::<M>))
            .with_state(self.state.clone())
    }

    /// Serve requests on `listener` until the process ends
    pub async fn serve(self, listener: TcpListener) -> A2AResult<()> {
        self.serve_with_shutdown(listener, std::future::pending::<()>())
            .await
    }

    /// Serve requests on `listener` until `signal` resolves
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> A2AResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener
            .local_addr()
            .map_err(|e| A2AError::Transport(e.to_string()))?;
        tracing::info!(agent = %self.state.card.name, %address, "Serving agent");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| A2AError::Transport(format!("Server error: {}", e)))
    }
}

async fn agent_card<M: TaskManager>(State(state): State<AppState<M>>) -> Json<AgentCard> {
    tracing::debug!("Serving agent card");
    Json(state.card.as_ref().clone())
}

async fn rpc<M: TaskManager>(State(state): State<AppState<M>>, body: Bytes) -> Response {
    match state.handler.handle(&body).await {
        RpcReply::Unary(response) => Json(response).into_response(),
        RpcReply::Stream(envelopes) => {
            let events = envelopes.map(|envelope| Event::default().json_data(envelope));
            Sse::new(events)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::server::{executor::MockAgentExecutor, manager::InMemoryTaskManager};

    use super::*;

    async fn spawn() -> String {
        let mut executor = MockAgentExecutor::new();
        executor.expect_execute().returning(|_, _| Ok(()));
        let card = AgentCard::new("Echo", "Echoes input", "http://localhost/");
        let server = A2AServer::new(card, InMemoryTaskManager::new(executor));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener));
        format!("http://{}", address)
    }

    #[tokio::test]
    async fn test_serves_agent_card() {
        let base = spawn().await;
        let card: Value = reqwest::get(format!("{}/.well-known/agent.json", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(card["name"], "Echo");
        assert_eq!(card["capabilities"]["streaming"], false);
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_rpc_error() {
        let base = spawn().await;
        let reply: Value = reqwest::Client::new()
            .post(format!("{}/", base))
            .body("{")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(reply["error"]["code"], -32700);
    }
}
