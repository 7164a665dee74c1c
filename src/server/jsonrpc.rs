//! JSON-RPC dispatch onto a task manager

use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::{
    codec::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId},
    protocol::{
        error::{A2AError, A2AResult},
        operation::A2AOperation,
    },
    server::manager::{EventStream, TaskManager},
};

/// Envelopes answering one request
pub enum RpcReply {
    Unary(JsonRpcResponse),

    /// One envelope per event, all carrying the request id
    Stream(Pin<Box<dyn Stream<Item = JsonRpcResponse> + Send>>),
}

impl std::fmt::Debug for RpcReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcReply::Unary(response) => f.debug_tuple("Unary").field(response).finish(),
            RpcReply::Stream(_) => f.write_str("Stream"),
        }
    }
}

enum Outcome {
    Value(Value),
    Events(EventStream),
}

/// Decodes request envelopes, calls the task manager and encodes the answer
///
/// Failures of the task itself are ordinary results; only protocol misuse
/// (unknown task, bad params, busy task, ...) becomes an error envelope.
pub struct JsonRpcHandler<M> {
    manager: Arc<M>,
}

impl<M> Clone for JsonRpcHandler<M> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

impl<M: TaskManager> JsonRpcHandler<M> {
    pub fn new(manager: Arc<M>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    pub async fn handle(&self, body: &[u8]) -> RpcReply {
        let request = match JsonRpcRequest::parse(body) {
            Ok(request) => request,
            Err((id, error)) => {
                tracing::warn!(code = error.code, message = %error.message, "Rejecting malformed request");
                return RpcReply::Unary(JsonRpcResponse::error(id, error));
            }
        };

        let id = request.id;
        let operation = match A2AOperation::from_rpc(&request.method, request.params) {
            Ok(operation) => operation,
            Err(e) => {
                tracing::warn!(method = %request.method, error = %e, "Rejecting request");
                return RpcReply::Unary(JsonRpcResponse::error(id, JsonRpcError::from(&e)));
            }
        };

        tracing::info!(
            method = %operation.method(),
            task_id = %operation.task_id(),
            "Handling A2A request"
        );

        match self.dispatch(operation).await {
            Ok(Outcome::Value(result)) => RpcReply::Unary(JsonRpcResponse::success(id, result)),
            Ok(Outcome::Events(events)) => RpcReply::Stream(envelopes(id, events)),
            Err(e) => {
                tracing::warn!(error = %e, "Request failed");
                RpcReply::Unary(JsonRpcResponse::error(id, JsonRpcError::from(&e)))
            }
        }
    }

    async fn dispatch(&self, operation: A2AOperation) -> A2AResult<Outcome> {
        let manager = &self.manager;
        let value = match operation {
            A2AOperation::SendTask(params) => serde_json::to_value(manager.on_send_task(params).await?)?,
            A2AOperation::GetTask(params) => serde_json::to_value(manager.on_get_task(params).await?)?,
            A2AOperation::CancelTask(params) => {
                serde_json::to_value(manager.on_cancel_task(params).await?)?
            }
            A2AOperation::SetTaskPushNotification(config) => {
                serde_json::to_value(manager.on_set_task_push_notification(config).await?)?
            }
            A2AOperation::GetTaskPushNotification(params) => {
                serde_json::to_value(manager.on_get_task_push_notification(params).await?)?
            }
            A2AOperation::SendTaskSubscribe(params) => {
                return Ok(Outcome::Events(manager.on_send_task_streaming(params).await?));
            }
            A2AOperation::Resubscribe(params) => {
                return Ok(Outcome::Events(manager.on_resubscribe_to_task(params).await?));
            }
        };
        Ok(Outcome::Value(value))
    }
}

fn envelopes(
    id: Option<RequestId>,
    events: EventStream,
) -> Pin<Box<dyn Stream<Item = JsonRpcResponse> + Send>> {
    events
        .map(move |item| {
            match item.and_then(|event| event.to_value().map_err(A2AError::from)) {
                Ok(result) => JsonRpcResponse::success(id.clone(), result),
                Err(e) => JsonRpcResponse::error(id.clone(), JsonRpcError::from(&e)),
            }
        })
        .boxed()
}
