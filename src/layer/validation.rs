//! Validation layer for A2A protocol requests and responses

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower_layer::Layer;
use tower_service::Service;

use crate::{
    protocol::{error::A2AError, message::Part, operation::A2AOperation, task::TaskSendParams},
    service::{A2ARequest, A2AResponse},
};

/// Layer that validates A2A protocol requests and responses
///
/// Requests are checked before they reach the network; responses are checked
/// to answer the task the request was about.
#[derive(Clone, Debug)]
pub struct A2AValidationLayer {
    enabled: bool,
}

impl A2AValidationLayer {
    /// Create a new validation layer
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Create a layer that passes everything through
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl Default for A2AValidationLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for A2AValidationLayer {
    type Service = A2AValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        A2AValidationService {
            inner,
            enabled: self.enabled,
        }
    }
}

/// Validation service that wraps an inner service
#[derive(Clone)]
pub struct A2AValidationService<S> {
    inner: S,
    enabled: bool,
}

fn require_id(id: &str, what: &str) -> Result<(), A2AError> {
    if id.trim().is_empty() {
        return Err(A2AError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

fn validate_send(params: &TaskSendParams) -> Result<(), A2AError> {
    require_id(&params.id, "Task ID")?;
    require_id(&params.session_id, "Session ID")?;

    if params.message.parts.is_empty() {
        return Err(A2AError::Validation(
            "Message must have at least one part".into(),
        ));
    }

    for part in &params.message.parts {
        match part {
            Part::Text { text } if text.is_empty() => {
                return Err(A2AError::Validation("Text part cannot be empty".into()));
            }
            Part::File { file } if file.uri.is_none() && file.bytes.is_none() => {
                return Err(A2AError::Validation(
                    "File must have either URI or bytes content".into(),
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

impl<S> A2AValidationService<S> {
    /// Validate an A2A request
    fn validate_request(req: &A2ARequest) -> Result<(), A2AError> {
        match &req.operation {
            A2AOperation::SendTask(params) | A2AOperation::SendTaskSubscribe(params) => {
                validate_send(params)?
            }
            A2AOperation::SetTaskPushNotification(config) => {
                require_id(&config.id, "Task ID")?;
                url::Url::parse(&config.push_notification_config.url).map_err(|e| {
                    A2AError::Validation(format!("Invalid push notification url: {}", e))
                })?;
            }
            other => require_id(other.task_id(), "Task ID")?,
        }

        if req.context.agent_url.is_empty() {
            return Err(A2AError::Validation("Agent URL cannot be empty".into()));
        }

        Ok(())
    }

    /// Validate an A2A response against the request it answers
    fn validate_response(req_task_id: &str, resp: &A2AResponse) -> Result<(), A2AError> {
        let answered = match resp {
            A2AResponse::Task(task) => &task.id,
            A2AResponse::PushNotificationConfig(config) => &config.id,
            A2AResponse::Events(_) | A2AResponse::Empty => return Ok(()),
        };

        if answered != req_task_id {
            return Err(A2AError::Protocol(format!(
                "Response is about task {} but the request was about task {}",
                answered, req_task_id
            )));
        }

        Ok(())
    }
}

impl<S> Service<A2ARequest> for A2AValidationService<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: A2ARequest) -> Self::Future {
        let enabled = self.enabled;

        // Validate request before passing to inner service
        if enabled {
            if let Err(e) = Self::validate_request(&req) {
                return Box::pin(async move { Err(e) });
            }
        }

        // The inner service was readied for this call; hand it the request
        // and keep the clone for the next one
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let task_id = req.operation.task_id().to_string();

        Box::pin(async move {
            let response = inner.call(req).await?;
            if enabled {
                Self::validate_response(&task_id, &response)?;
            }
            Ok(response)
        })
    }
}
