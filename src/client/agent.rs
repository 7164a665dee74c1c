//! High-level A2A agent client

use futures::StreamExt;
use tower::ServiceExt;
use tower_service::Service;
use url::Url;

use crate::{
    client::{
        config::ClientConfig,
        subscription::{StreamRegistry, TaskSubscription},
        tracker::{StreamCompletion, StreamOutcome, TaskTracker},
    },
    discovery::CardResolver,
    protocol::{
        agent::AgentCard,
        error::{A2AError, A2AResult},
        event::StreamEvent,
        message::Message,
        operation::A2AOperation,
        task::{
            PushNotificationConfig, Task, TaskIdParams, TaskPushNotificationConfig,
            TaskQueryParams, TaskSendParams,
        },
    },
    service::{A2ARequest, A2AResponse, RequestContext},
};

/// High-level A2A client for delegating tasks to an agent
///
/// This client wraps a Tower service and provides methods for every task
/// operation. Task and session ids are chosen by the caller; reuse them to
/// continue a task that asked for more input.
///
/// # Example
///
/// ```rust,no_run
/// use a2a_relay::prelude::*;
///
/// # async fn example() -> Result<(), A2AError> {
/// let url = "https://agent.example.com".parse().unwrap();
/// let mut client = A2AClientBuilder::new_http(url).build()?;
///
/// let task = client
///     .send_task(Message::user("Hello, agent!"), "task-1", "session-1")
///     .await?;
/// println!("Task {} is {}", task.id, task.state());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AgentClient<S> {
    service: S,
    config: ClientConfig,
    streams: StreamRegistry,
}

impl<S> AgentClient<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Send + 'static,
    S::Future: Send,
{
    /// Create a new agent client
    ///
    /// # Arguments
    ///
    /// * `service` - The Tower service that handles requests
    /// * `config` - Client configuration
    pub fn new(service: S, config: ClientConfig) -> Self {
        Self {
            service,
            config,
            streams: StreamRegistry::default(),
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_context(&self) -> RequestContext {
        RequestContext::new(self.config.agent_url.clone()).with_timeout(self.config.timeout)
    }

    async fn execute(&mut self, operation: A2AOperation) -> A2AResult<A2AResponse> {
        let request = A2ARequest::new(operation, self.build_context());
        tracing::debug!(
            method = %request.operation.method(),
            task_id = %request.operation.task_id(),
            "Calling agent"
        );

        let service = self.service.ready().await?;
        service.call(request).await
    }

    /// Submit a message and wait for the task to settle
    ///
    /// Returns once the task is terminal or waiting for input. An
    /// `input-required` task is a normal result, not an error.
    pub async fn send_task(
        &mut self,
        message: Message,
        task_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> A2AResult<Task> {
        self.send(TaskSendParams::new(task_id, session_id, message))
            .await
    }

    /// Submit with full control over the request parameters
    pub async fn send(&mut self, params: TaskSendParams) -> A2AResult<Task> {
        let task_id = params.id.clone();
        let task = self
            .execute(A2AOperation::SendTask(params))
            .await?
            .into_task()?;

        tracing::info!(task_id = %task_id, state = %task.state(), "Task settled");
        Ok(task)
    }

    /// Submit a message and consume the events as a stream
    ///
    /// Fails with [`A2AError::StreamInProgress`] while another stream of this
    /// client follows the same task, and with
    /// [`A2AError::UnsupportedOperation`] when the agent card says the agent
    /// does not stream.
    pub async fn subscribe_task(
        &mut self,
        message: Message,
        task_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> A2AResult<TaskSubscription> {
        self.subscribe(TaskSendParams::new(task_id, session_id, message))
            .await
    }

    pub async fn subscribe(&mut self, params: TaskSendParams) -> A2AResult<TaskSubscription> {
        self.ensure_streaming()?;
        let slot = self.streams.acquire(&params.id)?;

        let events = self
            .execute(A2AOperation::SendTaskSubscribe(params))
            .await?
            .into_events()?;

        Ok(TaskSubscription::spawn(
            events,
            self.config.stream_buffer,
            slot,
        ))
    }

    /// Submit a message and deliver every event to `on_event`
    ///
    /// Events arrive in order. If the exchange breaks, `on_event` receives
    /// the error as its last call and the completion is
    /// [`StreamOutcome::Aborted`]. Failures before the stream opens are
    /// returned directly and `on_event` is never called. Dropping the
    /// returned future stops delivery.
    pub async fn stream_task<F>(
        &mut self,
        message: Message,
        task_id: impl Into<String>,
        session_id: impl Into<String>,
        on_event: F,
    ) -> A2AResult<StreamCompletion>
    where
        F: FnMut(A2AResult<StreamEvent>) + Send,
    {
        self.stream(TaskSendParams::new(task_id, session_id, message), on_event)
            .await
    }

    pub async fn stream<F>(
        &mut self,
        params: TaskSendParams,
        mut on_event: F,
    ) -> A2AResult<StreamCompletion>
    where
        F: FnMut(A2AResult<StreamEvent>) + Send,
    {
        let mut tracker = TaskTracker::for_submission(&params);
        let mut subscription = self.subscribe(params).await?;
        let mut aborted = None;

        while let Some(item) = subscription.next().await {
            let failure = match item {
                Ok(event) => match tracker.apply(&event) {
                    Ok(_) => {
                        on_event(Ok(event));
                        continue;
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            tracing::warn!(task_id = %subscription.task_id(), error = %failure, "Task stream aborted");
            aborted = Some(failure.to_string());
            on_event(Err(failure));
            break;
        }

        let outcome = match aborted {
            Some(reason) => StreamOutcome::Aborted { reason },
            None => tracker.outcome(),
        };

        Ok(StreamCompletion {
            task: tracker.into_task(),
            outcome,
        })
    }

    /// Reattach to the event stream of a task that is still running
    pub async fn resubscribe(
        &mut self,
        task_id: impl Into<String>,
        history_length: Option<usize>,
    ) -> A2AResult<TaskSubscription> {
        self.ensure_streaming()?;
        let id = task_id.into();
        let slot = self.streams.acquire(&id)?;

        let events = self
            .execute(A2AOperation::Resubscribe(TaskQueryParams { id, history_length }))
            .await?
            .into_events()?;

        Ok(TaskSubscription::spawn(
            events,
            self.config.stream_buffer,
            slot,
        ))
    }

    /// Get a task by ID
    ///
    /// # Errors
    ///
    /// Returns `A2AError::TaskNotFound` if the agent does not know the task
    pub async fn get_task(
        &mut self,
        task_id: impl Into<String>,
        history_length: Option<usize>,
    ) -> A2AResult<Task> {
        let query = TaskQueryParams {
            id: task_id.into(),
            history_length,
        };
        self.execute(A2AOperation::GetTask(query))
            .await?
            .into_task()
    }

    /// Cancel a task by ID
    ///
    /// Returns the task in its canceled state. Tasks that already finished
    /// yield `A2AError::TaskNotCancelable`.
    pub async fn cancel_task(&mut self, task_id: impl Into<String>) -> A2AResult<Task> {
        self.execute(A2AOperation::CancelTask(TaskIdParams::new(task_id)))
            .await?
            .into_task()
    }

    /// Register where the agent should push updates for a task
    pub async fn set_push_notification(
        &mut self,
        task_id: impl Into<String>,
        config: PushNotificationConfig,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let config = TaskPushNotificationConfig {
            id: task_id.into(),
            push_notification_config: config,
        };
        self.execute(A2AOperation::SetTaskPushNotification(config.clone()))
            .await?
            .into_push_config()
            .map(|stored| stored.unwrap_or(config))
    }

    /// The push configuration of a task, if one is registered
    pub async fn get_push_notification(
        &mut self,
        task_id: impl Into<String>,
    ) -> A2AResult<Option<TaskPushNotificationConfig>> {
        self.execute(A2AOperation::GetTaskPushNotification(TaskIdParams::new(
            task_id,
        )))
        .await?
        .into_push_config()
    }

    /// Fetch the agent card of the configured agent
    pub async fn discover(&self) -> A2AResult<AgentCard> {
        let url = Url::parse(&self.config.agent_url).map_err(|e| A2AError::Discovery {
            url: self.config.agent_url.clone(),
            reason: e.to_string(),
        })?;

        CardResolver::new()
            .with_max_retries(self.config.max_retries)
            .with_timeout(self.config.timeout)
            .discover(&url)
            .await
    }

    fn ensure_streaming(&self) -> A2AResult<()> {
        if self.config.streaming == Some(false) {
            return Err(A2AError::UnsupportedOperation(
                "Agent does not support streaming".into(),
            ));
        }
        Ok(())
    }
}
