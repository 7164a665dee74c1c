//! Server-side task lifecycle
//!
//! The [`TaskManager`] trait is what the JSON-RPC handler calls into.
//! [`InMemoryTaskManager`] is the stock implementation: it admits
//! submissions, runs an [`AgentExecutor`] per submission and turns the
//! executor's updates into the event stream of the call.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::{future, stream, Stream, StreamExt};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::{AbortHandle, JoinError, JoinHandle},
};
use tokio_stream::wrappers::{BroadcastStream, UnboundedReceiverStream};

use crate::{
    protocol::{
        error::{A2AError, A2AResult},
        event::StreamEvent,
        message::Message,
        task::{
            PushNotificationConfig, Task, TaskIdParams, TaskPushNotificationConfig,
            TaskQueryParams, TaskSendParams, TaskState, TaskStatus,
        },
    },
    server::{
        executor::{AgentExecutor, ContinuationHandle, ExecutionContext, TaskUpdate, TaskUpdater},
        push::PushNotifier,
    },
};

/// Events of one server-side call
pub type EventStream = Pin<Box<dyn Stream<Item = A2AResult<StreamEvent>> + Send>>;

/// What an agent must answer for each task method
#[async_trait]
pub trait TaskManager: Send + Sync + 'static {
    /// Run a submission to its end and return the resulting snapshot
    async fn on_send_task(&self, params: TaskSendParams) -> A2AResult<Task>;

    /// Run a submission and stream its events
    ///
    /// The stream ends after a final task or after a final `input-required`
    /// status update.
    async fn on_send_task_streaming(&self, params: TaskSendParams) -> A2AResult<EventStream>;

    async fn on_get_task(&self, params: TaskQueryParams) -> A2AResult<Task>;

    async fn on_cancel_task(&self, params: TaskIdParams) -> A2AResult<Task>;

    async fn on_set_task_push_notification(
        &self,
        config: TaskPushNotificationConfig,
    ) -> A2AResult<TaskPushNotificationConfig>;

    async fn on_get_task_push_notification(
        &self,
        params: TaskIdParams,
    ) -> A2AResult<Option<TaskPushNotificationConfig>>;

    /// Attach to the events of a task submitted earlier
    async fn on_resubscribe_to_task(&self, params: TaskQueryParams) -> A2AResult<EventStream>;
}

/// Tuning of [`InMemoryTaskManager`]
#[derive(Debug, Clone)]
pub struct TaskManagerConfig {
    /// Events buffered per execution for resubscribed readers
    ///
    /// A resubscriber that falls further behind is resynchronized from the
    /// task snapshot. The submitting call itself never loses events.
    pub event_buffer: usize,

    /// Deadline of one push notification delivery
    pub push_timeout: Duration,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            event_buffer: 64,
            push_timeout: Duration::from_secs(5),
        }
    }
}

struct Execution {
    generation: u64,
    /// Every event of the call, in order, for the submitting caller
    caller: mpsc::UnboundedSender<StreamEvent>,
    /// Fan-out to resubscribers
    events: broadcast::Sender<StreamEvent>,
    abort: AbortHandle,
}

struct TaskRecord {
    task: Task,
    continuation: Option<ContinuationHandle>,
    execution: Option<Execution>,
    push: Option<PushNotificationConfig>,
}

impl TaskRecord {
    fn new(task: Task) -> Self {
        Self {
            task,
            continuation: None,
            execution: None,
            push: None,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.execution
            .as_ref()
            .is_some_and(|e| e.generation == generation)
    }

    fn emit(&self, event: StreamEvent) {
        if let Some(execution) = &self.execution {
            // a caller that went away or no resubscribers is fine
            let _ = execution.events.send(event.clone());
            let _ = execution.caller.send(event);
        }
    }
}

struct Shared {
    tasks: Mutex<HashMap<String, TaskRecord>>,
    notifier: PushNotifier,
}

impl Shared {
    fn notify(&self, record: &TaskRecord) {
        if let Some(config) = &record.push {
            self.notifier.dispatch(config.clone(), record.task.clone());
        }
    }

    /// Move the task to `status`, returning whether the call has ended
    fn transition(
        &self,
        record: &mut TaskRecord,
        status: TaskStatus,
        continuation: Option<ContinuationHandle>,
    ) -> bool {
        let from = record.task.state();
        let to = status.state;
        if !from.can_transition_to(to) {
            tracing::warn!(task_id = %record.task.id, %from, %to, "Ignoring invalid status update");
            return false;
        }

        record.task.apply_status(status.clone());
        tracing::info!(task_id = %record.task.id, %from, %to, "Task state changed");
        self.notify(record);

        if to.is_terminal() {
            record.emit(StreamEvent::final_task(record.task.clone()));
        } else {
            let is_final = to == TaskState::InputRequired;
            record.emit(StreamEvent::status(record.task.id.clone(), status, is_final));
        }

        if !to.is_call_terminal() {
            return false;
        }
        record.continuation = continuation.filter(|_| to == TaskState::InputRequired);
        // dropping the sender ends every subscriber's stream
        record.execution = None;
        true
    }

    /// Apply one executor update, returning whether the call has ended
    async fn apply(&self, task_id: &str, generation: u64, update: TaskUpdate) -> bool {
        let mut tasks = self.tasks.lock().await;
        let Some(record) = tasks
            .get_mut(task_id)
            .filter(|record| record.is_current(generation))
        else {
            return true;
        };

        match update {
            TaskUpdate::Artifact(artifact) => {
                record.task.upsert_artifact(artifact.clone());
                record.emit(StreamEvent::artifact(task_id, artifact));
                false
            }
            TaskUpdate::Status { status, .. } if status.state == TaskState::Canceled => {
                tracing::warn!(task_id = %task_id, "Executors cannot cancel tasks, ignoring update");
                false
            }
            TaskUpdate::Status {
                status,
                continuation,
            } => self.transition(record, status, continuation),
        }
    }

    /// Settle a task whose executor returned without ending the call
    async fn finish(
        &self,
        task_id: &str,
        generation: u64,
        outcome: Result<anyhow::Result<()>, JoinError>,
    ) {
        let status = match outcome {
            Ok(Ok(())) => TaskStatus::new(TaskState::Completed),
            Ok(Err(e)) => {
                tracing::error!(task_id = %task_id, error = %format!("{:#}", e), "Executor failed");
                failure(format!("{:#}", e))
            }
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Executor panicked");
                failure("executor panicked".to_string())
            }
        };

        let mut tasks = self.tasks.lock().await;
        if let Some(record) = tasks
            .get_mut(task_id)
            .filter(|record| record.is_current(generation))
        {
            if !self.transition(record, status, None) {
                record.execution = None;
            }
        }
    }
}

impl Shared {
    /// The event that brings a lagging reader up to date
    async fn resync(&self, task_id: &str) -> A2AResult<StreamEvent> {
        let tasks = self.tasks.lock().await;
        let task = tasks
            .get(task_id)
            .map(|record| record.task.clone())
            .ok_or_else(|| A2AError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;

        Ok(match task.state() {
            state if state.is_terminal() => StreamEvent::final_task(task),
            state => StreamEvent::status(
                task.id.clone(),
                task.status.clone(),
                state == TaskState::InputRequired,
            ),
        })
    }
}

fn failure(diagnostic: String) -> TaskStatus {
    TaskStatus::new(TaskState::Failed)
        .with_message(Message::agent(format!("Error processing task: {}", diagnostic)))
}

/// Forward executor updates until the call ends, then settle the task
async fn drive(
    shared: Arc<Shared>,
    task_id: String,
    generation: u64,
    mut updates: mpsc::UnboundedReceiver<TaskUpdate>,
    mut execution: JoinHandle<anyhow::Result<()>>,
) {
    let outcome = loop {
        tokio::select! {
            biased;
            Some(update) = updates.recv() => {
                if shared.apply(&task_id, generation, update).await {
                    execution.abort();
                    return;
                }
            }
            outcome = &mut execution => break outcome,
        }
    };

    // updates sent right before the executor returned
    while let Ok(update) = updates.try_recv() {
        if shared.apply(&task_id, generation, update).await {
            return;
        }
    }

    shared.finish(&task_id, generation, outcome).await;
}

/// Live events for a resubscriber
///
/// A reader that lags behind the broadcast buffer gets the current status
/// instead of the events it missed, or the final task once the call ended.
fn resubscribed(
    shared: Arc<Shared>,
    task_id: String,
    events: broadcast::Receiver<StreamEvent>,
) -> impl Stream<Item = A2AResult<StreamEvent>> {
    BroadcastStream::new(events).then(move |item| {
        let shared = shared.clone();
        let task_id = task_id.clone();
        async move {
            match item {
                Ok(event) => Ok(event),
                Err(e) => {
                    tracing::warn!(task_id = %task_id, error = %e, "Resubscriber fell behind, resynchronizing");
                    shared.resync(&task_id).await
                }
            }
        }
    })
}

/// Stop after the event that ends the call, or after the first error
fn until_call_ends<S>(events: S) -> EventStream
where
    S: Stream<Item = A2AResult<StreamEvent>> + Send + 'static,
{
    events
        .scan(false, |ended, item| {
            if *ended {
                return future::ready(None);
            }
            *ended = item.as_ref().map_or(true, StreamEvent::ends_call);
            future::ready(Some(item))
        })
        .boxed()
}

/// Task manager keeping every task in memory
///
/// At most one execution runs per task id. A submission for a task that is
/// executing fails with [`A2AError::TaskBusy`], one for a finished task with
/// [`A2AError::InvalidTransition`]. A submission for a task waiting on input
/// resumes it and hands the executor the continuation it left behind.
///
/// Records are kept until [`remove`](Self::remove) or
/// [`purge_terminal`](Self::purge_terminal) drops them. Once a finished
/// task is dropped its id is free again, so resubmission is only rejected
/// while the record is retained.
pub struct InMemoryTaskManager<E> {
    executor: Arc<E>,
    shared: Arc<Shared>,
    config: TaskManagerConfig,
    push_notifications: bool,
    generations: AtomicU64,
}

impl<E: AgentExecutor> InMemoryTaskManager<E> {
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, TaskManagerConfig::default())
    }

    pub fn with_config(executor: E, config: TaskManagerConfig) -> Self {
        let notifier = PushNotifier::new(config.push_timeout);
        Self {
            executor: Arc::new(executor),
            shared: Arc::new(Shared {
                tasks: Mutex::new(HashMap::new()),
                notifier,
            }),
            config,
            push_notifications: false,
            generations: AtomicU64::new(0),
        }
    }

    /// Accept push notification configurations (off by default)
    pub fn with_push_notifications(mut self, enabled: bool) -> Self {
        self.push_notifications = enabled;
        self
    }

    /// Number of tasks known to this manager
    pub async fn len(&self) -> usize {
        self.shared.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forget a task that is not executing and return its last snapshot
    pub async fn remove(&self, task_id: &str) -> A2AResult<Task> {
        let mut tasks = self.shared.tasks.lock().await;
        match tasks.get(task_id) {
            None => Err(A2AError::TaskNotFound {
                task_id: task_id.to_string(),
            }),
            Some(record) if record.execution.is_some() => Err(A2AError::TaskBusy {
                task_id: task_id.to_string(),
            }),
            Some(_) => {
                let record = tasks.remove(task_id).ok_or_else(|| A2AError::TaskNotFound {
                    task_id: task_id.to_string(),
                })?;
                tracing::debug!(task_id = %task_id, "Task record removed");
                Ok(record.task)
            }
        }
    }

    /// Drop every finished task, returning how many were dropped
    pub async fn purge_terminal(&self) -> usize {
        let mut tasks = self.shared.tasks.lock().await;
        let before = tasks.len();
        tasks.retain(|_, record| record.execution.is_some() || !record.task.is_terminal());
        let purged = before - tasks.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = tasks.len(), "Finished tasks purged");
        }
        purged
    }

    fn ensure_push_supported(&self) -> A2AResult<()> {
        if self.push_notifications {
            Ok(())
        } else {
            Err(A2AError::PushNotificationNotSupported)
        }
    }

    /// Admit a submission and start its execution
    async fn start(&self, params: TaskSendParams) -> A2AResult<mpsc::UnboundedReceiver<StreamEvent>> {
        if params.push_notification.is_some() {
            self.ensure_push_supported()?;
        }

        let TaskSendParams {
            id,
            session_id,
            message,
            push_notification,
            metadata,
            ..
        } = params;

        let mut tasks = self.shared.tasks.lock().await;
        let record = tasks
            .entry(id.clone())
            .or_insert_with(|| TaskRecord::new(Task::new(id.clone(), session_id.clone())));

        if record.execution.is_some() {
            return Err(A2AError::TaskBusy { task_id: id });
        }
        let state = record.task.state();
        if state.is_terminal() {
            return Err(A2AError::InvalidTransition {
                task_id: id,
                from: state,
                to: TaskState::Submitted,
            });
        }

        let continuation = if state == TaskState::InputRequired {
            tracing::info!(task_id = %id, "Resuming task with follow-up input");
            record.task.status = TaskStatus::new(TaskState::Submitted);
            record.continuation.take()
        } else {
            tracing::info!(task_id = %id, session_id = %session_id, "Task submitted");
            None
        };

        record.task.history.push(message.clone());
        if metadata.is_some() {
            record.task.metadata = metadata.clone();
        }
        if push_notification.is_some() {
            record.push = push_notification;
        }
        self.shared.notify(record);

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let (events, _) = broadcast::channel(self.config.event_buffer.max(1));
        let (caller, receiver) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let context = ExecutionContext {
            task_id: id.clone(),
            session_id,
            message,
            history: record.task.history.clone(),
            continuation,
            metadata,
        };
        let executor = self.executor.clone();
        let updater = TaskUpdater::new(id.clone(), updates_tx);
        let handle = tokio::spawn(async move { executor.execute(context, updater).await });

        record.execution = Some(Execution {
            generation,
            caller,
            events,
            abort: handle.abort_handle(),
        });
        // the driver waits for the lock held here, so it sees the execution
        tokio::spawn(drive(self.shared.clone(), id, generation, updates_rx, handle));

        Ok(receiver)
    }

    async fn snapshot(&self, task_id: &str, history_length: Option<usize>) -> A2AResult<Task> {
        let tasks = self.shared.tasks.lock().await;
        tasks
            .get(task_id)
            .map(|record| record.task.with_history_length(history_length))
            .ok_or_else(|| A2AError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }
}

#[async_trait]
impl<E: AgentExecutor> TaskManager for InMemoryTaskManager<E> {
    async fn on_send_task(&self, params: TaskSendParams) -> A2AResult<Task> {
        let task_id = params.id.clone();
        let history_length = params.history_length;
        let mut events = self.start(params).await?;

        // the sender is dropped once the call has ended
        while events.recv().await.is_some() {}

        self.snapshot(&task_id, history_length).await
    }

    async fn on_send_task_streaming(&self, params: TaskSendParams) -> A2AResult<EventStream> {
        let events = self.start(params).await?;
        Ok(until_call_ends(UnboundedReceiverStream::new(events).map(Ok)))
    }

    async fn on_get_task(&self, params: TaskQueryParams) -> A2AResult<Task> {
        self.snapshot(&params.id, params.history_length).await
    }

    async fn on_cancel_task(&self, params: TaskIdParams) -> A2AResult<Task> {
        let mut tasks = self.shared.tasks.lock().await;
        let record = tasks
            .get_mut(&params.id)
            .ok_or_else(|| A2AError::TaskNotFound {
                task_id: params.id.clone(),
            })?;

        if record.task.is_terminal() {
            return Err(A2AError::TaskNotCancelable { task_id: params.id });
        }

        if let Some(execution) = &record.execution {
            execution.abort.abort();
        }
        self.shared
            .transition(record, TaskStatus::new(TaskState::Canceled), None);
        record.execution = None;

        Ok(record.task.clone())
    }

    async fn on_set_task_push_notification(
        &self,
        config: TaskPushNotificationConfig,
    ) -> A2AResult<TaskPushNotificationConfig> {
        self.ensure_push_supported()?;

        let mut tasks = self.shared.tasks.lock().await;
        let record = tasks
            .get_mut(&config.id)
            .ok_or_else(|| A2AError::TaskNotFound {
                task_id: config.id.clone(),
            })?;
        record.push = Some(config.push_notification_config.clone());

        tracing::debug!(task_id = %config.id, url = %config.push_notification_config.url, "Push notifications configured");
        Ok(config)
    }

    async fn on_get_task_push_notification(
        &self,
        params: TaskIdParams,
    ) -> A2AResult<Option<TaskPushNotificationConfig>> {
        self.ensure_push_supported()?;

        let tasks = self.shared.tasks.lock().await;
        let record = tasks.get(&params.id).ok_or_else(|| A2AError::TaskNotFound {
            task_id: params.id.clone(),
        })?;

        Ok(record
            .push
            .clone()
            .map(|push_notification_config| TaskPushNotificationConfig {
                id: params.id,
                push_notification_config,
            }))
    }

    async fn on_resubscribe_to_task(&self, params: TaskQueryParams) -> A2AResult<EventStream> {
        let tasks = self.shared.tasks.lock().await;
        let record = tasks.get(&params.id).ok_or_else(|| A2AError::TaskNotFound {
            task_id: params.id.clone(),
        })?;
        let task = record.task.with_history_length(params.history_length);

        match &record.execution {
            Some(execution) => {
                let receiver = execution.events.subscribe();
                let current = StreamEvent::status(task.id.clone(), task.status.clone(), false);
                let live = resubscribed(self.shared.clone(), params.id.clone(), receiver);
                Ok(until_call_ends(
                    stream::once(future::ready(Ok(current))).chain(live),
                ))
            }
            None => {
                let last = if task.requires_input() {
                    StreamEvent::status(task.id.clone(), task.status.clone(), true)
                } else {
                    StreamEvent::final_task(task)
                };
                Ok(stream::iter([Ok::<_, A2AError>(last)]).boxed())
            }
        }
    }
}
