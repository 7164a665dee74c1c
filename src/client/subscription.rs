//! Pull-style consumption of a streaming exchange

use std::{
    collections::HashSet,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    codec::EventDecoder,
    protocol::{
        error::{A2AError, A2AResult},
        event::StreamEvent,
    },
};

/// Task ids with an open stream on one client
#[derive(Debug, Clone, Default)]
pub(crate) struct StreamRegistry(Arc<Mutex<HashSet<String>>>);

impl StreamRegistry {
    /// Claim the stream slot for `task_id`
    pub(crate) fn acquire(&self, task_id: &str) -> A2AResult<StreamSlot> {
        let mut open = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !open.insert(task_id.to_string()) {
            return Err(A2AError::StreamInProgress {
                task_id: task_id.to_string(),
            });
        }
        Ok(StreamSlot {
            registry: self.clone(),
            task_id: task_id.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self, task_id: &str) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(task_id)
    }
}

/// Releases its task id from the registry when dropped
#[derive(Debug)]
pub(crate) struct StreamSlot {
    registry: StreamRegistry,
    task_id: String,
}

impl Drop for StreamSlot {
    fn drop(&mut self) {
        self.registry
            .0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.task_id);
    }
}

/// Aborts the pump when the subscription goes away
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Events of one streaming call, in arrival order
///
/// A background task reads the connection and feeds a bounded channel, so a
/// slow consumer applies backpressure instead of buffering without limit.
/// Dropping the subscription stops delivery at once and closes the
/// connection. The last item is an `Err` when the exchange broke.
pub struct TaskSubscription {
    task_id: String,
    events: ReceiverStream<A2AResult<StreamEvent>>,
    _pump: AbortOnDrop,
    _slot: StreamSlot,
}

impl TaskSubscription {
    pub(crate) fn spawn(decoder: EventDecoder, buffer: usize, slot: StreamSlot) -> Self {
        let task_id = decoder.task_id().to_string();
        let (tx, rx) = mpsc::channel(buffer.max(1));

        let pump = tokio::spawn(async move {
            let mut decoder = decoder;
            while let Some(item) = decoder.next().await {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        Self {
            task_id,
            events: ReceiverStream::new(rx),
            _pump: AbortOnDrop(pump),
            _slot: slot,
        }
    }

    /// Task this subscription follows
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Stop receiving events and release the connection
    pub fn close(self) {
        tracing::debug!(task_id = %self.task_id, "Closing task subscription");
    }
}

impl Stream for TaskSubscription {
    type Item = A2AResult<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for TaskSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSubscription")
            .field("task_id", &self.task_id)
            .finish()
    }
}
