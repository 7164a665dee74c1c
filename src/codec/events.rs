//! Decoding of streaming exchanges into typed events
//!
//! [`EventDecoder`] consumes the raw envelope frames of one streaming call
//! and yields [`StreamEvent`]s in arrival order. The sequence is lazy, finite
//! and cannot be restarted:
//!
//! - it ends right after a [`StreamEvent::FinalTask`] or a status update
//!   flagged `final`, dropping the connection even if more bytes are buffered;
//! - a close after the task reported `input-required` is a normal end;
//! - any other close yields one [`A2AError::AbnormalTermination`];
//! - a corrupt frame yields one error after every earlier event was
//!   delivered, then the sequence ends;
//! - events naming another task are discarded.

use std::{
    pin::Pin,
    sync::Arc,
    task::{ready, Context, Poll},
};

use futures::Stream;

use crate::{
    codec::{Codec, RequestId},
    protocol::{
        error::{A2AError, A2AResult},
        event::StreamEvent,
        task::TaskState,
    },
    transport::FrameStream,
};

/// Typed view over the frames of one streaming call
pub struct EventDecoder {
    /// `None` once the sequence is finished; dropping it closes the connection
    frames: Option<FrameStream>,
    codec: Arc<dyn Codec>,
    task_id: String,
    request_id: Option<RequestId>,
    /// Last observed state was `input-required`
    suspended: bool,
}

impl EventDecoder {
    /// Decode `frames` for the task `task_id`
    pub fn new(frames: FrameStream, codec: Arc<dyn Codec>, task_id: impl Into<String>) -> Self {
        Self {
            frames: Some(frames),
            codec,
            task_id: task_id.into(),
            request_id: None,
            suspended: false,
        }
    }

    /// Require every frame to carry `request_id`
    pub fn correlated_with(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Task whose events this decoder delivers
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Whether the sequence has ended
    pub fn is_finished(&self) -> bool {
        self.frames.is_none()
    }

    fn finish(&mut self) {
        self.frames = None;
    }

    /// Decode one frame, returning `None` for an event that must be discarded
    fn decode(&self, frame: &str) -> A2AResult<Option<StreamEvent>> {
        let event = self.codec.decode_event(frame, self.request_id.as_ref())?;

        match event.task_id() {
            Some(id) if id != self.task_id => {
                tracing::warn!(
                    task_id = %self.task_id,
                    event_task_id = %id,
                    kind = %event.kind(),
                    "Discarding event for another task"
                );
                Ok(None)
            }
            _ => Ok(Some(event)),
        }
    }

    fn observe(&mut self, event: &StreamEvent) {
        if event.ends_call() {
            self.finish();
        } else if let Some(state) = event.state() {
            self.suspended = state == TaskState::InputRequired;
        }
    }
}

impl Stream for EventDecoder {
    type Item = A2AResult<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            let Some(frames) = this.frames.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(frames.as_mut().poll_next(cx)) {
                Some(Ok(frame)) => match this.decode(&frame) {
                    Ok(Some(event)) => {
                        this.observe(&event);
                        return Poll::Ready(Some(Ok(event)));
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(task_id = %this.task_id, error = %e, "Streaming exchange broken");
                        this.finish();
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(task_id = %this.task_id, error = %e, "Transport failed mid-stream");
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.finish();
                    if this.suspended {
                        tracing::debug!(task_id = %this.task_id, "Stream closed while awaiting input");
                        return Poll::Ready(None);
                    }
                    tracing::warn!(task_id = %this.task_id, "Stream closed before a final result");
                    return Poll::Ready(Some(Err(A2AError::AbnormalTermination {
                        task_id: this.task_id.clone(),
                    })));
                }
            }
        }
    }
}
