//! Receiving-side view of a task under a streaming call

use crate::protocol::{
    error::{A2AError, A2AResult},
    event::StreamEvent,
    message::Message,
    task::{Task, TaskSendParams, TaskState},
};

/// What applying one event did to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The view changed
    Applied,

    /// Not understood, passed through untouched
    Ignored,

    /// About another task; dropped
    Stale,
}

/// How a streaming call ended
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The task reached a terminal state
    Final,

    /// The agent asked for more input; resubmit under the same task id
    Suspended { prompt: Option<Message> },

    /// The exchange broke before a final result
    Aborted { reason: String },
}

/// Result of a streaming call
#[derive(Debug, Clone)]
pub struct StreamCompletion {
    /// Task as reconstructed from the events received
    pub task: Task,
    pub outcome: StreamOutcome,
}

impl StreamCompletion {
    pub fn is_final(&self) -> bool {
        self.outcome == StreamOutcome::Final
    }

    pub fn requires_input(&self) -> bool {
        matches!(self.outcome, StreamOutcome::Suspended { .. })
    }

    /// Prompt text of a suspended call
    pub fn prompt_text(&self) -> Option<String> {
        match &self.outcome {
            StreamOutcome::Suspended { prompt } => prompt.as_ref()?.text_content(),
            _ => None,
        }
    }
}

/// Folds stream events into a task snapshot
///
/// Status updates replace the status and append their message to the history,
/// artifact updates are upserted by artifact id and a final task replaces the
/// whole view. Events after the task is terminal are out of order.
#[derive(Debug, Clone)]
pub struct TaskTracker {
    task: Task,
}

impl TaskTracker {
    /// Start from an existing snapshot
    pub fn from_task(task: Task) -> Self {
        Self { task }
    }

    /// Start from the submission that opens the call
    pub fn for_submission(params: &TaskSendParams) -> Self {
        let mut task = Task::new(params.id.clone(), params.session_id.clone());
        task.history.push(params.message.clone());
        Self { task }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn into_task(self) -> Task {
        self.task
    }

    pub fn apply(&mut self, event: &StreamEvent) -> A2AResult<Reconciled> {
        match event.task_id() {
            Some(id) if id != self.task.id => {
                tracing::warn!(expected = %self.task.id, received = %id, "Dropping event for another task");
                return Ok(Reconciled::Stale);
            }
            _ => {}
        }

        if self.task.is_terminal() && !matches!(event, StreamEvent::Unknown { .. }) {
            return Err(A2AError::Protocol(format!(
                "Received {} event after task {} became {}",
                event.kind(),
                self.task.id,
                self.task.state()
            )));
        }

        match event {
            StreamEvent::StatusUpdate(update) => {
                self.task.apply_status(update.status.clone());
            }
            StreamEvent::ArtifactUpdate(update) => {
                self.task.upsert_artifact(update.artifact.clone());
            }
            StreamEvent::FinalTask(task) => {
                self.task = task.as_ref().clone();
            }
            StreamEvent::Unknown { kind, .. } => {
                tracing::debug!(kind = %kind, "Ignoring unknown event kind");
                return Ok(Reconciled::Ignored);
            }
        }

        Ok(Reconciled::Applied)
    }

    /// Outcome of a call whose event sequence ended cleanly
    pub fn outcome(&self) -> StreamOutcome {
        match self.task.state() {
            state if state.is_terminal() => StreamOutcome::Final,
            TaskState::InputRequired => StreamOutcome::Suspended {
                prompt: self.task.status.message.clone(),
            },
            state => StreamOutcome::Aborted {
                reason: format!("Stream ended while task was {}", state),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::task::{Artifact, TaskStatus};

    use super::*;

    fn tracker() -> TaskTracker {
        TaskTracker::for_submission(&TaskSendParams::new("t1", "s1", Message::user("go")))
    }

    #[test]
    fn test_reconcile_status_and_artifacts() {
        let mut tracker = tracker();

        tracker
            .apply(&StreamEvent::status("t1", TaskStatus::new(TaskState::Working), false))
            .unwrap();
        tracker
            .apply(&StreamEvent::artifact("t1", Artifact::text("a1", "draft", "v1")))
            .unwrap();
        tracker
            .apply(&StreamEvent::artifact("t1", Artifact::text("a1", "draft", "v2")))
            .unwrap();

        let task = tracker.task();
        assert_eq!(task.state(), TaskState::Working);
        assert_eq!(task.artifacts.len(), 1);
        assert_eq!(task.artifacts[0].parts[0].as_text(), Some("v2"));
        assert_eq!(task.history.len(), 1);
    }

    #[test]
    fn test_stale_events_are_dropped() {
        let mut tracker = tracker();
        let reconciled = tracker
            .apply(&StreamEvent::status("other", TaskStatus::new(TaskState::Failed), true))
            .unwrap();

        assert_eq!(reconciled, Reconciled::Stale);
        assert_eq!(tracker.task().state(), TaskState::Submitted);
    }

    #[test]
    fn test_final_task_replaces_view() {
        let mut tracker = tracker();
        let mut done = Task::new("t1", "s1");
        done.apply_status(TaskStatus::new(TaskState::Completed).with_message(Message::agent("ok")));

        tracker.apply(&StreamEvent::final_task(done.clone())).unwrap();
        assert_eq!(tracker.task(), &done);
        assert_eq!(tracker.outcome(), StreamOutcome::Final);
    }

    #[test]
    fn test_event_after_final_is_out_of_order() {
        let mut tracker = tracker();
        let mut done = Task::new("t1", "s1");
        done.status = TaskStatus::new(TaskState::Completed);
        tracker.apply(&StreamEvent::final_task(done)).unwrap();

        let result = tracker.apply(&StreamEvent::artifact("t1", Artifact::text("a1", "late", "x")));
        assert!(matches!(result, Err(A2AError::Protocol(_))));
    }

    #[test]
    fn test_suspended_outcome_carries_prompt() {
        let mut tracker = tracker();
        tracker
            .apply(&StreamEvent::status(
                "t1",
                TaskStatus::new(TaskState::InputRequired).with_message(Message::agent("which?")),
                true,
            ))
            .unwrap();

        match tracker.outcome() {
            StreamOutcome::Suspended { prompt } => {
                assert_eq!(prompt.unwrap().text_content().as_deref(), Some("which?"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_unfinished_stream_is_aborted() {
        let mut tracker = tracker();
        tracker
            .apply(&StreamEvent::status("t1", TaskStatus::new(TaskState::Working), false))
            .unwrap();
        assert!(matches!(tracker.outcome(), StreamOutcome::Aborted { .. }));
    }
}
