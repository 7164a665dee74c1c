//! Out-of-band delivery of task updates

use std::time::Duration;

use crate::protocol::task::{PushNotificationConfig, Task};

/// Posts task snapshots to the URL a caller registered for the task
///
/// Delivery is best effort: failures are logged and never reach the task.
#[derive(Debug, Clone)]
pub struct PushNotifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl PushNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Deliver `task` to `config.url`, returning whether the receiver accepted it
    pub async fn notify(&self, config: &PushNotificationConfig, task: &Task) -> bool {
        let mut request = self
            .client
            .post(&config.url)
            .timeout(self.timeout)
            .json(task);
        if let Some(token) = &config.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(task_id = %task.id, url = %config.url, "Push notification sent");
                true
            }
            Ok(response) => {
                tracing::error!(
                    task_id = %task.id,
                    url = %config.url,
                    status = %response.status(),
                    "Push notification rejected"
                );
                false
            }
            Err(e) => {
                tracing::error!(task_id = %task.id, url = %config.url, error = %e, "Push notification failed");
                false
            }
        }
    }

    /// Deliver in the background
    pub fn dispatch(&self, config: PushNotificationConfig, task: Task) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify(&config, &task).await;
        });
    }
}
