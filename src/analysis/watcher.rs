//! Waits for one compute task through both webhook events and polling

use crate::installation::InstallationLookup;
use crate::sonar::{HttpClient, ProjectInformation, ProjectResolver};
use crate::webhook::{ListenerRegistry, TaskCompleted};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The task to wait for and where to resolve it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub installation: String,
    pub server_url: String,
    pub project_url: Option<String>,
    pub task_id: String,
}

pub struct AnalysisWatcher<C, I> {
    resolver: Arc<ProjectResolver<C, I>>,
    listeners: Arc<ListenerRegistry>,
    poll_interval: Duration,
}

impl<C: HttpClient, I: InstallationLookup> AnalysisWatcher<C, I> {
    pub fn new(
        resolver: Arc<ProjectResolver<C, I>>,
        listeners: Arc<ListenerRegistry>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            resolver,
            listeners,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Wait until the result of `request` resolves or `timeout` elapses.
    ///
    /// The listener is registered before the first poll so a webhook that
    /// lands in between is not lost. A webhook for the task triggers an
    /// immediate resolve; otherwise the resolver is polled on a fixed
    /// interval. Dropping the returned future unregisters the listener.
    pub async fn watch(
        &self,
        request: &WatchRequest,
        timeout: Duration,
    ) -> Option<ProjectInformation> {
        let (tx, mut events) = mpsc::unbounded_channel::<TaskCompleted>();
        let task_id = request.task_id.clone();
        let _subscription = self.listeners.subscribe(Arc::new(
            move |event: &TaskCompleted| -> anyhow::Result<()> {
                if event.task_id == task_id {
                    // Receiver gone means the watch already finished
                    let _ = tx.send(event.clone());
                }
                Ok(())
            },
        ));

        let wait = async {
            if let Some(info) = self.poll(request).await {
                return Some(info);
            }

            let mut ticker =
                time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    Some(event) = events.recv() => {
                        debug!(
                            "Webhook for task {} received ({}), resolving",
                            event.task_id, event.status
                        );
                    }
                    _ = ticker.tick() => {}
                }

                if let Some(info) = self.poll(request).await {
                    return Some(info);
                }
            }
        };

        match time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    "Gave up waiting for task {} after {:?}",
                    request.task_id, timeout
                );
                None
            }
        }
    }

    async fn poll(&self, request: &WatchRequest) -> Option<ProjectInformation> {
        self.resolver
            .resolve(
                &request.server_url,
                request.project_url.as_deref(),
                &request.task_id,
                &request.installation,
            )
            .await
    }
}
