//! Bounded background work.
//!
//! Long external operations (browser automation, transcoding, remote AI
//! calls) run after the engine has already committed the step and replied.
//! A [`BackgroundTask`] is a boxed future plus the text to send if it fails;
//! the [`TaskSupervisor`] runs it under a timeout and sends exactly one
//! terminal notification.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use oladizz_core::{BoxedOutbound, ChatId, Reply};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info_span, warn};

use crate::error::{HandlerError, HandlerResult};

/// A unit of deferred work tied to one chat.
///
/// The future resolves to the success notification, or `None` if it already
/// delivered its own output.
pub struct BackgroundTask {
    name: &'static str,
    failure: Reply,
    future: BoxFuture<'static, HandlerResult<Option<Reply>>>,
}

impl BackgroundTask {
    pub fn new<F>(name: &'static str, failure: impl Into<Reply>, future: F) -> Self
    where
        F: Future<Output = HandlerResult<Option<Reply>>> + Send + 'static,
    {
        Self {
            name,
            failure: failure.into(),
            future: Box::pin(future),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Runs background tasks with a timeout and tracks them for shutdown.
#[derive(Clone)]
pub struct TaskSupervisor {
    tracker: TaskTracker,
    outbound: BoxedOutbound,
    timeout: Duration,
}

impl TaskSupervisor {
    pub fn new(outbound: BoxedOutbound, timeout: Duration) -> Self {
        Self {
            tracker: TaskTracker::new(),
            outbound,
            timeout,
        }
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Starts `task` for `chat`.
    pub fn spawn(&self, chat: ChatId, task: BackgroundTask) {
        let outbound = self.outbound.clone();
        let timeout = self.timeout;
        let BackgroundTask {
            name,
            failure,
            future,
        } = task;
        let span = info_span!("task", task = name, chat = %chat);

        self.tracker.spawn(
            async move {
                let notice = match tokio::time::timeout(timeout, future).await {
                    Ok(Ok(done)) => {
                        debug!("Background task finished");
                        done
                    }
                    Ok(Err(err)) => {
                        warn!(error = %err, "Background task failed");
                        Some(failure_reply(err, failure))
                    }
                    Err(_) => {
                        warn!(timeout_secs = timeout.as_secs(), "Background task timed out");
                        Some(failure)
                    }
                };
                if let Some(reply) = notice
                    && let Err(e) = outbound.send_text(chat, &reply).await
                {
                    warn!(error = %e, "Failed to deliver task notification");
                }
            }
            .instrument(span),
        );
    }

    /// Waits up to `grace` for running tasks.
    ///
    /// Returns `true` if every task finished in time. New tasks may be
    /// spawned again afterwards.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tracker.close();
        let finished = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        finished
    }
}

/// External failures carry their own categorized apology.
fn failure_reply(err: HandlerError, fallback: Reply) -> Reply {
    match err {
        HandlerError::External { .. } | HandlerError::Validation { .. } => {
            Reply::text(err.user_message())
        }
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingOutbound;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_success_notification() {
        let outbound = Arc::new(RecordingOutbound::new());
        let tasks = TaskSupervisor::new(outbound.clone(), Duration::from_secs(5));
        tasks.spawn(
            ChatId(1),
            BackgroundTask::new("ok", "failed", async { Ok(Some(Reply::text("done"))) }),
        );
        assert!(tasks.drain(Duration::from_secs(5)).await);
        assert_eq!(outbound.texts(), vec!["done"]);
    }

    #[tokio::test]
    async fn test_failure_sends_failure_text_once() {
        let outbound = Arc::new(RecordingOutbound::new());
        let tasks = TaskSupervisor::new(outbound.clone(), Duration::from_secs(5));
        tasks.spawn(
            ChatId(1),
            BackgroundTask::new("boom", "Could not take a screenshot.", async {
                Err(HandlerError::tool("chromium exited with 1"))
            }),
        );
        tasks.drain(Duration::from_secs(5)).await;
        assert_eq!(outbound.texts(), vec!["Could not take a screenshot."]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_sends_failure_text() {
        let outbound = Arc::new(RecordingOutbound::new());
        let tasks = TaskSupervisor::new(outbound.clone(), Duration::from_secs(1));
        tasks.spawn(
            ChatId(1),
            BackgroundTask::new("slow", "Timed out.", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Some(Reply::text("too late")))
            }),
        );
        assert!(tasks.drain(Duration::from_secs(10)).await);
        assert_eq!(outbound.texts(), vec!["Timed out."]);
        assert_eq!(tasks.in_flight(), 0);
    }
}
