//! Long polling update source.
//!
//! Repeatedly calls `getUpdates` with the offset just past the last seen
//! update, so every update is handed to the sink exactly once and in order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use oladizz_core::{ApiError, ApiResult, EventSink, UpdateSource};

use crate::api_caller::ApiCaller;
use crate::config::TelegramSettings;
use crate::model::{GetUpdates, Update};

/// Update types the bot subscribes to.
pub const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Receives updates through `getUpdates`.
#[derive(Debug, Clone)]
pub struct LongPolling {
    caller: Arc<ApiCaller>,
    poll_timeout: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl LongPolling {
    pub fn new(caller: Arc<ApiCaller>, settings: &TelegramSettings) -> Self {
        Self {
            caller,
            poll_timeout: settings.poll_timeout,
            initial_backoff: settings.initial_backoff,
            max_backoff: settings.max_backoff,
        }
    }
}

/// A bad token shows up as 401 or 404; retrying cannot fix either.
fn is_fatal(err: &ApiError) -> bool {
    matches!(err, ApiError::Rejected { code: 401 | 404, .. })
}

#[async_trait]
impl UpdateSource for LongPolling {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn run(&self, sink: EventSink, shutdown: CancellationToken) -> ApiResult<()> {
        let mut offset: Option<i64> = None;
        let mut backoff = self.initial_backoff;
        info!(timeout = ?self.poll_timeout, "Long polling started");

        loop {
            let request = GetUpdates {
                offset,
                timeout: self.poll_timeout.as_secs(),
                allowed_updates: ALLOWED_UPDATES,
            };

            let result = tokio::select! {
                _ = shutdown.cancelled() => break,
                r = self.caller.call::<_, Vec<Update>>("getUpdates", &request) => r,
            };

            match result {
                Ok(updates) => {
                    backoff = self.initial_backoff;
                    for update in updates {
                        let id = update.update_id;
                        offset = Some(id + 1);
                        match update.into_event() {
                            Some(event) => sink(event),
                            None => trace!(update_id = id, "Ignoring unhandled update"),
                        }
                    }
                }
                Err(e) if is_fatal(&e) => {
                    error!(error = %e, "Bot API refused the token");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, retry_in = ?backoff, "Polling failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }

        info!("Long polling stopped");
        Ok(())
    }
}
