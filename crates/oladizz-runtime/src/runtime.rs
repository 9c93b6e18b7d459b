//! Process lifecycle.
//!
//! [`OladizzRuntime`] owns the validated configuration and runs one
//! [`ConversationEngine`] against one [`UpdateSource`]:
//!
//! ```text
//! UpdateSource ──► EventSink ──► spawn ──► ConcurrencyLimit<ConversationEngine>
//!                                              │
//! Ctrl+C / SIGTERM ──► cancel source ──► wait for events ──► drain tasks
//! ```
//!
//! ```rust,ignore
//! let runtime = OladizzRuntime::builder().profile("production").build()?;
//! let store = runtime.open_store().await?;
//! let engine = ConversationEngine::builder(store, outbound).build()?;
//! runtime.run(engine, source).await?;
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oladizz_core::{
    ApiError, BoxedStateStore, BoxedUpdateSource, EventSink, FileStateStore, InboundEvent,
    MemoryStateStore,
};
use oladizz_framework::ConversationEngine;
use tokio::signal;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;
use tower::limit::ConcurrencyLimit;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ConfigLoader, OladizzConfig, StoreBackend, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::health::HealthServer;
use crate::logging;

/// The long-running bot process.
#[derive(Debug, Clone)]
pub struct OladizzRuntime {
    config: OladizzConfig,
}

impl OladizzRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config` and installs logging from it.
    pub fn from_config(config: OladizzConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            store = ?config.store.backend,
            max_concurrent_events = config.runtime.max_concurrent_events,
            "Runtime initialized from configuration"
        );

        Ok(Self { config })
    }

    pub fn config(&self) -> &OladizzConfig {
        &self.config
    }

    /// Opens the configured state store.
    pub async fn open_store(&self) -> RuntimeResult<BoxedStateStore> {
        let store: BoxedStateStore = match self.config.store.backend {
            StoreBackend::Memory => {
                warn!("Using the in-memory store; chat state is lost on restart");
                Arc::new(MemoryStateStore::new())
            }
            StoreBackend::File => Arc::new(FileStateStore::open(&self.config.store.data_dir).await?),
        };
        Ok(store)
    }

    /// Creates the temporary artifact root and returns it.
    pub async fn prepare_temp_dir(&self) -> RuntimeResult<PathBuf> {
        let dir = self.config.runtime.temp_dir.clone();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Temporary directory ready");
        Ok(dir)
    }

    pub fn temp_dir(&self) -> &Path {
        &self.config.runtime.temp_dir
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self, engine: ConversationEngine, source: BoxedUpdateSource) -> RuntimeResult<()> {
        self.run_until(engine, source, wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or the source stops.
    ///
    /// On the way out, polling is cancelled first, then in-flight events and
    /// background tasks get the configured grace period each.
    pub async fn run_until<F>(
        &self,
        engine: ConversationEngine,
        source: BoxedUpdateSource,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let stop = CancellationToken::new();

        let health = if self.config.health.enabled {
            Some(HealthServer::bind(&self.config.health, stop.child_token()).await?)
        } else {
            None
        };

        let events = TaskTracker::new();
        let limit = Arc::new(Semaphore::new(self.config.runtime.max_concurrent_events));
        let sink = event_sink(engine.clone(), limit, events.clone());

        let name = source.name().to_string();
        let mut poller = {
            let source = source.clone();
            let stop = stop.clone();
            tokio::spawn(async move { source.run(sink, stop).await })
        };

        info!(source = %name, "Oladizz is running. Press Ctrl+C to stop.");

        let finished = tokio::select! {
            _ = shutdown => {
                info!("Shutdown requested");
                None
            }
            joined = &mut poller => {
                warn!(source = %name, "Update source stopped");
                Some(joined)
            }
        };

        stop.cancel();
        let joined = match finished {
            Some(joined) => joined,
            None => poller.await,
        };

        let grace = self.config.runtime.shutdown_grace();
        events.close();
        if tokio::time::timeout(grace, events.wait()).await.is_err() {
            warn!(in_flight = events.len(), "Events still running after grace period");
        }
        if !engine.tasks().drain(grace).await {
            warn!(
                in_flight = engine.tasks().in_flight(),
                "Background tasks still running after grace period"
            );
        }

        if let Some(health) = health {
            health.stopped().await;
        }

        info!("Oladizz stopped");

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(RuntimeError::Source { name, source }),
            Err(e) => Err(RuntimeError::Source {
                name,
                source: ApiError::Other(e.to_string()),
            }),
        }
    }
}

/// Builds the sink handed to the update source.
///
/// Every event is handled on its own task; the shared semaphore bounds how
/// many are inside the engine at once.
fn event_sink(engine: ConversationEngine, limit: Arc<Semaphore>, events: TaskTracker) -> EventSink {
    Arc::new(move |event: InboundEvent| {
        let service = ConcurrencyLimit::with_semaphore(engine.clone(), limit.clone());
        events.spawn(async move {
            let chat = event.chat;
            match service.oneshot(event).await {
                Ok(dispatch) => trace!(chat = %chat, ?dispatch, "Event handled"),
                Err(never) => match never {},
            }
        });
    })
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Cannot listen for Ctrl+C");
            futures::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration and builds an [`OladizzRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides one key, e.g. `.set("store.backend", "memory")`.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    pub fn build(self) -> RuntimeResult<OladizzRuntime> {
        let config = self.config_loader.load()?;
        OladizzRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
