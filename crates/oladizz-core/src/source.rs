//! The inbound side of a messaging platform.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ApiResult;
use crate::event::EventSink;

/// A producer of [`InboundEvent`](crate::event::InboundEvent)s.
///
/// `run` keeps receiving until `shutdown` is cancelled and hands every event
/// to `sink` in arrival order. Transient transport failures are the source's
/// own business; an `Err` return means it gave up for good.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn run(&self, sink: EventSink, shutdown: CancellationToken) -> ApiResult<()>;
}

/// Type-erased update source.
pub type BoxedUpdateSource = Arc<dyn UpdateSource>;
