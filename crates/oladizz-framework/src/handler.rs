//! Handler trait and type erasure.
//!
//! Any `async fn(ActionContext) -> HandlerResult` is an [`ActionHandler`]:
//!
//! ```rust,ignore
//! async fn text_to_pdf(ctx: ActionContext) -> HandlerResult {
//!     let text = ctx.text().unwrap_or_default();
//!     // ...
//!     Ok(Step::clear())
//! }
//!
//! let registry = ActionRegistry::new()
//!     .on(ActionTag::AwaitingTextForPdf, &[EventKind::Text], text_to_pdf);
//! ```
//!
//! Registries store handlers as [`BoxedHandler`]s.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::ActionContext;
use crate::error::HandlerResult;

/// A function that handles one event for one action.
pub trait ActionHandler: Clone + Send + Sync + 'static {
    fn call(self, ctx: ActionContext) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> ActionHandler for F
where
    F: FnOnce(ActionContext) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(self, ctx: ActionContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(ctx))
    }
}

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn Fn(ActionContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Converts a handler into a boxed handler.
pub fn into_handler<H: ActionHandler>(handler: H) -> BoxedHandler {
    Arc::new(move |ctx| handler.clone().call(ctx))
}
