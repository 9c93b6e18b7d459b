//! # Oladizz Framework
//!
//! The per-chat conversation machinery of the Oladizz bot.
//!
//! # Architecture
//!
//! ```text
//! InboundEvent
//!     │
//!     ▼
//! ConversationEngine ── commands ──► run_command
//!     │                 selections ─► MenuRouter
//!     │                 pending ───► ActionRegistry ─► ActionHandler
//!     ▼
//! Step { Transition, Outgoing*, BackgroundTask? }
//!     │
//!     ├─► StateStore::transact   (commit)
//!     ├─► Outbound               (replies)
//!     └─► TaskSupervisor         (deferred work)
//! ```
//!
//! Handlers never write the store themselves; they return a [`Step`] and the
//! engine applies its [`Transition`](oladizz_core::Transition) atomically.

pub mod command;
pub mod context;
pub mod engine;
pub mod error;
pub mod handler;
pub mod menu;
pub mod registry;
pub mod replies;
pub mod step;
pub mod task;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::run_command;
pub use context::{ActionContext, Services};
pub use engine::{ConversationEngine, Dispatch, EngineBuilder};
pub use error::{FailureCategory, FrameworkError, FrameworkResult, HandlerError, HandlerResult};
pub use handler::{ActionHandler, BoxedHandler, into_handler};
pub use menu::{BACK_LABEL, MenuRouter, Route};
pub use registry::ActionRegistry;
pub use step::{FollowUp, Outgoing, Step};
pub use task::{BackgroundTask, TaskSupervisor};
