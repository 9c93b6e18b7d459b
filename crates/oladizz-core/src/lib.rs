//! # Oladizz Core
//!
//! Leaf types shared by every layer of the Oladizz bot:
//!
//! - [`ChatId`], [`MessageId`] and [`FileRef`] identities
//! - The inbound event model ([`InboundEvent`], [`EventKind`], [`Command`])
//! - The closed set of conversational steps ([`ActionTag`])
//! - Per-chat state ([`ChatState`]) and the four-way [`Transition`]
//! - The [`StateStore`] abstraction with memory and file backends
//! - The [`Outbound`] messaging surface and the [`UpdateSource`] feeding events in
//! - Scoped temporary files ([`TempArtifact`])
//!
//! Nothing in this crate knows about a concrete messaging platform or about
//! any feature handler.

pub mod action;
pub mod artifact;
pub mod error;
pub mod event;
pub mod ids;
pub mod outbound;
pub mod source;
pub mod state;
pub mod store;
pub mod transition;

pub use action::ActionTag;
pub use artifact::TempArtifact;
pub use error::{ApiError, ApiResult, StoreError, StoreResult};
pub use event::{Command, EventKind, EventPayload, EventSink, InboundEvent};
pub use ids::{ChatId, FileRef, MessageId};
pub use outbound::{
    BoxedOutbound, Button, ChatAction, FileKind, Keyboard, Outbound, OutboundFile, Reply,
    TextFormat,
};
pub use source::{BoxedUpdateSource, UpdateSource};
pub use state::{ActionSlot, ChatState, Document, Scratch, fields};
pub use store::{BoxedStateStore, FileStateStore, MemoryStateStore, Mutation, StateStore};
pub use transition::{FieldOp, FieldUpdate, Transition, apply_updates};
