//! Per-event handler context.
//!
//! An [`ActionContext`] is built by the engine for every handler invocation.
//! It bundles the inbound event, the state snapshot loaded at the start of
//! the event, the outbound surface and the shared [`Services`] map through
//! which feature handlers reach their clients.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oladizz_core::{BoxedOutbound, ChatId, ChatState, InboundEvent, MessageId, Scratch};

use crate::error::{HandlerError, HandlerResult};

// =============================================================================
// Services
// =============================================================================

type ServiceArc = Arc<dyn Any + Send + Sync>;

/// A typed map of shared services, keyed by type.
///
/// Values are stored as `Arc<T>`, so `T` may be a trait object.
#[derive(Clone, Default)]
pub struct Services {
    inner: Arc<HashMap<TypeId, ServiceArc>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service (builder pattern). A later value of the same type
    /// replaces the earlier one.
    pub fn with<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        Arc::make_mut(&mut self.inner).insert(TypeId::of::<T>(), Arc::new(service));
        self
    }

    /// Looks up a service by type.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner
            .get(&TypeId::of::<T>())
            .and_then(|arc| arc.downcast_ref::<Arc<T>>().map(Arc::clone))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.inner.len())
            .finish()
    }
}

// =============================================================================
// ActionContext
// =============================================================================

/// Everything a handler receives.
#[derive(Clone)]
pub struct ActionContext {
    event: Arc<InboundEvent>,
    state: Arc<ChatState>,
    outbound: BoxedOutbound,
    services: Services,
    temp_dir: Arc<Path>,
    param: Option<Arc<str>>,
}

impl ActionContext {
    pub fn new(
        event: Arc<InboundEvent>,
        state: Arc<ChatState>,
        outbound: BoxedOutbound,
        services: Services,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        let temp_dir: PathBuf = temp_dir.into();
        Self {
            event,
            state,
            outbound,
            services,
            temp_dir: Arc::from(temp_dir),
            param: None,
        }
    }

    /// Attaches a selection parameter (builder pattern).
    pub(crate) fn with_param(mut self, param: &str) -> Self {
        self.param = Some(Arc::from(param));
        self
    }

    pub fn chat(&self) -> ChatId {
        self.event.chat
    }

    pub fn event(&self) -> &InboundEvent {
        &self.event
    }

    /// The state loaded before the handler ran.
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn scratch(&self) -> &Scratch {
        self.state.scratch()
    }

    pub fn outbound(&self) -> &BoxedOutbound {
        &self.outbound
    }

    /// Directory for temporary artifacts.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// The part of a prefixed menu selection after the prefix.
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    /// Trimmed text of a text event.
    pub fn text(&self) -> Option<&str> {
        self.event.text_content().map(str::trim)
    }

    /// The user's message id, if the event carries one.
    pub fn message_id(&self) -> Option<MessageId> {
        self.event.message_id
    }

    /// The id of the message holding a pressed keyboard.
    pub fn callback_message(&self) -> Option<MessageId> {
        self.event.callback_message()
    }

    /// Looks up a service by type.
    pub fn service<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Looks up a service, failing the handler if it is not configured.
    pub fn require<T: ?Sized + Send + Sync + 'static>(&self) -> HandlerResult<Arc<T>> {
        self.service::<T>().ok_or_else(|| {
            HandlerError::tool(format!(
                "service '{}' is not configured",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("chat", &self.event.chat)
            .field("kind", &self.event.kind())
            .field("action", self.state.action())
            .field("param", &self.param)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_services_support_trait_objects() {
        let services = Services::new()
            .with::<dyn Greeter>(Arc::new(Hello))
            .with(Arc::new(42u32));
        assert_eq!(services.len(), 2);
        assert_eq!(services.get::<dyn Greeter>().map(|g| g.greet()), Some("hello"));
        assert_eq!(services.get::<u32>().as_deref(), Some(&42));
        assert!(services.get::<String>().is_none());
    }
}
