//! The conversation engine.
//!
//! [`ConversationEngine::handle`] is the single entry point for every inbound
//! event. For one event it:
//!
//! 1. Acknowledges a button press
//! 2. Loads the chat's state
//! 3. Runs a control command, if the event is one
//! 4. Routes a known menu selection
//! 5. Otherwise routes by the pending action: idle chats get the fallback
//!    prompt, stale actions are cleared, pending actions go to the handler
//!    registered for the event kind
//! 6. Commits the resulting transition, delivers replies, spawns the task
//!
//! Handler failures are converted to steps at the handler boundary; store
//! failures end the event with a "try again" reply. Nothing propagates out of
//! `handle`.
//!
//! # Tower Service Integration
//!
//! The engine implements `tower::Service<InboundEvent>`, so the runtime can
//! stack middleware such as a concurrency limit on top of it.

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use oladizz_core::{
    ActionSlot, ActionTag, BoxedOutbound, BoxedStateStore, ChatId, ChatState, EventKind,
    EventPayload, InboundEvent, Reply, StoreError, Transition,
};
use tower::Service;
use tracing::{Instrument, debug, debug_span, error, trace, warn};

use crate::command::run_command;
use crate::context::{ActionContext, Services};
use crate::error::{FrameworkResult, HandlerError};
use crate::handler::BoxedHandler;
use crate::menu::{MenuRouter, Route};
use crate::registry::ActionRegistry;
use crate::replies;
use crate::step::{Outgoing, Step};
use crate::task::TaskSupervisor;

/// How an event was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A control command ran.
    Command,
    /// An unknown command was ignored.
    Ignored,
    /// A menu selection was routed.
    Menu,
    /// No action pending; the fallback prompt was sent.
    Fallback,
    /// An unknown stored action was cleared.
    Stale,
    /// The pending action's handler ran and its step was committed.
    Handled,
    /// The pending action does not accept this event kind.
    WrongKind,
    /// The pending action ended before the step could be committed.
    Expired,
    /// The state store failed.
    StoreFailed,
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`ConversationEngine`].
pub struct EngineBuilder {
    store: BoxedStateStore,
    outbound: BoxedOutbound,
    registry: ActionRegistry,
    menu: Option<MenuRouter>,
    services: Services,
    temp_dir: PathBuf,
    task_timeout: Duration,
}

impl EngineBuilder {
    pub fn registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn menu(mut self, menu: MenuRouter) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Upper bound on a background task's runtime.
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Validates the registry and menu and builds the engine.
    pub fn build(self) -> FrameworkResult<ConversationEngine> {
        let menu = self
            .menu
            .unwrap_or_else(|| MenuRouter::new("main_menu", "", Default::default()));
        self.registry.validate()?;
        menu.validate(&self.registry)?;

        debug!(
            handlers = self.registry.len(),
            services = self.services.len(),
            "Conversation engine built"
        );

        let tasks = TaskSupervisor::new(self.outbound.clone(), self.task_timeout);
        Ok(ConversationEngine {
            inner: Arc::new(EngineInner {
                store: self.store,
                outbound: self.outbound,
                registry: self.registry,
                menu,
                services: self.services,
                temp_dir: self.temp_dir,
                tasks,
            }),
        })
    }
}

// =============================================================================
// Engine
// =============================================================================

struct EngineInner {
    store: BoxedStateStore,
    outbound: BoxedOutbound,
    registry: ActionRegistry,
    menu: MenuRouter,
    services: Services,
    temp_dir: PathBuf,
    tasks: TaskSupervisor,
}

/// Per-chat conversation state machine and dispatcher.
///
/// Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct ConversationEngine {
    inner: Arc<EngineInner>,
}

impl ConversationEngine {
    pub fn builder(store: BoxedStateStore, outbound: BoxedOutbound) -> EngineBuilder {
        EngineBuilder {
            store,
            outbound,
            registry: ActionRegistry::new(),
            menu: None,
            services: Services::new(),
            temp_dir: std::env::temp_dir(),
            task_timeout: Duration::from_secs(300),
        }
    }

    /// The supervisor running background tasks.
    pub fn tasks(&self) -> &TaskSupervisor {
        &self.inner.tasks
    }

    pub fn store(&self) -> &BoxedStateStore {
        &self.inner.store
    }

    /// Handles one inbound event to completion.
    pub async fn handle(&self, event: InboundEvent) -> Dispatch {
        let span = debug_span!("dispatch", chat = %event.chat, kind = %event.kind());
        self.process(event).instrument(span).await
    }

    async fn process(&self, event: InboundEvent) -> Dispatch {
        let inner = &self.inner;
        let chat = event.chat;

        if let EventPayload::Callback { callback_id, .. } = &event.payload
            && !callback_id.is_empty()
            && let Err(e) = inner.outbound.answer_callback(callback_id).await
        {
            warn!(error = %e, "Failed to answer callback");
        }

        let state = match inner.store.get(chat).await {
            Ok(doc) => Arc::new(ChatState::from_document(chat, doc)),
            Err(e) => {
                error!(error = %e, "Failed to load chat state");
                self.say(chat, replies::TRY_AGAIN).await;
                return Dispatch::StoreFailed;
            }
        };
        let event = Arc::new(event);

        if let Some(command) = event.command() {
            return match run_command(&command, &state, &inner.menu.root_menu()) {
                Some(step) => {
                    debug!(?command, "Running command");
                    self.finish(chat, step, None, Dispatch::Command).await
                }
                None => {
                    debug!(?command, "Ignoring unknown command");
                    Dispatch::Ignored
                }
            };
        }

        if let Some(data) = event.callback_data()
            && let Some(route) = inner.menu.resolve(data)
        {
            debug!(selection = data, "Routing menu selection");
            let step = match route {
                Route::Submenu(menu) => match event.callback_message() {
                    Some(message) => Step::no_change().edit(message, menu.clone()),
                    None => Step::no_change().reply(menu.clone()),
                },
                Route::Start {
                    action,
                    scratch,
                    prompt,
                } => Step::replace_with(action, scratch).reply(prompt),
                Route::Dynamic { handler, param } => {
                    let mut ctx = self.context(&event, &state);
                    if let Some(param) = param {
                        ctx = ctx.with_param(param);
                    }
                    invoke(handler, ctx).await
                }
            };
            return self.finish(chat, step, None, Dispatch::Menu).await;
        }

        match state.action() {
            ActionSlot::Idle => {
                trace!("No pending action");
                self.say(chat, replies::FALLBACK).await;
                Dispatch::Fallback
            }
            ActionSlot::Stale(raw) => {
                warn!(action = %raw, "Clearing unknown action");
                let step = Step::clear().reply(replies::STALE_ACTION);
                self.finish(chat, step, None, Dispatch::Stale).await
            }
            ActionSlot::Pending(tag) => {
                let tag = *tag;
                let kind = event.kind();
                match inner.registry.lookup(tag, kind) {
                    Some(handler) => {
                        debug!(action = %tag, "Invoking action handler");
                        let step = invoke(handler, self.context(&event, &state)).await;
                        self.finish(chat, step, Some(tag), Dispatch::Handled).await
                    }
                    None => {
                        debug!(action = %tag, "Pending action does not accept this event kind");
                        let expected: Vec<&str> = inner
                            .registry
                            .kinds_for(tag)
                            .iter()
                            .map(EventKind::noun)
                            .collect();
                        self.say(chat, replies::wrong_kind(&expected)).await;
                        Dispatch::WrongKind
                    }
                }
            }
        }
    }

    fn context(&self, event: &Arc<InboundEvent>, state: &Arc<ChatState>) -> ActionContext {
        ActionContext::new(
            Arc::clone(event),
            Arc::clone(state),
            self.inner.outbound.clone(),
            self.inner.services.clone(),
            self.inner.temp_dir.clone(),
        )
    }

    /// Commits the step's transition, then delivers its effects.
    ///
    /// `owner` is the action whose handler produced the step. A step that
    /// writes state or carries a task only lands while that action is still
    /// the pending one; otherwise the whole step is dropped.
    async fn finish(
        &self,
        chat: ChatId,
        step: Step,
        owner: Option<ActionTag>,
        done: Dispatch,
    ) -> Dispatch {
        let Step {
            transition,
            outgoing,
            follow_up,
            task,
        } = step;

        let mut committed = None;
        let guard = owner.filter(|_| transition.writes() || task.is_some());
        if transition.writes() || guard.is_some() {
            let result = self
                .inner
                .store
                .transact(
                    chat,
                    Box::new(move |current| {
                        if let Some(owner) = guard {
                            let holder = current
                                .as_ref()
                                .and_then(|doc| ActionSlot::from_document(doc).tag());
                            if holder != Some(owner) {
                                return Err(StoreError::NotFound(chat));
                            }
                        }
                        transition.apply(chat, current)
                    }),
                )
                .await;

            match result {
                Ok(doc) => {
                    trace!("Transition committed");
                    committed = doc;
                }
                Err(StoreError::NotFound(_)) => {
                    debug!("Pending action ended before commit, dropping step");
                    self.say(chat, replies::NO_LONGER_ACTIVE).await;
                    return Dispatch::Expired;
                }
                Err(e) => {
                    error!(error = %e, "Failed to commit transition");
                    self.say(chat, replies::TRY_AGAIN).await;
                    return Dispatch::StoreFailed;
                }
            }
        }

        for effect in outgoing {
            self.deliver(chat, effect).await;
        }
        if let Some(build) = follow_up {
            self.say(chat, build(committed.as_ref())).await;
        }
        if let Some(task) = task {
            debug!(task = task.name(), "Spawning background task");
            self.inner.tasks.spawn(chat, task);
        }
        done
    }

    async fn deliver(&self, chat: ChatId, effect: Outgoing) {
        let outbound = &self.inner.outbound;
        let result = match &effect {
            Outgoing::Send(reply) => outbound.send_text(chat, reply).await.map(|_| ()),
            Outgoing::Edit { message, reply } => outbound.edit_text(chat, *message, reply).await,
            Outgoing::Delete(message) => outbound.delete_message(chat, *message).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to deliver outgoing message");
        }
    }

    async fn say(&self, chat: ChatId, text: impl Into<Reply>) {
        self.deliver(chat, Outgoing::Send(text.into())).await;
    }
}

/// Runs a handler, converting a failure into its step.
async fn invoke(handler: &BoxedHandler, ctx: ActionContext) -> Step {
    match handler(ctx).await {
        Ok(step) => step,
        Err(err) => {
            match &err {
                HandlerError::Validation { .. } => debug!(error = %err, "Rejected input"),
                _ => warn!(error = %err, "Handler failed"),
            }
            err.into_step()
        }
    }
}

impl fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("registry", &self.inner.registry)
            .field("menu", &self.inner.menu)
            .field("services", &self.inner.services)
            .finish()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<InboundEvent> for ConversationEngine {
    type Response = Dispatch;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Dispatch, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: InboundEvent) -> Self::Future {
        let engine = self.clone();
        Box::pin(async move { Ok(engine.handle(event).await) })
    }
}
