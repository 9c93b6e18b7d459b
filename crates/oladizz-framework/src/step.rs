//! The result of handling one event.

use std::fmt;

use oladizz_core::{ActionTag, Document, FieldUpdate, MessageId, Reply, Transition};

use crate::task::BackgroundTask;

/// Builds a reply from the record as committed.
pub type FollowUp = Box<dyn FnOnce(Option<&Document>) -> Reply + Send>;

/// An effect sent to the chat after the transition is committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// Send a new message.
    Send(Reply),
    /// Edit a message the bot sent earlier.
    Edit { message: MessageId, reply: Reply },
    /// Delete a message (e.g. one holding a secret).
    Delete(MessageId),
}

/// What a handler asks the engine to do.
///
/// The engine commits [`transition`](Self::transition) first, then delivers
/// [`outgoing`](Self::outgoing) in order, then the [`follow_up`](Self::follow_up)
/// reply, then spawns [`task`](Self::task).
pub struct Step {
    pub transition: Transition,
    pub outgoing: Vec<Outgoing>,
    pub follow_up: Option<FollowUp>,
    pub task: Option<BackgroundTask>,
}

impl Step {
    pub fn new(transition: Transition) -> Self {
        Self {
            transition,
            outgoing: Vec::new(),
            follow_up: None,
            task: None,
        }
    }

    pub fn no_change() -> Self {
        Self::new(Transition::NoChange)
    }

    pub fn clear() -> Self {
        Self::new(Transition::Clear)
    }

    /// Deletes the chat's record outright, stored credentials included.
    pub fn discard() -> Self {
        Self::new(Transition::Discard)
    }

    /// Enters `action` with empty scratch.
    pub fn replace(action: ActionTag) -> Self {
        Self::new(Transition::replace(action))
    }

    /// Enters `action` with the given scratch.
    pub fn replace_with(action: ActionTag, scratch: Document) -> Self {
        Self::new(Transition::replace_with(action, scratch))
    }

    pub fn accumulate(updates: Vec<FieldUpdate>) -> Self {
        Self::new(Transition::Accumulate(updates))
    }

    /// Moves to the next wizard step, keeping collected scratch.
    pub fn advance(next: ActionTag, updates: Vec<FieldUpdate>) -> Self {
        Self::new(Transition::advance(next, updates))
    }

    /// Queues a new message.
    pub fn reply(mut self, reply: impl Into<Reply>) -> Self {
        self.outgoing.push(Outgoing::Send(reply.into()));
        self
    }

    /// Queues an in-place edit.
    pub fn edit(mut self, message: MessageId, reply: impl Into<Reply>) -> Self {
        self.outgoing.push(Outgoing::Edit {
            message,
            reply: reply.into(),
        });
        self
    }

    /// Queues a message deletion.
    pub fn delete(mut self, message: MessageId) -> Self {
        self.outgoing.push(Outgoing::Delete(message));
        self
    }

    /// Queues a reply computed from the committed record, e.g. a running
    /// count after an append.
    pub fn reply_with<F>(mut self, build: F) -> Self
    where
        F: FnOnce(Option<&Document>) -> Reply + Send + 'static,
    {
        self.follow_up = Some(Box::new(build));
        self
    }

    /// Attaches a background task started after the replies.
    pub fn spawn(mut self, task: BackgroundTask) -> Self {
        self.task = Some(task);
        self
    }

    /// Texts of the queued new messages, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.outgoing
            .iter()
            .filter_map(|o| match o {
                Outgoing::Send(reply) => Some(reply.text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("transition", &self.transition)
            .field("outgoing", &self.outgoing)
            .field("follow_up", &self.follow_up.is_some())
            .field("task", &self.task.as_ref().map(BackgroundTask::name))
            .finish()
    }
}
