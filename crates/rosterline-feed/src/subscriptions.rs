//! Change-stream channels, event types, and the subscription manager.
//!
//! The backend pushes row-level changes over five logical channels — entries,
//! likes, comments, plans, poll votes. Ordering is best-effort *within* a
//! channel and absent *across* channels; the reconciliation router is written
//! so no cross-channel ordering assumption is needed.
//!
//! [`SubscriptionManager`] owns the channel lifecycle: `start(session_user)`
//! tears down any prior subscriptions and establishes all five, fanning their
//! events into one mpsc stream; `stop()` tears everything down. One channel
//! failing to establish does not touch its siblings — it degrades to a
//! "delayed updates" status the engine surfaces on the snapshot.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};
use tokio::sync::mpsc;
use tracing::{debug, info};

use rosterline_types::{CommentRow, EntryRow, LikeRow, PlanRow, PollVoteRow, UserId};

// ============================================================================
// Event types
// ============================================================================

/// The five logical change channels.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Entries,
    Likes,
    Comments,
    Plans,
    PollVotes,
}

/// Row-level operation kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One change-stream event: the operation plus the before/after rows the
/// channel carries. Inserts populate `new`, deletes `old`, updates both.
///
/// This is the wire shape of a stream frame: channel-tagged JSON with raw
/// rows for payloads.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "channel")]
pub enum StreamEvent {
    #[serde(rename = "entries")]
    Entry {
        kind: ChangeKind,
        new: Option<EntryRow>,
        old: Option<EntryRow>,
    },
    #[serde(rename = "likes")]
    Like {
        kind: ChangeKind,
        new: Option<LikeRow>,
        old: Option<LikeRow>,
    },
    #[serde(rename = "comments")]
    Comment {
        kind: ChangeKind,
        new: Option<CommentRow>,
        old: Option<CommentRow>,
    },
    #[serde(rename = "plans")]
    Plan {
        kind: ChangeKind,
        new: Option<PlanRow>,
        old: Option<PlanRow>,
    },
    #[serde(rename = "poll_votes")]
    PollVote {
        kind: ChangeKind,
        new: Option<PollVoteRow>,
        old: Option<PollVoteRow>,
    },
}

impl StreamEvent {
    pub fn channel(&self) -> Channel {
        match self {
            StreamEvent::Entry { .. } => Channel::Entries,
            StreamEvent::Like { .. } => Channel::Likes,
            StreamEvent::Comment { .. } => Channel::Comments,
            StreamEvent::Plan { .. } => Channel::Plans,
            StreamEvent::PollVote { .. } => Channel::PollVotes,
        }
    }
}

/// Channel subscription lifecycle status, delivered asynchronously after
/// `subscribe`.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelStatus {
    Subscribed,
    Error(String),
    Timeout,
    Closed,
}

/// A status update tagged with its channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelUpdate {
    pub channel: Channel,
    pub status: ChannelStatus,
}

// ============================================================================
// The multiplexer boundary
// ============================================================================

/// Cancels one channel subscription when dropped or explicitly cancelled.
pub struct SubscriptionHandle(Option<Box<dyn FnOnce() + Send>>);

impl SubscriptionHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(cancel)))
    }

    /// A handle with no teardown work (e.g. for task-per-subscription
    /// implementations that observe channel closure instead).
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn cancel(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

/// The change-stream multiplexer the engine consumes.
///
/// Registration is synchronous; establishment is not — the implementation
/// reports `Subscribed`/`Error`/`Timeout`/`Closed` through `status_tx` as the
/// channel comes up (or fails to). Events flow through `events_tx` until the
/// returned handle is dropped.
pub trait ChangeStream: Send + Sync {
    fn subscribe(
        &self,
        channel: Channel,
        session_user: UserId,
        events_tx: mpsc::UnboundedSender<StreamEvent>,
        status_tx: mpsc::UnboundedSender<ChannelUpdate>,
    ) -> SubscriptionHandle;
}

// ============================================================================
// SubscriptionManager
// ============================================================================

/// Owns the five channel subscriptions for one projection lifecycle.
pub struct SubscriptionManager {
    stream: Arc<dyn ChangeStream>,
    active: Vec<SubscriptionHandle>,
    session_user: Option<UserId>,
}

impl SubscriptionManager {
    pub fn new(stream: Arc<dyn ChangeStream>) -> Self {
        Self {
            stream,
            active: Vec::new(),
            session_user: None,
        }
    }

    /// Subscribe all five channels for a session user, tearing down any
    /// prior subscriptions first (session-user change re-establishes
    /// everything). Returns the fanned-in event stream and the status stream.
    pub fn start(
        &mut self,
        session_user: UserId,
    ) -> (
        mpsc::UnboundedReceiver<StreamEvent>,
        mpsc::UnboundedReceiver<ChannelUpdate>,
    ) {
        self.stop();
        info!(user = %session_user, "subscribing change-stream channels");
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        for channel in Channel::iter() {
            self.active.push(self.stream.subscribe(
                channel,
                session_user,
                events_tx.clone(),
                status_tx.clone(),
            ));
        }
        self.session_user = Some(session_user);
        (events_rx, status_rx)
    }

    /// Tear down all subscriptions unconditionally.
    pub fn stop(&mut self) {
        if !self.active.is_empty() {
            debug!(count = self.active.len(), "cancelling channel subscriptions");
        }
        for handle in self.active.drain(..) {
            handle.cancel();
        }
        self.session_user = None;
    }

    pub fn is_active(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn session_user(&self) -> Option<UserId> {
        self.session_user
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
