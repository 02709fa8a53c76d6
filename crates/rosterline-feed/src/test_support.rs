//! Shared fixtures and mocks for in-crate tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Notify};

use rosterline_types::{
    CommentId, EntryId, EntryKind, EntryRow, PlanId, PlanRow, PollId, PollRow, ReactionKind,
    UserId,
};

use crate::gateway::{FeedGateway, GatewayError};
use crate::store::{FeedStore, LoadOutcome};
use crate::subscriptions::{
    Channel, ChannelUpdate, ChangeStream, StreamEvent, SubscriptionHandle,
};
use crate::transform::{entry_to_item, plan_to_item};

/// Route test logs through the capture-aware writer. Safe to call from every
/// test; only the first call installs the subscriber.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rosterline_feed=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Row fixtures
// ============================================================================

pub(crate) fn entry_row(user: UserId, created: &str) -> EntryRow {
    EntryRow {
        id: EntryId::new(),
        user_id: user,
        entry_type: EntryKind::Date,
        person_name: "Jordan".to_string(),
        created_at: created.parse().unwrap(),
        updated_at: None,
        author_name: None,
        author_username: None,
        author_avatar: None,
        engagement: Default::default(),
        location: None,
        rating: None,
        notes: None,
        tags: None,
        image_uri: None,
        how_met: None,
        roster_status: None,
        time: None,
        content: None,
        raw_date: None,
        is_completed: None,
        poll: None,
    }
}

pub(crate) fn plan_row(user: UserId, created: &str) -> PlanRow {
    PlanRow {
        id: PlanId::new(),
        user_id: user,
        person_name: "Sam".to_string(),
        created_at: created.parse().unwrap(),
        updated_at: None,
        author_name: None,
        author_username: None,
        author_avatar: None,
        time: None,
        content: None,
        raw_date: None,
        is_completed: Some(false),
        engagement: Default::default(),
    }
}

// ============================================================================
// Pre-loaded stores
// ============================================================================

/// A store loaded with two date entries (one own, one foreign) and one
/// session-user plan. Timeline order: foreign entry, plan, own entry.
pub(crate) fn loaded_store() -> (FeedStore, UserId) {
    loaded_store_with_likes(0)
}

/// Same as [`loaded_store`], with `like_count` on the newest entry.
pub(crate) fn loaded_store_with_likes(likes: u32) -> (FeedStore, UserId) {
    let me = UserId::new();
    let mut store = FeedStore::new(me);
    let generation = store.begin_load();

    let mut newest = entry_row(UserId::new(), "2026-08-20T00:00:00Z");
    newest.engagement.like_count = Some(likes);
    let entries = vec![
        entry_to_item(newest, me, Utc::now()),
        entry_to_item(entry_row(me, "2026-08-10T00:00:00Z"), me, Utc::now()),
    ];
    let plans = vec![plan_to_item(plan_row(me, "2026-08-15T00:00:00Z"), me, Utc::now())];
    assert_eq!(
        store.complete_load(generation, entries, plans),
        LoadOutcome::Applied
    );
    (store, me)
}

/// Id of the newest non-plan timeline item.
pub(crate) fn first_entry_id(store: &FeedStore) -> EntryId {
    store
        .timeline()
        .into_iter()
        .find(|item| item.kind() != EntryKind::Plan)
        .map(|item| item.id)
        .unwrap()
}

// ============================================================================
// Scripted gateway
// ============================================================================

/// Serves canned rows and records every call; any operation can be armed to
/// fail exactly once via [`MockGateway::fail_next`], or held open until
/// released via [`MockGateway::hold_next`].
#[derive(Default)]
pub(crate) struct MockGateway {
    pub entries: Mutex<Vec<EntryRow>>,
    pub plans: Mutex<Vec<PlanRow>>,
    pub polls: Mutex<Vec<PollRow>>,
    pub calls: Mutex<Vec<String>>,
    failures: Mutex<Vec<&'static str>>,
    gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
    pub last_comment_id: Mutex<Option<CommentId>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<EntryRow>, plans: Vec<PlanRow>) -> Self {
        let gateway = Self::new();
        *gateway.entries.lock().unwrap() = entries;
        *gateway.plans.lock().unwrap() = plans;
        gateway
    }

    /// Arm `op` (the trait method name) to fail on its next call.
    pub fn fail_next(&self, op: &'static str) {
        self.failures.lock().unwrap().push(op);
    }

    /// Hold `op`'s next call open (recorded, but not yet returned) until the
    /// returned handle is notified. Lets a test observe in-flight state.
    pub fn hold_next(&self, op: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == op).count()
    }

    async fn record(&self, op: &'static str) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(op.to_string());
        let failed = {
            let mut failures = self.failures.lock().unwrap();
            match failures.iter().position(|f| *f == op) {
                Some(index) => {
                    failures.remove(index);
                    true
                }
                None => false,
            }
        };
        if failed {
            return Err(GatewayError::Unavailable("scripted failure".to_string()));
        }
        let gate = self.gates.lock().unwrap().remove(op);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(())
    }
}

#[async_trait]
impl FeedGateway for MockGateway {
    async fn load_entries(&self, _user: UserId) -> Result<Vec<EntryRow>, GatewayError> {
        self.record("load_entries").await?;
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn load_plans(&self, _user: UserId) -> Result<Vec<PlanRow>, GatewayError> {
        self.record("load_plans").await?;
        Ok(self.plans.lock().unwrap().clone())
    }

    async fn toggle_like(&self, _entry: EntryId, _user: UserId) -> Result<(), GatewayError> {
        self.record("toggle_like").await
    }

    async fn set_reaction(
        &self,
        _entry: EntryId,
        _user: UserId,
        _kind: Option<ReactionKind>,
    ) -> Result<(), GatewayError> {
        self.record("set_reaction").await
    }

    async fn add_comment(
        &self,
        _entry: EntryId,
        _user: UserId,
        _content: &str,
        _image_uri: Option<&str>,
    ) -> Result<CommentId, GatewayError> {
        self.record("add_comment").await?;
        let id = CommentId::new();
        *self.last_comment_id.lock().unwrap() = Some(id);
        Ok(id)
    }

    async fn vote_on_poll(
        &self,
        _entry: EntryId,
        _user: UserId,
        _option_index: usize,
    ) -> Result<(), GatewayError> {
        self.record("vote_on_poll").await
    }

    async fn fetch_poll(&self, poll: PollId) -> Result<PollRow, GatewayError> {
        self.record("fetch_poll").await?;
        self.polls
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == poll)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(poll.to_string()))
    }

    async fn create_entry(&self, row: EntryRow) -> Result<EntryId, GatewayError> {
        self.record("create_entry").await?;
        Ok(row.id)
    }

    async fn update_entry(&self, _row: EntryRow) -> Result<(), GatewayError> {
        self.record("update_entry").await
    }

    async fn delete_entry(&self, _id: EntryId) -> Result<(), GatewayError> {
        self.record("delete_entry").await
    }

    async fn update_plan(&self, _row: PlanRow) -> Result<(), GatewayError> {
        self.record("update_plan").await
    }

    async fn delete_plan(&self, _id: PlanId) -> Result<(), GatewayError> {
        self.record("delete_plan").await
    }
}

// ============================================================================
// Scripted change stream
// ============================================================================

/// Keeps each channel's senders so tests can inject events and status updates
/// after subscription.
#[derive(Default)]
pub(crate) struct MockChangeStream {
    senders: Mutex<
        HashMap<
            Channel,
            (
                mpsc::UnboundedSender<StreamEvent>,
                mpsc::UnboundedSender<ChannelUpdate>,
            ),
        >,
    >,
}

impl MockChangeStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event through the channel it belongs to.
    pub fn push(&self, event: StreamEvent) {
        let senders = self.senders.lock().unwrap();
        if let Some((events_tx, _)) = senders.get(&event.channel()) {
            let _ = events_tx.send(event);
        }
    }

    pub fn push_status(&self, update: ChannelUpdate) {
        let senders = self.senders.lock().unwrap();
        if let Some((_, status_tx)) = senders.get(&update.channel) {
            let _ = status_tx.send(update);
        }
    }
}

impl ChangeStream for MockChangeStream {
    fn subscribe(
        &self,
        channel: Channel,
        _session_user: UserId,
        events_tx: mpsc::UnboundedSender<StreamEvent>,
        status_tx: mpsc::UnboundedSender<ChannelUpdate>,
    ) -> SubscriptionHandle {
        self.senders
            .lock()
            .unwrap()
            .insert(channel, (events_tx, status_tx));
        SubscriptionHandle::noop()
    }
}
