//! The feed engine: every operation the UI can invoke, in one place.
//!
//! [`FeedEngine`] owns the projection store and a gateway handle. Mutations
//! follow the optimistic protocol (apply locally, fire the gateway call,
//! roll back on failure); stream events go through the reconciliation router
//! and the engine performs whatever async follow-up the router asks for.
//!
//! The engine is single-threaded by construction (`&mut self` everywhere);
//! the actor wraps it for concurrent callers. Because mutation methods hold
//! `&mut self` across the gateway await, the optimistic state would be
//! invisible to watchers until the call settled — so the engine takes an
//! optional `watch` publisher and pushes a frame the moment a local
//! transition lands, before the gateway round-trip. The owner publishes the
//! settled state after each method returns.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use rosterline_types::{
    Comment, CommentId, EntryId, EntryRow, PlanId, PlanRow, PollId, ReactionKind, UserId,
};

use crate::gateway::{FeedGateway, GatewayError};
use crate::optimistic::OptimisticTxn;
use crate::reconcile::{reconcile, ReconcileAction};
use crate::store::{FeedSnapshot, FeedStore, LoadOutcome};
use crate::subscriptions::{ChannelStatus, ChannelUpdate, StreamEvent};
use crate::transform::{entries_to_items, plan_to_item, poll_from_row};

/// How a user-initiated mutation settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied locally and confirmed by the gateway.
    Applied,
    /// Applied locally, rejected by the gateway, rolled back.
    RolledBack,
    /// The target item is not in the projection — logged no-op.
    UnknownItem,
}

pub struct FeedEngine {
    store: FeedStore,
    gateway: Arc<dyn FeedGateway>,
    publisher: Option<watch::Sender<FeedSnapshot>>,
}

impl FeedEngine {
    pub fn new(gateway: Arc<dyn FeedGateway>, session_user: UserId) -> Self {
        Self {
            store: FeedStore::new(session_user),
            gateway,
            publisher: None,
        }
    }

    /// Publish snapshots through `sender` whenever a local transition lands,
    /// including mid-mutation before the gateway call settles.
    pub fn set_publisher(&mut self, sender: watch::Sender<FeedSnapshot>) {
        self.publisher = Some(sender);
    }

    /// Push the current snapshot to watchers. No-op without a publisher.
    pub fn publish(&self) {
        if let Some(sender) = &self.publisher {
            sender.send_replace(self.store.snapshot());
        }
    }

    pub fn session_user(&self) -> UserId {
        self.store.session_user()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    pub fn store_mut(&mut self) -> &mut FeedStore {
        &mut self.store
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Fetch entries and plans, transform, and swap the snapshot in. Races
    /// between overlapping loads settle by generation token; a failed load
    /// keeps the prior snapshot and surfaces the error.
    pub async fn load(&mut self) -> LoadOutcome {
        let me = self.session_user();
        let generation = self.store.begin_load();
        // Loading flag is visible while the fetch is in flight
        self.publish();
        let (entries, plans) =
            tokio::join!(self.gateway.load_entries(me), self.gateway.load_plans(me));
        match (entries, plans) {
            (Ok(entry_rows), Ok(plan_rows)) => {
                let now = Utc::now();
                let entries = entries_to_items(entry_rows, me, now);
                let plans = plan_rows
                    .into_iter()
                    .map(|row| plan_to_item(row, me, now))
                    .collect();
                self.store.complete_load(generation, entries, plans)
            }
            (Err(err), _) | (_, Err(err)) => self.store.fail_load(generation, err.to_string()),
        }
    }

    /// Merge deferred foreign posts by reloading.
    pub async fn load_new_posts(&mut self) -> LoadOutcome {
        info!("merging deferred posts");
        self.load().await
    }

    // ── Engagement mutations ─────────────────────────────────────────────

    /// Toggle the session user's like on an item.
    pub async fn toggle_like(&mut self, entry: EntryId) -> MutationOutcome {
        let me = self.session_user();
        let Some(txn) = OptimisticTxn::engagement(&mut self.store, entry) else {
            warn!(%entry, "like target not in projection");
            return MutationOutcome::UnknownItem;
        };
        let liked = match self.store.engagement_mut(entry) {
            Some(engagement) => engagement.toggle_like(me),
            None => return MutationOutcome::UnknownItem,
        };
        debug!(%entry, liked, "optimistic like applied");
        self.publish();
        match self.gateway.toggle_like(entry, me).await {
            Ok(()) => {
                txn.commit();
                MutationOutcome::Applied
            }
            Err(err) => self.reject(txn, entry, err),
        }
    }

    /// Set, change, or clear the session user's reaction on an item.
    pub async fn set_reaction(
        &mut self,
        entry: EntryId,
        kind: Option<ReactionKind>,
    ) -> MutationOutcome {
        let me = self.session_user();
        let Some(txn) = OptimisticTxn::engagement(&mut self.store, entry) else {
            warn!(%entry, "reaction target not in projection");
            return MutationOutcome::UnknownItem;
        };
        if let Some(engagement) = self.store.engagement_mut(entry) {
            engagement.set_user_reaction(me, kind);
        }
        debug!(%entry, ?kind, "optimistic reaction applied");
        self.publish();
        match self.gateway.set_reaction(entry, me, kind).await {
            Ok(()) => {
                txn.commit();
                MutationOutcome::Applied
            }
            Err(err) => self.reject(txn, entry, err),
        }
    }

    /// Post a comment: a synthetic comment shows immediately, then swaps to
    /// the server-confirmed id (or disappears on failure).
    pub async fn add_comment(
        &mut self,
        entry: EntryId,
        author_name: &str,
        content: String,
        image_uri: Option<String>,
    ) -> MutationOutcome {
        let me = self.session_user();
        let temp_id = CommentId::new();
        match self.store.engagement_mut(entry) {
            Some(engagement) => engagement.push_optimistic_comment(Comment {
                id: temp_id,
                author_name: author_name.to_string(),
                content: content.clone(),
                image_uri: image_uri.clone(),
                is_optimistic: true,
            }),
            None => {
                warn!(%entry, "comment target not in projection");
                return MutationOutcome::UnknownItem;
            }
        }
        let txn = OptimisticTxn::comment(entry, temp_id);
        self.publish();
        match self
            .gateway
            .add_comment(entry, me, &content, image_uri.as_deref())
            .await
        {
            Ok(confirmed_id) => {
                if let Some(engagement) = self.store.engagement_mut(entry) {
                    engagement.confirm_comment(temp_id, confirmed_id);
                }
                txn.commit();
                MutationOutcome::Applied
            }
            Err(err) => self.reject(txn, entry, err),
        }
    }

    /// Record the session user's poll choice. Only the local selection is
    /// optimistic — tallies wait for the poll-votes channel re-fetch.
    pub async fn vote_on_poll(&mut self, entry: EntryId, option_index: usize) -> MutationOutcome {
        let me = self.session_user();
        let previous = match self.store.entry_mut(entry) {
            Some(item) if item.poll.is_some() => {
                std::mem::replace(&mut item.user_poll_vote, Some(option_index))
            }
            _ => {
                warn!(%entry, "vote target has no poll in projection");
                return MutationOutcome::UnknownItem;
            }
        };
        debug!(%entry, option_index, "optimistic poll selection applied");
        self.publish();
        match self.gateway.vote_on_poll(entry, me, option_index).await {
            Ok(()) => MutationOutcome::Applied,
            Err(err) => {
                warn!(%entry, %err, "poll vote rejected, restoring prior selection");
                if let Some(item) = self.store.entry_mut(entry) {
                    item.user_poll_vote = previous;
                }
                self.store.set_error(err.to_string());
                MutationOutcome::RolledBack
            }
        }
    }

    // ── Plan mutations ───────────────────────────────────────────────────

    /// Flip a plan's completion flag, write-through to the gateway.
    pub async fn set_plan_completed(&mut self, plan: PlanId, completed: bool) -> MutationOutcome {
        let row = match self.store.plan_mut(plan) {
            Some(item) => {
                item.is_completed = completed;
                plan_write_row(item)
            }
            None => {
                warn!(%plan, "completion target not in projection");
                return MutationOutcome::UnknownItem;
            }
        };
        self.publish();
        match self.gateway.update_plan(row).await {
            Ok(()) => MutationOutcome::Applied,
            Err(err) => {
                warn!(%plan, %err, "plan update rejected, restoring flag");
                if let Some(item) = self.store.plan_mut(plan) {
                    item.is_completed = !completed;
                }
                self.store.set_error(err.to_string());
                MutationOutcome::RolledBack
            }
        }
    }

    /// Delete one of the session user's plans.
    pub async fn delete_plan(&mut self, plan: PlanId) -> Result<(), GatewayError> {
        self.gateway.delete_plan(plan).await?;
        // Own plan deletes don't come back through the stream
        if self.store_mut().plan_mut(plan).is_some() {
            let _ = self.load().await;
        }
        Ok(())
    }

    // ── Structural write-throughs ────────────────────────────────────────
    //
    // Projection effects arrive through the entries channel (an own insert
    // routes to a full reload), so these only forward.

    pub async fn create_entry(&mut self, row: EntryRow) -> Result<EntryId, GatewayError> {
        self.gateway.create_entry(row).await
    }

    pub async fn update_entry(&mut self, row: EntryRow) -> Result<(), GatewayError> {
        self.gateway.update_entry(row).await
    }

    pub async fn delete_entry(&mut self, id: EntryId) -> Result<(), GatewayError> {
        self.gateway.delete_entry(id).await
    }

    // ── Stream plumbing ──────────────────────────────────────────────────

    /// Route one stream event and perform the async follow-up it requires.
    pub async fn handle_stream_event(&mut self, event: StreamEvent) -> ReconcileAction {
        let action = reconcile(&mut self.store, &event);
        match &action {
            ReconcileAction::FullReload => {
                let _ = self.load().await;
            }
            ReconcileAction::RefetchPoll(poll) => self.refetch_poll(*poll).await,
            ReconcileAction::Patched
            | ReconcileAction::NewPostsAvailable
            | ReconcileAction::Ignored => {}
        }
        action
    }

    /// Overwrite one item's poll state from a fresh gateway read.
    async fn refetch_poll(&mut self, poll: PollId) {
        let me = self.session_user();
        match self.gateway.fetch_poll(poll).await {
            Ok(row) => {
                let (fresh, vote) = poll_from_row(&row, me);
                match self.store.poll_entry_mut(poll) {
                    Some(item) => {
                        item.poll = Some(fresh);
                        item.user_poll_vote = vote;
                        debug!(%poll, "poll state refreshed");
                    }
                    None => warn!(%poll, "refetched poll not in projection, skipping"),
                }
            }
            // Self-heals on the next full reload
            Err(err) => warn!(%poll, %err, "poll re-fetch failed"),
        }
    }

    /// Surface channel degradation without touching sibling channels.
    pub fn handle_channel_update(&mut self, update: ChannelUpdate) {
        match update.status {
            ChannelStatus::Subscribed => {
                debug!(channel = %update.channel, "channel subscribed");
            }
            ChannelStatus::Error(ref message) => {
                warn!(channel = %update.channel, %message, "channel failed, updates may be delayed");
                self.store.set_updates_delayed(true);
            }
            ChannelStatus::Timeout | ChannelStatus::Closed => {
                warn!(channel = %update.channel, status = ?update.status, "channel lost, updates may be delayed");
                self.store.set_updates_delayed(true);
            }
        }
    }

    fn reject(&mut self, txn: OptimisticTxn, entry: EntryId, err: GatewayError) -> MutationOutcome {
        warn!(%entry, %err, "gateway rejected mutation, rolling back");
        txn.rollback(&mut self.store);
        self.store.set_error(err.to_string());
        MutationOutcome::RolledBack
    }
}

/// The write-through shape of a plan record. Engagement columns are read-only
/// server-side and left empty.
fn plan_write_row(item: &rosterline_types::PlanItem) -> PlanRow {
    PlanRow {
        id: item.id,
        user_id: item.author_id,
        person_name: item.person_name.clone(),
        created_at: item.created_at,
        updated_at: Some(Utc::now()),
        author_name: Some(item.author_name.clone()),
        author_username: item.author_username.clone(),
        author_avatar: item.author_avatar.clone(),
        time: item.time.clone(),
        content: item.content.clone(),
        raw_date: item.raw_date,
        is_completed: Some(item.is_completed),
        engagement: Default::default(),
    }
}

// ============================================================================
// Tests
// ============================================================================
