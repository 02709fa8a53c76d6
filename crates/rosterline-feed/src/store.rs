//! The feed projection store.
//!
//! [`FeedStore`] holds the current UI-facing state: timeline entries, the
//! canonical plan store, and the derived flags. The merged timeline is a
//! *derived view* ([`FeedStore::timeline`]) — session-user plans are stored
//! once and projected on read, so their engagement fields have exactly one
//! mutation target.
//!
//! # Load protocol
//!
//! ```text
//! +----------------+
//! |  begin_load()  |  issues generation N, raises is_loading only when
//! +-------+--------+  the snapshot is empty (refresh keeps the feed up)
//!         |
//!         v  ... gateway calls in flight; other loads may start (N+1...) ...
//! +----------------+
//! | complete_load  |  applied only if N is still the newest generation;
//! |  / fail_load   |  stale results are discarded (LoadOutcome::Stale)
//! +----------------+
//! ```
//!
//! The generation token closes the "last load wins" race: a slow older load
//! can never overwrite the result of a newer one.

use indexmap::IndexMap;
use tracing::{debug, warn};

use rosterline_types::{Engagement, EntryId, FeedItem, PlanId, PlanItem, PollId, UserId};

use crate::transform::sort_timeline;

/// Outcome of settling a load against the generation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result was applied to the store.
    Applied,
    /// A newer load was issued after this one — result discarded.
    Stale,
}

/// Read-only snapshot handed to UI consumers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    /// Merged timeline (dates ∪ roster additions ∪ plans), `created_at` descending.
    pub dates: Vec<FeedItem>,
    /// The session user's plans, canonical records.
    pub plans: Vec<PlanItem>,
    pub has_new_posts: bool,
    pub is_loading: bool,
    /// One or more change-stream channels failed — updates may be delayed.
    pub updates_delayed: bool,
    pub error: Option<String>,
}

/// In-memory projection of the feed for one session user.
pub struct FeedStore {
    session_user: UserId,
    /// Dates, roster additions, and plans authored by *others*.
    entries: Vec<FeedItem>,
    /// Canonical session-user plans.
    plans: IndexMap<PlanId, PlanItem>,
    has_new_posts: bool,
    is_loading: bool,
    updates_delayed: bool,
    error: Option<String>,
    /// Newest generation issued by `begin_load`.
    issued_generation: u64,
}

impl FeedStore {
    pub fn new(session_user: UserId) -> Self {
        Self {
            session_user,
            entries: Vec::new(),
            plans: IndexMap::new(),
            has_new_posts: false,
            is_loading: false,
            updates_delayed: false,
            error: None,
            issued_generation: 0,
        }
    }

    pub fn session_user(&self) -> UserId {
        self.session_user
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.plans.is_empty()
    }

    // ── Load lifecycle ───────────────────────────────────────────────────

    /// Start a load and get its generation token.
    ///
    /// A refresh over a non-empty snapshot keeps `is_loading` down so the UI
    /// never swaps a live feed for a placeholder; an initial (empty) load
    /// raises it.
    pub fn begin_load(&mut self) -> u64 {
        self.issued_generation += 1;
        if self.is_empty() {
            self.is_loading = true;
        }
        debug!(generation = self.issued_generation, "load started");
        self.issued_generation
    }

    /// Apply a finished load, replacing the snapshot wholesale — unless a
    /// newer load was issued meanwhile.
    pub fn complete_load(
        &mut self,
        generation: u64,
        entries: Vec<FeedItem>,
        plans: Vec<PlanItem>,
    ) -> LoadOutcome {
        if generation != self.issued_generation {
            debug!(
                generation,
                newest = self.issued_generation,
                "discarding stale load result"
            );
            return LoadOutcome::Stale;
        }
        self.entries = entries;
        self.plans = plans.into_iter().map(|p| (p.id, p)).collect();
        self.has_new_posts = false;
        self.is_loading = false;
        self.error = None;
        debug!(
            entries = self.entries.len(),
            plans = self.plans.len(),
            "load applied"
        );
        LoadOutcome::Applied
    }

    /// Record a failed load: prior snapshot stays intact, only the error
    /// surfaces. Stale failures are discarded like stale results.
    pub fn fail_load(&mut self, generation: u64, message: impl Into<String>) -> LoadOutcome {
        if generation != self.issued_generation {
            return LoadOutcome::Stale;
        }
        let message = message.into();
        warn!(%message, "load failed, keeping previous snapshot");
        self.is_loading = false;
        self.error = Some(message);
        LoadOutcome::Applied
    }

    // ── Derived views ────────────────────────────────────────────────────

    /// The merged timeline: entries plus projected session-user plans,
    /// sorted by `created_at` descending.
    pub fn timeline(&self) -> Vec<FeedItem> {
        let mut items: Vec<FeedItem> = self
            .entries
            .iter()
            .cloned()
            .chain(self.plans.values().map(PlanItem::timeline_projection))
            .collect();
        sort_timeline(&mut items);
        items
    }

    /// Snapshot for UI consumers.
    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            dates: self.timeline(),
            plans: self.plans.values().cloned().collect(),
            has_new_posts: self.has_new_posts,
            is_loading: self.is_loading,
            updates_delayed: self.updates_delayed,
            error: self.error.clone(),
        }
    }

    // ── Targeted access for mutations and patches ────────────────────────

    /// Engagement state for an item, wherever it lives — a timeline entry or
    /// the canonical record of a session-user plan.
    pub fn engagement_mut(&mut self, id: EntryId) -> Option<&mut Engagement> {
        if let Some(item) = self.entries.iter_mut().find(|i| i.id == id) {
            return Some(&mut item.engagement);
        }
        self.plans
            .values_mut()
            .find(|p| p.id.as_entry_id() == id)
            .map(|p| &mut p.engagement)
    }

    /// A timeline entry by id (plans have no entry-level fields like polls).
    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut FeedItem> {
        self.entries.iter_mut().find(|i| i.id == id)
    }

    /// The entry holding a given poll.
    pub fn poll_entry_mut(&mut self, poll: PollId) -> Option<&mut FeedItem> {
        self.entries
            .iter_mut()
            .find(|i| i.poll.as_ref().is_some_and(|p| p.id == poll))
    }

    /// A canonical plan record.
    pub fn plan_mut(&mut self, id: PlanId) -> Option<&mut PlanItem> {
        self.plans.get_mut(&id)
    }

    // ── Flags ────────────────────────────────────────────────────────────

    pub fn has_new_posts(&self) -> bool {
        self.has_new_posts
    }

    pub fn set_has_new_posts(&mut self, value: bool) {
        self.has_new_posts = value;
    }

    pub fn set_updates_delayed(&mut self, value: bool) {
        self.updates_delayed = value;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
