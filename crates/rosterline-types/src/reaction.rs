//! Reaction kinds and the per-item reaction ledger.
//!
//! [`ReactionLedger`] is the authoritative engagement record: one bucket per
//! reaction kind holding its count and the set of users who chose it. Reactions
//! are mutually exclusive per user — setting a new kind removes the user from
//! their previous bucket in the same transition. A bucket whose count reaches
//! zero is deleted from the map, never left dangling.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::ids::UserId;

/// A reaction a user can place on a feed item.
///
/// `Love` doubles as the legacy like: an item's `is_liked` flag is defined as
/// `user_reaction == Some(Love)`.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReactionKind {
    Love,
    Laugh,
    Wow,
    Sad,
    Angry,
    Fire,
}

/// One reaction bucket: how many users chose this kind, and who.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReactionBucket {
    pub count: u32,
    pub users: IndexSet<UserId>,
}

/// Per-item reaction buckets, keyed by kind.
///
/// Insertion order is preserved so snapshots render deterministically.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionLedger(IndexMap<ReactionKind, ReactionBucket>);

impl ReactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw buckets (server rows). Zero-count buckets are dropped.
    pub fn from_buckets(buckets: IndexMap<ReactionKind, ReactionBucket>) -> Self {
        Self(buckets.into_iter().filter(|(_, b)| b.count > 0).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bucket(&self, kind: ReactionKind) -> Option<&ReactionBucket> {
        self.0.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReactionKind, &ReactionBucket)> {
        self.0.iter().map(|(k, b)| (*k, b))
    }

    /// Sum of all bucket counts — the aggregate the legacy `like_count`
    /// tracks once a reaction mutation settles.
    pub fn total(&self) -> u32 {
        self.0.values().map(|b| b.count).sum()
    }

    /// The kind this user currently reacted with, if any.
    pub fn user_reaction(&self, user: UserId) -> Option<ReactionKind> {
        self.0
            .iter()
            .find(|(_, b)| b.users.contains(&user))
            .map(|(k, _)| *k)
    }

    /// Add a user to a kind's bucket. No-op if already present.
    pub fn add_user(&mut self, kind: ReactionKind, user: UserId) {
        let bucket = self.0.entry(kind).or_default();
        if bucket.users.insert(user) {
            bucket.count = bucket.count.saturating_add(1);
        }
    }

    /// Remove a user from a kind's bucket, deleting the bucket at zero.
    pub fn remove_user(&mut self, kind: ReactionKind, user: UserId) {
        if let Some(bucket) = self.0.get_mut(&kind) {
            if bucket.users.shift_remove(&user) {
                bucket.count = bucket.count.saturating_sub(1);
            }
            if bucket.count == 0 {
                self.0.shift_remove(&kind);
            }
        }
    }

    /// Move a user to `kind` (or clear with `None`), enforcing one reaction
    /// per user. Returns the user's previous kind.
    pub fn set_user(&mut self, user: UserId, kind: Option<ReactionKind>) -> Option<ReactionKind> {
        let previous = self.user_reaction(user);
        if previous == kind {
            return previous;
        }
        if let Some(old) = previous {
            self.remove_user(old, user);
        }
        if let Some(new) = kind {
            self.add_user(new, user);
        }
        previous
    }
}

// ============================================================================
// Tests
// ============================================================================
