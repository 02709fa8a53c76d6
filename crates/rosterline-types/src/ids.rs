//! Typed identifiers for users, entries, plans, comments, and polls.
//!
//! All ID types wrap UUIDv7 (time-ordered, globally unique). They're opaque on
//! the wire (`#[serde(transparent)]`) and display as standard UUID text for
//! logging. The `short()` form (first 8 hex chars) is for human-facing UI —
//! never used as a lookup key.
//!
//! The projection's merged timeline is keyed by [`EntryId`]; a session user's
//! canonical plans are keyed by [`PlanId`]. A plan surfaces in the timeline
//! under the same underlying UUID (see [`PlanId::as_entry_id`]), so engagement
//! events that only carry an entry id still find the canonical plan record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(uuid::Uuid);

/// A feed entry identifier (UUIDv7) — dates, roster additions, and plans as
/// they appear in the merged timeline.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(uuid::Uuid);

/// A plan identifier (UUIDv7) — canonical session-user plan records.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(uuid::Uuid);

/// A comment identifier (UUIDv7).
///
/// Optimistic comments mint a fresh `CommentId` locally; the server's
/// confirmed id replaces it when the mutation settles. The comment's
/// `is_optimistic` flag — not the id shape — marks the unsettled state.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(uuid::Uuid);

/// A poll identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters — for human display only, not lookup.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// A nil / zero ID — for sentinel values only.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            /// Check if this is the nil ID.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Full UUID with hyphens for log readability
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(UserId, "UserId");
impl_typed_id!(EntryId, "EntryId");
impl_typed_id!(PlanId, "PlanId");
impl_typed_id!(CommentId, "CommentId");
impl_typed_id!(PollId, "PollId");

impl PlanId {
    /// The entry id this plan surfaces under in the merged timeline.
    ///
    /// Same underlying UUID — engagement events carry entry ids even when the
    /// target is a plan, and this is how the store routes them back to the
    /// canonical plan record.
    pub fn as_entry_id(&self) -> EntryId {
        EntryId(self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
