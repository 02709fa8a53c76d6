//! Feed items and their engagement state.
//!
//! [`FeedItem`] is one displayable unit in the merged timeline — a date log, a
//! roster addition, or a plan — with variant payloads carried by
//! [`EntryPayload`]. All engagement state (likes, reactions, comments) lives in
//! [`Engagement`] so the optimistic mutation paths for timeline entries and
//! canonical plan records share a single implementation.
//!
//! ## Engagement invariants
//!
//! - `like_count == reactions.total()` after any *reaction* mutation settles.
//!   A like toggle adjusts the legacy count by ±1 directly, so the two may
//!   diverge transiently mid-flight — never the ledger itself.
//! - `is_liked` is defined as `user_reaction == Some(Love)`.
//! - An optimistic comment is either promoted (id swapped, flag cleared) or
//!   removed entirely when its originating mutation settles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::ids::{CommentId, EntryId, PollId, UserId};
use crate::reaction::{ReactionKind, ReactionLedger};

/// What a feed entry *is*. Variant data lives in [`EntryPayload`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    Date,
    RosterAddition,
    Plan,
}

/// A single comment on a feed item.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_name: String,
    pub content: String,
    pub image_uri: Option<String>,
    /// True while this comment only exists locally (unconfirmed by the server).
    pub is_optimistic: bool,
}

/// One poll option with its server-confirmed tally.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub votes: u32,
}

/// A poll attached to a feed entry. Tallies are never optimistic — they are
/// overwritten wholesale from the server on reconciliation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<PollOption>,
}

/// Roster-addition detail: who the person is and where they came from.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RosterInfo {
    pub how_met: Option<String>,
    pub status: Option<String>,
}

/// Variant payload of a feed entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry_type", rename_all = "snake_case")]
pub enum EntryPayload {
    Date {
        location: Option<String>,
        rating: Option<u8>,
        notes: Option<String>,
        tags: Vec<String>,
        image_uri: Option<String>,
    },
    RosterAddition {
        roster_info: RosterInfo,
    },
    Plan {
        time: Option<String>,
        content: Option<String>,
        raw_date: Option<DateTime<Utc>>,
        is_completed: bool,
    },
}

impl EntryPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryPayload::Date { .. } => EntryKind::Date,
            EntryPayload::RosterAddition { .. } => EntryKind::RosterAddition,
            EntryPayload::Plan { .. } => EntryKind::Plan,
        }
    }
}

// ============================================================================
// Engagement
// ============================================================================

/// Captured pre-mutation engagement fields — the undo snapshot an optimistic
/// like/reaction mutation restores exactly on failure.
#[derive(Clone, Debug, PartialEq)]
pub struct EngagementSnapshot {
    pub like_count: u32,
    pub is_liked: bool,
    pub user_reaction: Option<ReactionKind>,
    pub reactions: ReactionLedger,
}

/// Likes, reactions, and comments for one item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub like_count: u32,
    pub is_liked: bool,
    pub reactions: ReactionLedger,
    pub user_reaction: Option<ReactionKind>,
    pub comment_count: u32,
    pub comments: Vec<Comment>,
}

impl Engagement {
    /// Capture the like/reaction fields for a later exact restore.
    pub fn snapshot(&self) -> EngagementSnapshot {
        EngagementSnapshot {
            like_count: self.like_count,
            is_liked: self.is_liked,
            user_reaction: self.user_reaction,
            reactions: self.reactions.clone(),
        }
    }

    /// Restore exactly the fields captured by [`Engagement::snapshot`].
    pub fn restore(&mut self, snap: EngagementSnapshot) {
        self.like_count = snap.like_count;
        self.is_liked = snap.is_liked;
        self.user_reaction = snap.user_reaction;
        self.reactions = snap.reactions;
    }

    /// Flip the legacy like: ±1 on `like_count`, `Love` in/out of the ledger.
    ///
    /// Returns the new liked state.
    pub fn toggle_like(&mut self, user: UserId) -> bool {
        if self.is_liked {
            self.like_count = self.like_count.saturating_sub(1);
            self.reactions.remove_user(ReactionKind::Love, user);
            self.user_reaction = None;
            self.is_liked = false;
        } else {
            self.like_count = self.like_count.saturating_add(1);
            // Mutually exclusive: an active non-love reaction moves to love
            self.reactions.set_user(user, Some(ReactionKind::Love));
            self.user_reaction = Some(ReactionKind::Love);
            self.is_liked = true;
        }
        self.is_liked
    }

    /// Set (or clear, with `None`) the user's reaction as one atomic swap,
    /// then recompute the legacy aggregate from the ledger.
    pub fn set_user_reaction(&mut self, user: UserId, kind: Option<ReactionKind>) {
        self.reactions.set_user(user, kind);
        self.user_reaction = kind;
        self.like_count = self.reactions.total();
        self.is_liked = kind == Some(ReactionKind::Love);
    }

    /// Scoped patch from a remote like event: counter only, plus the session
    /// user's own flag when the event was theirs.
    pub fn apply_like_delta(&mut self, delta: i32, own_flag: Option<bool>) {
        self.like_count = if delta >= 0 {
            self.like_count.saturating_add(delta as u32)
        } else {
            self.like_count.saturating_sub(delta.unsigned_abs())
        };
        if let Some(liked) = own_flag {
            self.is_liked = liked;
        }
    }

    /// Scoped patch from a remote comment event: counter only, bodies are
    /// re-fetched on the next full reload.
    pub fn apply_comment_delta(&mut self, delta: i32) {
        self.comment_count = if delta >= 0 {
            self.comment_count.saturating_add(delta as u32)
        } else {
            self.comment_count.saturating_sub(delta.unsigned_abs())
        };
    }

    /// Append an optimistic comment and bump the count.
    pub fn push_optimistic_comment(&mut self, comment: Comment) {
        debug_assert!(comment.is_optimistic);
        self.comments.push(comment);
        self.comment_count = self.comment_count.saturating_add(1);
    }

    /// Promote an optimistic comment: swap in the confirmed id, clear the
    /// flag. Returns false if the temp id is gone (already reverted).
    pub fn confirm_comment(&mut self, temp_id: CommentId, confirmed_id: CommentId) -> bool {
        match self.comments.iter_mut().find(|c| c.id == temp_id) {
            Some(c) => {
                c.id = confirmed_id;
                c.is_optimistic = false;
                true
            }
            None => false,
        }
    }

    /// Remove an optimistic comment and decrement the count. Returns false if
    /// the temp id is gone.
    pub fn remove_comment(&mut self, temp_id: CommentId) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != temp_id);
        if self.comments.len() < before {
            self.comment_count = self.comment_count.saturating_sub(1);
            true
        } else {
            false
        }
    }
}

// ============================================================================
// FeedItem
// ============================================================================

/// One displayable unit in the merged social timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: EntryId,
    /// Subject of the entry — the person the date/roster/plan is about.
    pub person_name: String,
    /// Human-relative date text, derived at projection time. Not authoritative.
    pub display_date: String,
    /// Sort key for the merged timeline (descending).
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: UserId,
    pub author_name: String,
    pub author_username: Option<String>,
    pub author_avatar: Option<String>,
    /// Derived at projection time by comparing `author_id` to the session user.
    pub is_own_post: bool,
    #[serde(flatten)]
    pub engagement: Engagement,
    pub poll: Option<Poll>,
    /// The session user's current poll choice, if any.
    pub user_poll_vote: Option<usize>,
    #[serde(flatten)]
    pub payload: EntryPayload,
}

impl FeedItem {
    pub fn kind(&self) -> EntryKind {
        self.payload.kind()
    }
}

// ============================================================================
// Tests
// ============================================================================
