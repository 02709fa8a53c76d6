//! Wire-shaped rows crossing the Gateway and change-stream boundaries.
//!
//! These are row-level shapes: flat, snake_case, Option-heavy. The transform
//! layer normalizes them into [`FeedItem`](crate::FeedItem) /
//! [`PlanItem`](crate::PlanItem); nothing downstream of the transforms touches
//! a row. Change-stream events carry the same shapes in their `new`/`old`
//! slots.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entry::EntryKind;
use crate::ids::{CommentId, EntryId, PlanId, PollId, UserId};
use crate::reaction::{ReactionBucket, ReactionKind};

/// Engagement columns shared by entry and plan rows. All optional — older
/// rows predate the reaction ledger and carry only `like_count`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementColumns {
    pub like_count: Option<u32>,
    pub reactions: Option<IndexMap<ReactionKind, ReactionBucket>>,
    pub comment_count: Option<u32>,
    pub comments: Option<Vec<CommentRow>>,
}

/// A raw feed entry row (dates, roster additions, and plan-shaped entries).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryRow {
    pub id: EntryId,
    pub user_id: UserId,
    pub entry_type: EntryKind,
    pub person_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author_name: Option<String>,
    pub author_username: Option<String>,
    pub author_avatar: Option<String>,
    #[serde(flatten)]
    pub engagement: EngagementColumns,
    // Variant columns — which are populated depends on entry_type.
    pub location: Option<String>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_uri: Option<String>,
    pub how_met: Option<String>,
    pub roster_status: Option<String>,
    pub time: Option<String>,
    pub content: Option<String>,
    pub raw_date: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
    pub poll: Option<PollRow>,
}

/// A raw plan row from the plans table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
    pub id: PlanId,
    pub user_id: UserId,
    pub person_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author_name: Option<String>,
    pub author_username: Option<String>,
    pub author_avatar: Option<String>,
    pub time: Option<String>,
    pub content: Option<String>,
    pub raw_date: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
    #[serde(flatten)]
    pub engagement: EngagementColumns,
}

/// A raw like row — the likes channel payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LikeRow {
    pub entry_id: EntryId,
    pub user_id: UserId,
}

/// A raw comment row — the comments channel payload and the comment bodies
/// embedded in entry rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: CommentId,
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub author_name: String,
    pub content: String,
    pub image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A raw poll with options, tallies, and individual votes.
///
/// `fetch_poll` returns this whole shape so reconciliation can overwrite one
/// item's poll state without a full reload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollRow {
    pub id: PollId,
    pub question: String,
    pub options: Vec<PollOptionRow>,
    #[serde(default)]
    pub votes: Vec<PollVoteRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollOptionRow {
    pub text: String,
    pub votes: u32,
}

/// A raw poll vote row — the poll-votes channel payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollVoteRow {
    pub poll_id: PollId,
    pub user_id: UserId,
    pub option_index: usize,
}

impl PollRow {
    /// The option index `user` voted for, if any.
    pub fn vote_of(&self, user: UserId) -> Option<usize> {
        self.votes
            .iter()
            .find(|v| v.user_id == user)
            .map(|v| v.option_index)
    }
}

// ============================================================================
// Tests
// ============================================================================
