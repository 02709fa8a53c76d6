//! Shared identifiers and feed data model for Rosterline.
//!
//! This crate is the data foundation: typed IDs, the feed item tagged union,
//! the reaction ledger, comments, polls, canonical plan records, and the raw
//! row shapes crossing the Gateway/stream boundaries. It has **no internal
//! rosterline dependencies** — a pure leaf crate that the engine builds on.
//!
//! # Entity Overview
//!
//! ```text
//! FeedItem (EntryId) ← one unit of the merged timeline
//!     └── payload: Date | RosterAddition | Plan
//!     └── engagement: likes + ReactionLedger + comments
//!     └── poll (optional) + the session user's vote
//!
//! PlanItem (PlanId) ← canonical session-user plan record
//!     └── timeline_projection() → plan-shaped FeedItem (derived, never stored)
//!
//! Rows (EntryRow, PlanRow, LikeRow, CommentRow, PollVoteRow)
//!     └── wire shapes; normalized by the engine's transforms
//! ```

pub mod entry;
pub mod ids;
pub mod plan;
pub mod reaction;
pub mod rows;

pub use entry::{
    Comment, Engagement, EngagementSnapshot, EntryKind, EntryPayload, FeedItem, Poll, PollOption,
    RosterInfo,
};
pub use ids::{CommentId, EntryId, PlanId, PollId, UserId};
pub use plan::PlanItem;
pub use reaction::{ReactionBucket, ReactionKind, ReactionLedger};
pub use rows::{
    CommentRow, EngagementColumns, EntryRow, LikeRow, PlanRow, PollOptionRow, PollRow, PollVoteRow,
};
