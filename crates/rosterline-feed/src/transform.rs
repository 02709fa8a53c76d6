//! Row → item transforms and timeline ordering.
//!
//! Everything here is pure: `now` and the session user are passed in, so the
//! same rows always produce the same items. Engagement normalization turns the
//! Option-heavy row columns into zeroed defaults, resolves `is_own_post` and
//! `user_reaction` against the session user, and recomputes `is_liked` from
//! the ledger when one is present (legacy rows without a ledger keep their
//! raw `like_count`).

use chrono::{DateTime, Datelike, Utc};
use tracing::trace;

use rosterline_types::{
    Comment, Engagement, EntryKind, EntryPayload, EntryRow, FeedItem, PlanItem, PlanRow, Poll,
    PollOption, PollRow, ReactionKind, ReactionLedger, RosterInfo, UserId,
};

/// Human-relative date text, computed against a caller-supplied now.
pub fn display_date(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created);
    if elapsed.num_seconds() < 60 {
        return "just now".to_string();
    }
    if elapsed.num_minutes() < 60 {
        return format!("{}m ago", elapsed.num_minutes());
    }
    if elapsed.num_hours() < 24 {
        return format!("{}h ago", elapsed.num_hours());
    }
    match elapsed.num_days() {
        1 => "yesterday".to_string(),
        d if d < 7 => format!("{}d ago", d),
        _ if created.year() == now.year() => created.format("%b %-d").to_string(),
        _ => created.format("%b %-d, %Y").to_string(),
    }
}

/// Normalize row engagement columns into a zeroed-default [`Engagement`].
fn normalize_engagement(
    columns: rosterline_types::EngagementColumns,
    session_user: UserId,
) -> Engagement {
    let reactions = columns
        .reactions
        .map(ReactionLedger::from_buckets)
        .unwrap_or_default();
    let user_reaction = reactions.user_reaction(session_user);
    // Ledger-backed rows recompute the aggregate; legacy rows keep the column.
    let like_count = if reactions.is_empty() {
        columns.like_count.unwrap_or(0)
    } else {
        reactions.total()
    };
    let comments: Vec<Comment> = columns
        .comments
        .unwrap_or_default()
        .into_iter()
        .map(|row| Comment {
            id: row.id,
            author_name: row.author_name,
            content: row.content,
            image_uri: row.image_uri,
            is_optimistic: false,
        })
        .collect();
    let comment_count = columns.comment_count.unwrap_or(comments.len() as u32);
    Engagement {
        like_count,
        is_liked: user_reaction == Some(ReactionKind::Love),
        reactions,
        user_reaction,
        comment_count,
        comments,
    }
}

/// Build the displayable [`Poll`] plus the session user's vote from a raw row.
pub fn poll_from_row(row: &PollRow, session_user: UserId) -> (Poll, Option<usize>) {
    let poll = Poll {
        id: row.id,
        question: row.question.clone(),
        options: row
            .options
            .iter()
            .map(|o| PollOption {
                text: o.text.clone(),
                votes: o.votes,
            })
            .collect(),
    };
    (poll, row.vote_of(session_user))
}

/// Transform one raw entry row into a timeline item.
pub fn entry_to_item(row: EntryRow, session_user: UserId, now: DateTime<Utc>) -> FeedItem {
    let payload = match row.entry_type {
        EntryKind::Date => EntryPayload::Date {
            location: row.location,
            rating: row.rating,
            notes: row.notes,
            tags: row.tags.unwrap_or_default(),
            image_uri: row.image_uri,
        },
        EntryKind::RosterAddition => EntryPayload::RosterAddition {
            roster_info: RosterInfo {
                how_met: row.how_met,
                status: row.roster_status,
            },
        },
        EntryKind::Plan => EntryPayload::Plan {
            time: row.time,
            content: row.content,
            raw_date: row.raw_date,
            is_completed: row.is_completed.unwrap_or(false),
        },
    };
    let (poll, user_poll_vote) = match row.poll {
        Some(ref poll_row) => {
            let (poll, vote) = poll_from_row(poll_row, session_user);
            (Some(poll), vote)
        }
        None => (None, None),
    };
    FeedItem {
        id: row.id,
        person_name: row.person_name,
        display_date: display_date(row.created_at, now),
        created_at: row.created_at,
        updated_at: row.updated_at.unwrap_or(row.created_at),
        author_id: row.user_id,
        author_name: row.author_name.unwrap_or_default(),
        author_username: row.author_username,
        author_avatar: row.author_avatar,
        is_own_post: row.user_id == session_user,
        engagement: normalize_engagement(row.engagement, session_user),
        poll,
        user_poll_vote,
        payload,
    }
}

/// Transform one raw plan row into a canonical plan record.
pub fn plan_to_item(row: PlanRow, session_user: UserId, now: DateTime<Utc>) -> PlanItem {
    PlanItem {
        id: row.id,
        person_name: row.person_name,
        display_date: display_date(row.created_at, now),
        created_at: row.created_at,
        updated_at: row.updated_at.unwrap_or(row.created_at),
        author_id: row.user_id,
        author_name: row.author_name.unwrap_or_default(),
        author_username: row.author_username,
        author_avatar: row.author_avatar,
        time: row.time,
        content: row.content,
        raw_date: row.raw_date,
        is_completed: row.is_completed.unwrap_or(false),
        engagement: normalize_engagement(row.engagement, session_user),
    }
}

/// Transform a load's raw entry rows, skipping the session user's plan-shaped
/// entries — those are owned by the canonical plan store.
pub fn entries_to_items(
    rows: Vec<EntryRow>,
    session_user: UserId,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    rows.into_iter()
        .filter(|row| {
            let own_plan = row.entry_type == EntryKind::Plan && row.user_id == session_user;
            if own_plan {
                trace!(entry = %row.id, "skipping own plan entry row, canonical copy comes from load_plans");
            }
            !own_plan
        })
        .map(|row| entry_to_item(row, session_user, now))
        .collect()
}

/// Sort the merged timeline by `created_at` descending. Ordering among equal
/// timestamps is unspecified — callers must not rely on it.
pub fn sort_timeline(items: &mut [FeedItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

// ============================================================================
// Tests
// ============================================================================
