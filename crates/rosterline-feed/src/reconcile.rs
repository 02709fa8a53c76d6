//! The reconciliation router.
//!
//! Translates change-stream events into the narrowest correct patch of the
//! projection, reloading only where a scoped patch cannot preserve
//! correctness. Each channel's handling is self-contained, so no ordering
//! assumption across channels is needed:
//!
//! | channel    | handling                                                     |
//! |------------|--------------------------------------------------------------|
//! | entries    | own insert → full reload; foreign insert → has_new_posts;    |
//! |            | update/delete → full reload (edits can move/hide anything)   |
//! | likes      | ±1 like_count; own flag when the event user is the session   |
//! | comments   | ±1 comment_count only (bodies wait for the next reload)      |
//! | plans      | reload unless either row is the session user's (own → no-op) |
//! | poll votes | re-fetch that one poll, never a reload                       |
//!
//! Missing-entity patches are logged no-ops, never errors: a like for an item
//! we don't hold self-heals on the next full reload. Counters saturate at
//! zero so delete-before-insert reordering only transiently mis-states them.

use tracing::{debug, trace, warn};

use rosterline_types::{PlanRow, PollId};

use crate::store::FeedStore;
use crate::subscriptions::{ChangeKind, StreamEvent};

/// What the router decided; the engine performs any async follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// A scoped patch was applied in place.
    Patched,
    /// A foreign entry was inserted — flagged, merge deferred until the user
    /// asks for newer content.
    NewPostsAvailable,
    /// Only a wholesale re-fetch can express this change.
    FullReload,
    /// Re-fetch one poll's state from the gateway.
    RefetchPoll(PollId),
    /// Nothing to do (own plan echo, unknown item, irrelevant operation).
    Ignored,
}

/// Route one stream event, applying scoped patches directly to the store.
pub fn reconcile(store: &mut FeedStore, event: &StreamEvent) -> ReconcileAction {
    let session_user = store.session_user();

    match event {
        // ── Entries: structural, mostly reload ──────────────────────────
        StreamEvent::Entry { kind, new, old } => match kind {
            ChangeKind::Insert => match new {
                Some(row) if row.user_id == session_user => {
                    // Our own insert: reconcile local view with the
                    // server-assigned fields
                    debug!(entry = %row.id, "own entry insert, reloading");
                    ReconcileAction::FullReload
                }
                Some(row) => {
                    // Don't reorder the feed under the user's thumb — defer
                    debug!(entry = %row.id, "foreign entry insert, flagging new posts");
                    store.set_has_new_posts(true);
                    ReconcileAction::NewPostsAvailable
                }
                None => {
                    warn!("entry insert event without a new row");
                    ReconcileAction::Ignored
                }
            },
            ChangeKind::Update | ChangeKind::Delete => {
                // Edits can change sort keys or visibility (privacy, circle
                // membership) — a scoped patch cannot express that
                let id = new.as_ref().or(old.as_ref()).map(|r| r.id);
                debug!(entry = ?id, ?kind, "structural entry change, reloading");
                ReconcileAction::FullReload
            }
        },

        // ── Likes: counter patch, never a reload ────────────────────────
        StreamEvent::Like { kind, new, old } => {
            let (row, delta, liked) = match kind {
                ChangeKind::Insert => match new {
                    Some(row) => (row, 1, true),
                    None => return ReconcileAction::Ignored,
                },
                ChangeKind::Delete => match old {
                    Some(row) => (row, -1, false),
                    None => return ReconcileAction::Ignored,
                },
                ChangeKind::Update => {
                    trace!("like update event, nothing to patch");
                    return ReconcileAction::Ignored;
                }
            };
            let own_flag = (row.user_id == session_user).then_some(liked);
            match store.engagement_mut(row.entry_id) {
                Some(engagement) => {
                    engagement.apply_like_delta(delta, own_flag);
                    trace!(entry = %row.entry_id, delta, "like patch applied");
                    ReconcileAction::Patched
                }
                None => {
                    // Self-heals on the next full reload
                    warn!(entry = %row.entry_id, "like event for unknown item, skipping");
                    ReconcileAction::Ignored
                }
            }
        }

        // ── Comments: count only, bodies come with the next reload ──────
        StreamEvent::Comment { kind, new, old } => {
            let (row, delta) = match kind {
                ChangeKind::Insert => match new {
                    Some(row) => (row, 1),
                    None => return ReconcileAction::Ignored,
                },
                ChangeKind::Delete => match old {
                    Some(row) => (row, -1),
                    None => return ReconcileAction::Ignored,
                },
                ChangeKind::Update => {
                    trace!("comment update event, nothing to patch");
                    return ReconcileAction::Ignored;
                }
            };
            match store.engagement_mut(row.entry_id) {
                Some(engagement) => {
                    engagement.apply_comment_delta(delta);
                    trace!(entry = %row.entry_id, delta, "comment count patch applied");
                    ReconcileAction::Patched
                }
                None => {
                    warn!(entry = %row.entry_id, "comment event for unknown item, skipping");
                    ReconcileAction::Ignored
                }
            }
        }

        // ── Plans: reload only when neither row is the session user's ───
        StreamEvent::Plan { kind, new, old } => {
            if new.is_none() && old.is_none() {
                warn!(?kind, "plan event without rows");
                return ReconcileAction::Ignored;
            }
            let owns = |row: &Option<PlanRow>| {
                row.as_ref().is_some_and(|r| r.user_id == session_user)
            };
            if owns(new) || owns(old) {
                // Already reflected via direct local calls
                trace!(?kind, "own plan echo, ignoring");
                ReconcileAction::Ignored
            } else {
                debug!(?kind, "foreign plan change, reloading");
                ReconcileAction::FullReload
            }
        }

        // ── Poll votes: single-poll re-fetch ────────────────────────────
        StreamEvent::PollVote { kind, new, old } => match kind {
            ChangeKind::Insert | ChangeKind::Update => {
                match new.as_ref().or(old.as_ref()) {
                    Some(row) => {
                        trace!(poll = %row.poll_id, "poll vote, scheduling re-fetch");
                        ReconcileAction::RefetchPoll(row.poll_id)
                    }
                    None => ReconcileAction::Ignored,
                }
            }
            ChangeKind::Delete => {
                trace!("poll vote delete, waiting for next reload");
                ReconcileAction::Ignored
            }
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
