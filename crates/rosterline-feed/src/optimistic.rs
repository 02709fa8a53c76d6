//! The optimistic transaction helper.
//!
//! Every user-initiated engagement write follows the same protocol: capture an
//! undo state, mutate the projection synchronously, fire the gateway call,
//! and on failure restore exactly what was captured. [`OptimisticTxn`]
//! centralizes the capture/commit/rollback bookkeeping so the like, reaction,
//! and comment call sites don't each hand-roll it.
//!
//! Two capture modes cover the two revert shapes the protocol needs:
//!
//! - [`OptimisticTxn::engagement`] snapshots the like/reaction fields and
//!   restores them wholesale.
//! - [`OptimisticTxn::comment`] remembers a synthetic comment id and reverts
//!   by removing that one comment — surgical, so a remote comment-count patch
//!   arriving mid-flight survives the rollback.
//!
//! Poll votes deliberately do not use this helper: tallies are never
//! optimistic (only the local selection is), so there is no engagement state
//! to restore.

use tracing::{debug, warn};

use rosterline_types::{CommentId, EngagementSnapshot, EntryId};

use crate::store::FeedStore;

/// What a rollback restores.
#[derive(Debug)]
enum Undo {
    /// Restore the captured like/reaction fields exactly.
    Engagement {
        entry: EntryId,
        snapshot: EngagementSnapshot,
    },
    /// Remove one optimistic comment (and its count bump).
    RemoveComment { entry: EntryId, temp_id: CommentId },
}

/// A pending optimistic mutation: holds the undo state between the local
/// apply and the gateway response.
#[derive(Debug)]
pub struct OptimisticTxn {
    undo: Undo,
}

impl OptimisticTxn {
    /// Capture the like/reaction undo snapshot for an item. Returns `None`
    /// when the item is not in the projection (treat as a logged no-op).
    pub fn engagement(store: &mut FeedStore, entry: EntryId) -> Option<Self> {
        let snapshot = store.engagement_mut(entry)?.snapshot();
        Some(Self {
            undo: Undo::Engagement { entry, snapshot },
        })
    }

    /// Record a synthetic comment for later removal on failure.
    pub fn comment(entry: EntryId, temp_id: CommentId) -> Self {
        Self {
            undo: Undo::RemoveComment { entry, temp_id },
        }
    }

    /// The gateway confirmed — the optimistic value is now authoritative.
    pub fn commit(self) {
        debug!(txn = ?self.undo, "optimistic mutation committed");
    }

    /// The gateway rejected — restore the captured undo state.
    pub fn rollback(self, store: &mut FeedStore) {
        match self.undo {
            Undo::Engagement { entry, snapshot } => match store.engagement_mut(entry) {
                Some(engagement) => {
                    debug!(%entry, "rolling back optimistic engagement mutation");
                    engagement.restore(snapshot);
                }
                None => {
                    // The item vanished mid-flight (full reload) — nothing to restore
                    warn!(%entry, "rollback target missing, skipping");
                }
            },
            Undo::RemoveComment { entry, temp_id } => match store.engagement_mut(entry) {
                Some(engagement) => {
                    debug!(%entry, %temp_id, "removing unconfirmed optimistic comment");
                    if !engagement.remove_comment(temp_id) {
                        warn!(%entry, %temp_id, "optimistic comment already gone");
                    }
                }
                None => {
                    warn!(%entry, "rollback target missing, skipping");
                }
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rosterline_types::{Comment, ReactionKind};

    use crate::test_support::{first_entry_id, loaded_store_with_likes};

    #[test]
    fn test_engagement_rollback_is_exact() {
        // Scenario: {is_liked: false, like_count: 3} toggled, gateway fails,
        // reverts to {is_liked: false, like_count: 3}
        let (mut store, me) = loaded_store_with_likes(3);
        let entry = first_entry_id(&store);

        let txn = OptimisticTxn::engagement(&mut store, entry).unwrap();
        let engagement = store.engagement_mut(entry).unwrap();
        engagement.toggle_like(me);
        assert!(engagement.is_liked);
        assert_eq!(engagement.like_count, 4);

        txn.rollback(&mut store);
        let engagement = store.engagement_mut(entry).unwrap();
        assert!(!engagement.is_liked);
        assert_eq!(engagement.like_count, 3);
        assert_eq!(engagement.user_reaction, None);
    }

    #[test]
    fn test_reaction_rollback_restores_ledger() {
        let (mut store, me) = loaded_store_with_likes(0);
        let entry = first_entry_id(&store);

        let txn = OptimisticTxn::engagement(&mut store, entry).unwrap();
        store
            .engagement_mut(entry)
            .unwrap()
            .set_user_reaction(me, Some(ReactionKind::Fire));

        txn.rollback(&mut store);
        let engagement = store.engagement_mut(entry).unwrap();
        assert!(engagement.reactions.is_empty());
        assert_eq!(engagement.like_count, 0);
    }

    #[test]
    fn test_engagement_capture_unknown_item_is_none() {
        let (mut store, _) = loaded_store_with_likes(0);
        assert!(OptimisticTxn::engagement(&mut store, EntryId::new()).is_none());
    }

    #[test]
    fn test_comment_rollback_removes_only_the_synthetic() {
        let (mut store, _) = loaded_store_with_likes(0);
        let entry = first_entry_id(&store);
        let temp_id = CommentId::new();

        let engagement = store.engagement_mut(entry).unwrap();
        engagement.push_optimistic_comment(Comment {
            id: temp_id,
            author_name: "me".to_string(),
            content: "so jealous".to_string(),
            image_uri: None,
            is_optimistic: true,
        });
        // A remote comment lands while the gateway call is in flight
        engagement.apply_comment_delta(1);
        assert_eq!(engagement.comment_count, 2);

        let txn = OptimisticTxn::comment(entry, temp_id);
        txn.rollback(&mut store);

        let engagement = store.engagement_mut(entry).unwrap();
        assert!(engagement.comments.is_empty());
        // The remote contribution survives the surgical revert
        assert_eq!(engagement.comment_count, 1);
    }

    #[test]
    fn test_rollback_after_item_vanishes_is_noop() {
        let (mut store, _) = loaded_store_with_likes(0);
        let entry = first_entry_id(&store);
        let txn = OptimisticTxn::engagement(&mut store, entry).unwrap();

        // Simulate a full reload wiping the projection mid-flight
        let generation = store.begin_load();
        store.complete_load(generation, Vec::new(), Vec::new());

        txn.rollback(&mut store); // must not panic
        assert!(store.snapshot().dates.is_empty());
    }

    #[test]
    fn test_commit_consumes_txn() {
        let (mut store, me) = loaded_store_with_likes(0);
        let entry = first_entry_id(&store);
        let txn = OptimisticTxn::engagement(&mut store, entry).unwrap();
        store.engagement_mut(entry).unwrap().toggle_like(me);
        txn.commit();
        assert!(store.engagement_mut(entry).unwrap().is_liked);
    }
}
