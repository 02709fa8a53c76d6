//! The remote data gateway boundary.
//!
//! [`FeedGateway`] is the request/response surface the engine drives: loads,
//! engagement writes, structural writes, and the single-poll re-fetch used by
//! poll-vote reconciliation. The backend is an external collaborator — this
//! trait is the whole contract, and tests substitute a scripted in-memory
//! implementation.
//!
//! Errors never cross the engine boundary: every call site catches
//! [`GatewayError`] and folds it into the snapshot's `error` field or an
//! optimistic rollback.

use async_trait::async_trait;

use rosterline_types::{
    CommentId, EntryId, EntryRow, PlanId, PlanRow, PollId, PollRow, ReactionKind, UserId,
};

/// Failure taxonomy for gateway calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Backend unreachable or erroring — retryable.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    /// The backend refused the write (validation, permissions).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The target row no longer exists server-side.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Request/response operations against the backend.
///
/// # Load contract
///
/// `load_entries` returns every visible timeline row — dates, roster
/// additions, and plan-shaped entries by *any* author — while `load_plans`
/// returns only the session user's plans. The transforms skip plan-shaped
/// entry rows authored by the session user so the canonical plan store stays
/// the single source for them.
#[async_trait]
pub trait FeedGateway: Send + Sync {
    async fn load_entries(&self, user: UserId) -> Result<Vec<EntryRow>, GatewayError>;
    async fn load_plans(&self, user: UserId) -> Result<Vec<PlanRow>, GatewayError>;

    // ── Engagement writes ────────────────────────────────────────────────

    async fn toggle_like(&self, entry: EntryId, user: UserId) -> Result<(), GatewayError>;
    async fn set_reaction(
        &self,
        entry: EntryId,
        user: UserId,
        kind: Option<ReactionKind>,
    ) -> Result<(), GatewayError>;
    /// Returns the server-confirmed comment id.
    async fn add_comment(
        &self,
        entry: EntryId,
        user: UserId,
        content: &str,
        image_uri: Option<&str>,
    ) -> Result<CommentId, GatewayError>;
    /// Idempotent per user — a repeat vote overwrites the prior choice.
    async fn vote_on_poll(
        &self,
        entry: EntryId,
        user: UserId,
        option_index: usize,
    ) -> Result<(), GatewayError>;
    /// Re-fetch one poll's full option/tally/vote state.
    async fn fetch_poll(&self, poll: PollId) -> Result<PollRow, GatewayError>;

    // ── Structural writes ────────────────────────────────────────────────
    //
    // Projection effects arrive back through the change streams (own inserts
    // trigger a full reload), not through these return values.

    async fn create_entry(&self, row: EntryRow) -> Result<EntryId, GatewayError>;
    async fn update_entry(&self, row: EntryRow) -> Result<(), GatewayError>;
    async fn delete_entry(&self, id: EntryId) -> Result<(), GatewayError>;
    async fn update_plan(&self, row: PlanRow) -> Result<(), GatewayError>;
    async fn delete_plan(&self, id: PlanId) -> Result<(), GatewayError>;
}
