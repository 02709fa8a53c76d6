//! Canonical plan records and their timeline projection.
//!
//! A session user's plans live in exactly one place — the canonical plan
//! store — and the merged timeline renders them through
//! [`PlanItem::timeline_projection`]. The projection is derived on read, never
//! stored, so a plan's engagement fields have a single mutation target and the
//! two views cannot drift. Plans authored by *other* users arrive as ordinary
//! timeline entries and never get a canonical record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{Engagement, EntryPayload, FeedItem};
use crate::ids::{PlanId, UserId};

/// A session-user plan: the canonical record behind the timeline's plan cards
/// and the plan-specific screens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: PlanId,
    pub person_name: String,
    pub display_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: UserId,
    pub author_name: String,
    pub author_username: Option<String>,
    pub author_avatar: Option<String>,
    /// Free-form time-of-day text ("7pm", "after work").
    pub time: Option<String>,
    pub content: Option<String>,
    /// The plan's actual calendar date, when one was given.
    pub raw_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    #[serde(flatten)]
    pub engagement: Engagement,
}

impl PlanItem {
    /// Project this plan into the merged timeline's [`FeedItem`] shape.
    ///
    /// Keeps only what the timeline card needs; `poll` is always absent on
    /// plan cards, and the projection is marked as the session user's own
    /// post (only the session user's plans have canonical records).
    pub fn timeline_projection(&self) -> FeedItem {
        FeedItem {
            id: self.id.as_entry_id(),
            person_name: self.person_name.clone(),
            display_date: self.display_date.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            author_id: self.author_id,
            author_name: self.author_name.clone(),
            author_username: self.author_username.clone(),
            author_avatar: self.author_avatar.clone(),
            is_own_post: true,
            engagement: self.engagement.clone(),
            poll: None,
            user_poll_vote: None,
            payload: EntryPayload::Plan {
                time: self.time.clone(),
                content: self.content.clone(),
                raw_date: self.raw_date,
                is_completed: self.is_completed,
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
    use crate::entry::EntryKind;

    fn sample_plan() -> PlanItem {
        PlanItem {
            id: PlanId::new(),
            person_name: "Sam".to_string(),
            display_date: "2d ago".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author_id: UserId::new(),
            author_name: "me".to_string(),
            author_username: Some("me_irl".to_string()),
            author_avatar: None,
            time: Some("7pm".to_string()),
            content: Some("dinner at the pier".to_string()),
            raw_date: None,
            is_completed: false,
            engagement: Engagement::default(),
        }
    }

    #[test]
    fn test_projection_is_plan_kind_and_own() {
        let plan = sample_plan();
        let item = plan.timeline_projection();
        assert_eq!(item.kind(), EntryKind::Plan);
        assert!(item.is_own_post);
        assert!(item.poll.is_none());
    }

    #[test]
    fn test_projection_shares_id_space() {
        let plan = sample_plan();
        let item = plan.timeline_projection();
        assert_eq!(item.id, plan.id.as_entry_id());
    }

    #[test]
    fn test_projection_carries_engagement() {
        let mut plan = sample_plan();
        plan.engagement.toggle_like(plan.author_id);
        let item = plan.timeline_projection();
        assert_eq!(item.engagement.like_count, 1);
        assert!(item.engagement.is_liked);
    }

    #[test]
    fn test_projection_carries_plan_payload() {
        let plan = sample_plan();
        let item = plan.timeline_projection();
        match item.payload {
            EntryPayload::Plan {
                ref time,
                ref content,
                is_completed,
                ..
            } => {
                assert_eq!(time.as_deref(), Some("7pm"));
                assert_eq!(content.as_deref(), Some("dinner at the pier"));
                assert!(!is_completed);
            }
            ref other => panic!("expected plan payload, got {:?}", other),
        }
    }
}
