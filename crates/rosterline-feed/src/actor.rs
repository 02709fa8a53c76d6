//! The feed actor: a single task that owns the engine and serializes every
//! mutation, stream event, and status update against it.
//!
//! UI code holds a cheap-to-clone [`FeedHandle`]; commands go in over an mpsc
//! channel, state comes back out over a `watch` channel carrying the latest
//! [`FeedSnapshot`]. Because one task owns the engine there is no locking and
//! no interleaving — a stream event can never observe a mutation half done.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use rosterline_types::{EntryId, EntryRow, PlanId, ReactionKind, UserId};

use crate::engine::{FeedEngine, MutationOutcome};
use crate::gateway::{FeedGateway, GatewayError};
use crate::store::{FeedSnapshot, LoadOutcome};
use crate::subscriptions::{ChangeStream, SubscriptionManager};

const COMMAND_BUFFER: usize = 32;

/// The actor's mailbox.
enum FeedCommand {
    Refresh {
        reply: oneshot::Sender<LoadOutcome>,
    },
    LoadNewPosts {
        reply: oneshot::Sender<LoadOutcome>,
    },
    ToggleLike {
        entry: EntryId,
        reply: oneshot::Sender<MutationOutcome>,
    },
    SetReaction {
        entry: EntryId,
        kind: Option<ReactionKind>,
        reply: oneshot::Sender<MutationOutcome>,
    },
    AddComment {
        entry: EntryId,
        author_name: String,
        content: String,
        image_uri: Option<String>,
        reply: oneshot::Sender<MutationOutcome>,
    },
    VoteOnPoll {
        entry: EntryId,
        option_index: usize,
        reply: oneshot::Sender<MutationOutcome>,
    },
    SetPlanCompleted {
        plan: PlanId,
        completed: bool,
        reply: oneshot::Sender<MutationOutcome>,
    },
    CreateEntry {
        row: EntryRow,
        reply: oneshot::Sender<Result<EntryId, GatewayError>>,
    },
    UpdateEntry {
        row: EntryRow,
        reply: oneshot::Sender<Result<(), GatewayError>>,
    },
    DeleteEntry {
        id: EntryId,
        reply: oneshot::Sender<Result<(), GatewayError>>,
    },
    DeletePlan {
        plan: PlanId,
        reply: oneshot::Sender<Result<(), GatewayError>>,
    },
}

/// The actor task exited (session teardown).
#[derive(Debug, thiserror::Error)]
#[error("feed actor stopped")]
pub struct ActorStopped;

/// Clonable handle to a running feed actor.
#[derive(Clone)]
pub struct FeedHandle {
    commands: mpsc::Sender<FeedCommand>,
    snapshots: watch::Receiver<FeedSnapshot>,
}

impl FeedHandle {
    /// The latest published snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A watch receiver for reactive UI consumption.
    pub fn watch(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> FeedCommand,
    ) -> Result<T, ActorStopped> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| ActorStopped)?;
        reply_rx.await.map_err(|_| ActorStopped)
    }

    pub async fn refresh(&self) -> Result<LoadOutcome, ActorStopped> {
        self.request(|reply| FeedCommand::Refresh { reply }).await
    }

    pub async fn load_new_posts(&self) -> Result<LoadOutcome, ActorStopped> {
        self.request(|reply| FeedCommand::LoadNewPosts { reply }).await
    }

    pub async fn toggle_like(&self, entry: EntryId) -> Result<MutationOutcome, ActorStopped> {
        self.request(|reply| FeedCommand::ToggleLike { entry, reply })
            .await
    }

    pub async fn set_reaction(
        &self,
        entry: EntryId,
        kind: Option<ReactionKind>,
    ) -> Result<MutationOutcome, ActorStopped> {
        self.request(|reply| FeedCommand::SetReaction { entry, kind, reply })
            .await
    }

    pub async fn add_comment(
        &self,
        entry: EntryId,
        author_name: impl Into<String>,
        content: impl Into<String>,
        image_uri: Option<String>,
    ) -> Result<MutationOutcome, ActorStopped> {
        let author_name = author_name.into();
        let content = content.into();
        self.request(|reply| FeedCommand::AddComment {
            entry,
            author_name,
            content,
            image_uri,
            reply,
        })
        .await
    }

    pub async fn vote_on_poll(
        &self,
        entry: EntryId,
        option_index: usize,
    ) -> Result<MutationOutcome, ActorStopped> {
        self.request(|reply| FeedCommand::VoteOnPoll {
            entry,
            option_index,
            reply,
        })
        .await
    }

    pub async fn set_plan_completed(
        &self,
        plan: PlanId,
        completed: bool,
    ) -> Result<MutationOutcome, ActorStopped> {
        self.request(|reply| FeedCommand::SetPlanCompleted {
            plan,
            completed,
            reply,
        })
        .await
    }

    pub async fn create_entry(&self, row: EntryRow) -> Result<Result<EntryId, GatewayError>, ActorStopped> {
        self.request(|reply| FeedCommand::CreateEntry { row, reply }).await
    }

    pub async fn update_entry(&self, row: EntryRow) -> Result<Result<(), GatewayError>, ActorStopped> {
        self.request(|reply| FeedCommand::UpdateEntry { row, reply }).await
    }

    pub async fn delete_entry(&self, id: EntryId) -> Result<Result<(), GatewayError>, ActorStopped> {
        self.request(|reply| FeedCommand::DeleteEntry { id, reply }).await
    }

    pub async fn delete_plan(&self, plan: PlanId) -> Result<Result<(), GatewayError>, ActorStopped> {
        self.request(|reply| FeedCommand::DeletePlan { plan, reply }).await
    }
}

/// Spawn the feed actor for one session user: subscribes all change-stream
/// channels, runs the initial load, then serves commands and events until the
/// last handle is dropped.
pub fn spawn_feed_actor(
    gateway: Arc<dyn FeedGateway>,
    stream: Arc<dyn ChangeStream>,
    session_user: UserId,
) -> FeedHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (snapshot_tx, snapshot_rx) = watch::channel(FeedSnapshot::default());

    tokio::spawn(run(gateway, stream, session_user, command_rx, snapshot_tx));

    FeedHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
    }
}

async fn run(
    gateway: Arc<dyn FeedGateway>,
    stream: Arc<dyn ChangeStream>,
    session_user: UserId,
    mut commands: mpsc::Receiver<FeedCommand>,
    snapshots: watch::Sender<FeedSnapshot>,
) {
    let mut engine = FeedEngine::new(gateway, session_user);
    // The engine publishes mid-mutation frames itself, so optimistic state
    // reaches watchers while the gateway call is still in flight.
    engine.set_publisher(snapshots);
    let mut manager = SubscriptionManager::new(stream);
    let (mut events, mut statuses) = manager.start(session_user);

    info!(user = %session_user, "feed actor started");
    let _ = engine.load().await;
    engine.publish();

    loop {
        tokio::select! {
            maybe_command = commands.recv() => {
                match maybe_command {
                    Some(command) => handle_command(&mut engine, command).await,
                    // Last handle dropped
                    None => break,
                }
            }
            Some(event) = events.recv() => {
                let action = engine.handle_stream_event(event).await;
                debug!(?action, "stream event handled");
            }
            Some(update) = statuses.recv() => {
                engine.handle_channel_update(update);
            }
        }
        // Settled state after each handled message
        engine.publish();
    }

    manager.stop();
    info!(user = %session_user, "feed actor stopped");
}

async fn handle_command(engine: &mut FeedEngine, command: FeedCommand) {
    match command {
        FeedCommand::Refresh { reply } => {
            let _ = reply.send(engine.load().await);
        }
        FeedCommand::LoadNewPosts { reply } => {
            let _ = reply.send(engine.load_new_posts().await);
        }
        FeedCommand::ToggleLike { entry, reply } => {
            let _ = reply.send(engine.toggle_like(entry).await);
        }
        FeedCommand::SetReaction { entry, kind, reply } => {
            let _ = reply.send(engine.set_reaction(entry, kind).await);
        }
        FeedCommand::AddComment {
            entry,
            author_name,
            content,
            image_uri,
            reply,
        } => {
            let outcome = engine
                .add_comment(entry, &author_name, content, image_uri)
                .await;
            let _ = reply.send(outcome);
        }
        FeedCommand::VoteOnPoll {
            entry,
            option_index,
            reply,
        } => {
            let _ = reply.send(engine.vote_on_poll(entry, option_index).await);
        }
        FeedCommand::SetPlanCompleted {
            plan,
            completed,
            reply,
        } => {
            let _ = reply.send(engine.set_plan_completed(plan, completed).await);
        }
        FeedCommand::CreateEntry { row, reply } => {
            let _ = reply.send(engine.create_entry(row).await);
        }
        FeedCommand::UpdateEntry { row, reply } => {
            let _ = reply.send(engine.update_entry(row).await);
        }
        FeedCommand::DeleteEntry { id, reply } => {
            let _ = reply.send(engine.delete_entry(id).await);
        }
        FeedCommand::DeletePlan { plan, reply } => {
            if reply.send(engine.delete_plan(plan).await).is_err() {
                warn!("caller gone before plan delete settled");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rosterline_types::LikeRow;

    use crate::subscriptions::{ChangeKind, Channel, ChannelStatus, ChannelUpdate, StreamEvent};
    use crate::test_support::{entry_row, init_tracing, plan_row, MockChangeStream, MockGateway};

    fn seeded(me: UserId) -> (Arc<MockGateway>, Arc<MockChangeStream>) {
        init_tracing();
        let gateway = Arc::new(MockGateway::with_entries(
            vec![entry_row(UserId::new(), "2026-08-20T00:00:00Z")],
            vec![plan_row(me, "2026-08-15T00:00:00Z")],
        ));
        (gateway, Arc::new(MockChangeStream::new()))
    }

    async fn settled(handle: &FeedHandle) -> FeedSnapshot {
        let mut rx = handle.watch();
        rx.wait_for(|snap| !snap.dates.is_empty())
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_actor_loads_on_spawn() {
        let me = UserId::new();
        let (gateway, stream) = seeded(me);
        let handle = spawn_feed_actor(gateway, stream, me);

        let snap = settled(&handle).await;
        assert_eq!(snap.dates.len(), 2);
        assert_eq!(snap.plans.len(), 1);
    }

    #[tokio::test]
    async fn test_mutations_flow_through_commands() {
        let me = UserId::new();
        let (gateway, stream) = seeded(me);
        let handle = spawn_feed_actor(gateway, stream, me);
        let snap = settled(&handle).await;
        let entry = snap.dates[0].id;

        let outcome = handle.toggle_like(entry).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(handle.snapshot().dates[0].engagement.like_count, 1);
    }

    #[tokio::test]
    async fn test_optimistic_like_visible_while_gateway_call_in_flight() {
        // A slow network must not delay the perceived mutation
        let me = UserId::new();
        let (gateway, stream) = seeded(me);
        let release = gateway.hold_next("toggle_like");
        let handle = spawn_feed_actor(gateway.clone(), stream, me);
        let snap = settled(&handle).await;
        let entry = snap.dates[0].id;

        let pending = tokio::spawn({
            let handle = handle.clone();
            async move { handle.toggle_like(entry).await }
        });
        let mut rx = handle.watch();
        rx.wait_for(|s| s.dates.first().is_some_and(|i| i.engagement.like_count == 1))
            .await
            .unwrap();
        // The gateway call is still held open at this point
        assert_eq!(gateway.call_count("toggle_like"), 1);

        release.notify_one();
        assert_eq!(pending.await.unwrap().unwrap(), MutationOutcome::Applied);
    }

    #[tokio::test]
    async fn test_stream_events_reach_the_projection() {
        let me = UserId::new();
        let (gateway, stream) = seeded(me);
        let handle = spawn_feed_actor(gateway, stream.clone(), me);
        let snap = settled(&handle).await;
        let entry = snap.dates[0].id;

        stream.push(StreamEvent::Like {
            kind: ChangeKind::Insert,
            new: Some(LikeRow {
                entry_id: entry,
                user_id: UserId::new(),
            }),
            old: None,
        });

        let mut rx = handle.watch();
        let snap = rx
            .wait_for(|s| s.dates.first().is_some_and(|i| i.engagement.like_count == 1))
            .await
            .unwrap()
            .clone();
        assert!(!snap.dates[0].engagement.is_liked);
    }

    #[tokio::test]
    async fn test_channel_failure_surfaces_on_snapshot() {
        let me = UserId::new();
        let (gateway, stream) = seeded(me);
        let handle = spawn_feed_actor(gateway, stream.clone(), me);
        settled(&handle).await;

        stream.push_status(ChannelUpdate {
            channel: Channel::Comments,
            status: ChannelStatus::Timeout,
        });
        let mut rx = handle.watch();
        rx.wait_for(|s| s.updates_delayed).await.unwrap();

        // Sibling channels keep delivering
        let entry = handle.snapshot().dates[0].id;
        stream.push(StreamEvent::Like {
            kind: ChangeKind::Insert,
            new: Some(LikeRow {
                entry_id: entry,
                user_id: UserId::new(),
            }),
            old: None,
        });
        rx.wait_for(|s| s.dates.first().is_some_and(|i| i.engagement.like_count == 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_round_trip() {
        let me = UserId::new();
        let (gateway, stream) = seeded(me);
        let handle = spawn_feed_actor(gateway.clone(), stream, me);
        settled(&handle).await;

        assert_eq!(handle.refresh().await.unwrap(), LoadOutcome::Applied);
        assert_eq!(gateway.call_count("load_entries"), 2);
    }
}
