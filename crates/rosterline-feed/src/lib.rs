//! Client-side feed synchronization for Rosterline.
//!
//! This crate keeps a local projection of a user's social feed consistent
//! with the backend through three cooperating layers:
//!
//! - **Projection store** ([`store`]): the merged timeline, the canonical
//!   plan records, and the derived UI flags. Loads settle through a
//!   generation token so a slow stale load can never clobber a newer one.
//! - **Optimistic mutations** ([`engine`], [`optimistic`]): likes,
//!   reactions, comments, poll votes, and plan updates apply locally first,
//!   then settle against the gateway; failures restore the exact captured
//!   state.
//! - **Reconciliation** ([`reconcile`], [`subscriptions`]): five row-level
//!   change-stream channels feed a router that applies the narrowest
//!   correct patch, escalating to a full reload only for structural
//!   changes.
//!
//! Most consumers interact through [`actor::spawn_feed_actor`], which owns
//! a [`engine::FeedEngine`] on a dedicated task and publishes
//! [`store::FeedSnapshot`]s over a watch channel.

pub mod actor;
pub mod engine;
pub mod gateway;
pub mod optimistic;
pub mod reconcile;
pub mod store;
pub mod subscriptions;
pub mod transform;

#[cfg(test)]
mod test_support;

pub use actor::{spawn_feed_actor, ActorStopped, FeedHandle};
pub use engine::{FeedEngine, MutationOutcome};
pub use gateway::{FeedGateway, GatewayError};
pub use reconcile::{reconcile, ReconcileAction};
pub use store::{FeedSnapshot, FeedStore, LoadOutcome};
pub use subscriptions::{
    Channel, ChangeKind, ChangeStream, ChannelStatus, ChannelUpdate, StreamEvent,
    SubscriptionHandle, SubscriptionManager,
};
