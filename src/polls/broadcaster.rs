//! Live fan-out of tally updates to poll channels.
//!
//! A channel is keyed by poll code (`poll_<code>`). Each connected socket
//! registers one [`Subscriber`], which owns a bounded queue drained by that
//! socket's writer task. Publishing never waits: a full queue drops the update
//! for that subscriber and a closed one is unregistered on the spot.
//!
//! One mutex guards the whole registry, so joins, leaves and publishes never
//! interleave and every subscriber of a channel sees updates in publish order.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::polls::tally::Tally;

pub type SubscriberId = Uuid;

pub fn channel_key(code: &str) -> String {
    format!("poll_{code}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteUpdate {
    pub poll_id: String,
    pub code: String,
    pub vote_counts: Vec<u64>,
    pub total_votes: u64,
    pub selected: Vec<u32>,
    pub device_id: String,
}

impl VoteUpdate {
    pub fn new(
        poll_id: String,
        code: String,
        tally: Tally,
        selected: Vec<u32>,
        device_id: String,
    ) -> Self {
        Self {
            poll_id,
            code,
            vote_counts: tally.counts,
            total_votes: tally.total,
            selected,
            device_id,
        }
    }
}

/// Frames pushed to a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChannelEvent {
    VoteUpdate(VoteUpdate),
    Joined { code: String },
    Left { code: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<ChannelEvent>,
}

impl Subscriber {
    pub fn new(tx: mpsc::Sender<ChannelEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Sends a frame to this subscriber only. Returns false if it was dropped.
    pub fn notify(&self, event: ChannelEvent) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    channels: Mutex<HashMap<String, HashMap<SubscriberId, Subscriber>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel_key: &str, subscriber: &Subscriber) {
        let mut channels = self.channels.lock();
        channels
            .entry(channel_key.to_string())
            .or_default()
            .insert(subscriber.id, subscriber.clone());
        debug!(channel = %channel_key, subscriber = %subscriber.id, "joined channel");
    }

    /// Returns whether the subscriber was in the channel.
    pub fn unsubscribe(&self, channel_key: &str, subscriber: SubscriberId) -> bool {
        let mut channels = self.channels.lock();
        let Some(members) = channels.get_mut(channel_key) else {
            return false;
        };
        let removed = members.remove(&subscriber).is_some();
        if members.is_empty() {
            channels.remove(channel_key);
        }
        if removed {
            debug!(channel = %channel_key, %subscriber, "left channel");
        }
        removed
    }

    /// Detaches a subscriber from every channel; returns how many it was in.
    pub fn unsubscribe_all(&self, subscriber: SubscriberId) -> usize {
        let mut channels = self.channels.lock();
        let mut removed = 0;
        channels.retain(|_, members| {
            if members.remove(&subscriber).is_some() {
                removed += 1;
            }
            !members.is_empty()
        });
        removed
    }

    /// Best-effort delivery to the current members of `channel_key`.
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, channel_key: &str, event: ChannelEvent) -> usize {
        let mut channels = self.channels.lock();
        let Some(members) = channels.get_mut(channel_key) else {
            trace!(channel = %channel_key, "no subscribers");
            return 0;
        };

        let mut delivered = 0;
        members.retain(|id, subscriber| match subscriber.tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(channel = %channel_key, subscriber = %id, "subscriber queue full, dropping update");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(channel = %channel_key, subscriber = %id, "pruning closed subscriber");
                false
            }
        });
        if members.is_empty() {
            channels.remove(channel_key);
        }

        delivered
    }

    pub fn publish_vote(&self, update: VoteUpdate) -> usize {
        let key = channel_key(&update.code);
        self.publish(&key, ChannelEvent::VoteUpdate(update))
    }

    pub fn subscriber_count(&self, channel_key: &str) -> usize {
        self.channels
            .lock()
            .get(channel_key)
            .map_or(0, HashMap::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }
}
