//! Subscription hub for live table change notification
//!
//! Streaming connections register under the endpoint string of the table
//! they are attached to (`tenant/object/table`). Broadcasting to an endpoint
//! delivers a text message to every registered subscriber of that endpoint
//! and nobody else.
//!
//! # Delivery
//!
//! - Each subscriber owns a bounded [`Mailbox`]; the hub holds the sending half.
//! - `broadcast` never blocks: a full or closed mailbox counts as a failed
//!   delivery and the subscriber is evicted. Eviction drops the hub's sending
//!   half, so the connection drains what is already queued and then sees its
//!   mailbox close. Other subscribers are unaffected.
//! - Messages to one endpoint are enqueued in the order `broadcast` is
//!   called, and each mailbox is FIFO, so callers that broadcast from inside
//!   the table lock get commit-order delivery.
//!
//! # Locking
//!
//! Each endpoint group has its own mutex. The group map is a `DashMap`, whose
//! shard lock is only held while inserting into or removing a group, never
//! while delivering.
//!
//! # Example
//!
//! ```ignore
//! use tablecast::pubsub::SubscriptionHub;
//!
//! # async fn example() {
//! let hub = SubscriptionHub::new();
//! let (subscriber, mut mailbox) = hub.new_subscriber();
//! hub.subscribe("default/shop/prices", subscriber);
//!
//! hub.broadcast("default/shop/prices", "UPDATE: apple: 1.50");
//! assert_eq!(mailbox.recv().await.as_deref(), Some("UPDATE: apple: 1.50"));
//! # }
//! ```

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Default number of undelivered messages a subscriber may hold
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Identifier of one subscriber, unique within a hub
pub type SubscriberId = u64;

/// Configuration for the subscription hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bounded capacity of each subscriber's mailbox
    pub mailbox_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

/// Sending half of a subscription, held by the hub
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<String>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

/// Receiving half of a subscription, held by the connection
#[derive(Debug)]
pub struct Mailbox {
    id: SubscriberId,
    receiver: mpsc::Receiver<String>,
}

impl Mailbox {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next broadcast.
    ///
    /// Returns `None` once the subscriber was evicted and everything queued
    /// before the eviction has been received.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }
}

type Group = Arc<Mutex<Vec<Subscriber>>>;

/// Hub-wide counters
#[derive(Debug, Clone, Serialize)]
pub struct HubStats {
    /// Endpoints with at least one subscriber
    pub endpoints: usize,
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Total broadcast calls
    pub broadcasts: u64,
    /// Total messages enqueued across all subscribers
    pub deliveries: u64,
    /// Subscribers removed after a failed delivery
    pub evictions: u64,
}

/// Tracks live streaming connections grouped by endpoint
#[derive(Debug)]
pub struct SubscriptionHub {
    groups: DashMap<String, Group>,
    config: HubConfig,
    next_id: AtomicU64,
    total_broadcasts: AtomicU64,
    total_deliveries: AtomicU64,
    total_evictions: AtomicU64,
}

impl SubscriptionHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            groups: DashMap::new(),
            config,
            next_id: AtomicU64::new(1),
            total_broadcasts: AtomicU64::new(0),
            total_deliveries: AtomicU64::new(0),
            total_evictions: AtomicU64::new(0),
        }
    }

    /// Allocate a subscriber and its mailbox. Nothing is registered yet.
    pub fn new_subscriber(&self) -> (Subscriber, Mailbox) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.config.mailbox_capacity.max(1));
        (Subscriber { id, sender }, Mailbox { id, receiver })
    }

    /// Register `subscriber` under `endpoint`
    pub fn subscribe(&self, endpoint: &str, subscriber: Subscriber) {
        let id = subscriber.id;
        // The shard guard is held across the push so an empty-group removal
        // cannot interleave and orphan this subscriber.
        let group = self.groups.entry(endpoint.to_string()).or_default();
        let mut members = group.lock();
        members.push(subscriber);
        debug!(endpoint, subscriber = id, members = members.len(), "Subscriber registered");
    }

    /// Remove a subscriber from `endpoint`. Returns whether it was registered.
    pub fn unsubscribe(&self, endpoint: &str, id: SubscriberId) -> bool {
        let Some(group) = self.group(endpoint) else {
            return false;
        };

        let removed = {
            let mut members = group.lock();
            let before = members.len();
            members.retain(|s| s.id != id);
            before != members.len()
        };

        if removed {
            debug!(endpoint, subscriber = id, "Subscriber unregistered");
            self.remove_if_empty(endpoint);
        }
        removed
    }

    /// Deliver `message` to every subscriber of `endpoint`.
    ///
    /// Returns the number of subscribers the message was enqueued for.
    /// Subscribers whose mailbox is full or closed are evicted.
    pub fn broadcast(&self, endpoint: &str, message: &str) -> usize {
        self.total_broadcasts.fetch_add(1, Ordering::Relaxed);
        let Some(group) = self.group(endpoint) else {
            return 0;
        };

        let mut delivered = 0usize;
        let mut evicted = 0usize;
        let now_empty = {
            let mut members = group.lock();
            members.retain(|subscriber| match subscriber.sender.try_send(message.to_string()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(endpoint, subscriber = subscriber.id, "Subscriber mailbox full, evicting");
                    evicted += 1;
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(endpoint, subscriber = subscriber.id, "Subscriber gone, evicting");
                    evicted += 1;
                    false
                }
            });
            members.is_empty()
        };

        self.total_deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        if evicted > 0 {
            self.total_evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        if now_empty {
            self.remove_if_empty(endpoint);
        }

        debug!(endpoint, delivered, evicted, "Broadcast complete");
        delivered
    }

    /// Number of subscribers currently registered under `endpoint`
    pub fn subscriber_count(&self, endpoint: &str) -> usize {
        self.group(endpoint).map(|g| g.lock().len()).unwrap_or(0)
    }

    /// Number of endpoints with at least one subscriber
    pub fn endpoint_count(&self) -> usize {
        self.groups.len()
    }

    /// Snapshot of hub counters
    pub fn stats(&self) -> HubStats {
        let subscribers = self.groups.iter().map(|g| g.value().lock().len()).sum();
        HubStats {
            endpoints: self.groups.len(),
            subscribers,
            broadcasts: self.total_broadcasts.load(Ordering::Relaxed),
            deliveries: self.total_deliveries.load(Ordering::Relaxed),
            evictions: self.total_evictions.load(Ordering::Relaxed),
        }
    }

    fn group(&self, endpoint: &str) -> Option<Group> {
        self.groups.get(endpoint).map(|g| g.value().clone())
    }

    fn remove_if_empty(&self, endpoint: &str) {
        if self
            .groups
            .remove_if(endpoint, |_, group| group.lock().is_empty())
            .is_some()
        {
            debug!(endpoint, "Removed empty endpoint group");
        }
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}
