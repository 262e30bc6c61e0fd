//! Change feed
//!
//! Every committed write of the service is announced on an in-process
//! broadcast channel. Delivery is best-effort: a write never fails because
//! nobody listens, and a listener that falls behind skips what it missed.

use board_core::{NotificationEvent, PostId, PostStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// A committed change to subscription state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionChange {
    /// A post was created and its author subscribed.
    PostCreated {
        /// New post
        post_id: PostId,
        /// Per-tenant number of the post
        number: i32,
        /// Author, now subscribed
        author_id: UserId,
    },

    /// A post's status was changed.
    PostStatusChanged {
        /// Affected post
        post_id: PostId,
        /// New status
        status: PostStatus,
    },

    /// A user subscribed to a post.
    SubscriberAdded {
        /// Affected post
        post_id: PostId,
        /// Subscribed user
        user_id: UserId,
    },

    /// A user unsubscribed from a post.
    SubscriberRemoved {
        /// Affected post
        post_id: PostId,
        /// Unsubscribed user
        user_id: UserId,
    },

    /// A user changed notification settings.
    SettingsUpdated {
        /// Affected user
        user_id: UserId,
        /// Event types whose preference was replaced
        events: Vec<NotificationEvent>,
    },
}

impl SubscriptionChange {
    /// Routing topic, e.g. `subscription.added`.
    pub fn topic(&self) -> &'static str {
        match self {
            SubscriptionChange::PostCreated { .. } => "post.created",
            SubscriptionChange::PostStatusChanged { .. } => "post.status_changed",
            SubscriptionChange::SubscriberAdded { .. } => "subscription.added",
            SubscriptionChange::SubscriberRemoved { .. } => "subscription.removed",
            SubscriptionChange::SettingsUpdated { .. } => "settings.updated",
        }
    }
}

/// Change envelope carrying routing and tracing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEnvelope {
    /// Unique change ID
    pub id: Uuid,

    /// Tenant the change happened in
    pub tenant_id: Uuid,

    /// When the change was committed
    pub occurred_at: DateTime<Utc>,

    /// Correlation ID of the request that caused the change
    pub correlation_id: Option<String>,

    /// The change itself
    pub change: SubscriptionChange,
}

impl ChangeEnvelope {
    /// Wrap `change` for `tenant_id`.
    pub fn new(tenant_id: Uuid, change: SubscriptionChange) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            occurred_at: Utc::now(),
            correlation_id: None,
            change,
        }
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

/// Handle for receiving changes.
pub struct ChangeListener {
    receiver: broadcast::Receiver<ChangeEnvelope>,
}

impl ChangeListener {
    /// Receive the next change.
    ///
    /// Returns `None` once the feed is dropped. Changes lost because this
    /// listener lagged behind are skipped.
    pub async fn recv(&mut self) -> Option<ChangeEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change listener lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next change if one is already queued.
    pub fn try_recv(&mut self) -> Option<ChangeEnvelope> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change listener lagged behind");
                }
                Err(_) => return None,
            }
        }
    }
}

impl std::fmt::Debug for ChangeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListener")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

/// In-process broadcast of [`ChangeEnvelope`]s.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEnvelope>,
}

impl ChangeFeed {
    /// Create a feed buffering up to `capacity` changes per listener.
    ///
    /// `capacity` must be at least 1.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Start listening. Only changes published afterwards are received.
    pub fn subscribe(&self) -> ChangeListener {
        ChangeListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish a change to every current listener.
    pub fn publish(&self, envelope: ChangeEnvelope) {
        let topic = envelope.change.topic();
        match self.sender.send(envelope) {
            Ok(listeners) => debug!(topic, listeners, "Published subscription change"),
            Err(_) => debug!(topic, "No listener for subscription change"),
        }
    }

    /// Number of live listeners.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
