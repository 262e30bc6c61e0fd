//! Post subscription records
//!
//! This module provides the explicit subscription state linking a user to a
//! post. A record is tri-state from the reader's point of view: `Subscribed`,
//! `Unsubscribed`, or no record at all. Only the first two are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::post::PostId;
use crate::user::UserId;

/// Explicit subscription state of a (post, user) pair.
///
/// `Unsubscribed` is a suppression: it overrides every implicit reason the user
/// would otherwise have to be notified about the post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// The user opted out of the post
    Unsubscribed = 0,

    /// The user follows the post
    Subscribed = 1,
}

impl SubscriptionStatus {
    /// Check if this status means the user follows the post.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Subscribed)
    }

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsubscribed => "unsubscribed",
            Self::Subscribed => "subscribed",
        }
    }
}

/// Stored subscription record for one (post, user) pair.
///
/// # Examples
///
/// ```
/// use board_core::{PostId, SubscriptionRecord, SubscriptionStatus, UserId};
///
/// let mut record = SubscriptionRecord::new(PostId(1), UserId(2), SubscriptionStatus::Subscribed);
/// assert!(record.status.is_active());
///
/// record.set_status(SubscriptionStatus::Unsubscribed);
/// assert!(!record.status.is_active());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Post ID
    pub post_id: PostId,

    /// User ID
    pub user_id: UserId,

    /// Explicit state
    pub status: SubscriptionStatus,

    /// When the record was first written
    pub created_at: DateTime<Utc>,

    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// Creates a record with the current timestamp.
    pub fn new(post_id: PostId, user_id: UserId, status: SubscriptionStatus) -> Self {
        let now = Utc::now();
        Self {
            post_id,
            user_id,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Change the explicit state.
    ///
    /// Writing the current state again leaves the record untouched.
    pub fn set_status(&mut self, status: SubscriptionStatus) {
        if self.status != status {
            self.status = status;
            self.updated_at = Utc::now();
        }
    }
}
