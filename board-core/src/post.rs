//! Post domain model
//!
//! This module provides the Post entity: one piece of feedback submitted to a
//! tenant's board. Posts are addressed by their per-tenant sequential number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::user::UserId;

/// Identifier of a stored post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a post.
///
/// Status changes never affect who follows the post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Awaiting triage
    #[default]
    Open,

    /// Work has started
    Started,

    /// Shipped
    Completed,

    /// Will not be done
    Declined,

    /// Accepted for the roadmap
    Planned,

    /// Merged into another post
    Duplicate,

    /// Removed by a moderator
    Deleted,
}

impl PostStatus {
    /// Check if the post no longer accepts activity.
    ///
    /// # Returns
    ///
    /// `true` for Completed, Declined, Duplicate and Deleted
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Declined | Self::Duplicate | Self::Deleted
        )
    }

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Declined => "declined",
            Self::Planned => "planned",
            Self::Duplicate => "duplicate",
            Self::Deleted => "deleted",
        }
    }

    /// Parse status from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "started" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            "declined" => Some(Self::Declined),
            "planned" => Some(Self::Planned),
            "duplicate" => Some(Self::Duplicate),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A post on a tenant's board.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_core::{Post, PostId, PostStatus, UserId};
///
/// let tenant_id = Uuid::now_v7();
/// let mut post = Post::new(PostId(1), tenant_id, 1, UserId(2), "Dark mode", "Please");
/// assert_eq!(post.status, PostStatus::Open);
///
/// post.respond(PostStatus::Deleted, "Invalid Post!");
/// assert!(post.status.is_closed());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Post ID
    pub id: PostId,

    /// Tenant the post belongs to
    pub tenant_id: Uuid,

    /// Sequential number within the tenant, starting at 1
    pub number: i32,

    /// Title
    pub title: String,

    /// Description
    pub description: String,

    /// User who submitted the post
    pub author_id: UserId,

    /// Current status
    pub status: PostStatus,

    /// Moderator response attached to the last status change
    pub response: Option<String>,

    /// When the post was created
    pub created_at: DateTime<Utc>,

    /// When the post was last updated
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Creates an open post.
    ///
    /// # Arguments
    ///
    /// * `id` - Storage-assigned identifier
    /// * `tenant_id` - Owning tenant
    /// * `number` - Per-tenant sequential number
    /// * `author_id` - Submitting user
    /// * `title` - Post title
    /// * `description` - Post description
    pub fn new(
        id: PostId,
        tenant_id: Uuid,
        number: i32,
        author_id: UserId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            tenant_id,
            number,
            title: title.into(),
            description: description.into(),
            author_id,
            status: PostStatus::Open,
            response: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the post to `status` with a moderator response.
    pub fn respond(&mut self, status: PostStatus, text: impl Into<String>) {
        self.status = status;
        self.response = Some(text.into());
        self.updated_at = Utc::now();
    }
}
