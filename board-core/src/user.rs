//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::notification::NotificationEvent;
use crate::roles::UserRole;
use crate::settings::NotificationSettings;

/// Identifier of a registered user.
///
/// Assigned by storage in registration order. Identifiers are unique and
/// totally ordered; subscriber lists are sorted by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user of a tenant.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_core::{User, UserId, UserRole};
///
/// let tenant_id = Uuid::now_v7();
/// let user = User::new(UserId(1), tenant_id, "Jon Snow", UserRole::Administrator)
///     .with_email("jon.snow@example.com");
/// assert!(user.is_admin_of(tenant_id));
/// assert!(!user.is_admin_of(Uuid::now_v7()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,

    /// Tenant the user is registered with
    pub tenant_id: Uuid,

    /// Display name
    pub name: String,

    /// Contact email, if known
    pub email: Option<String>,

    /// Role within the tenant
    pub role: UserRole,

    /// Notification channel preferences
    #[serde(default)]
    pub settings: NotificationSettings,

    /// When the user registered
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with no stored notification preferences.
    pub fn new(id: UserId, tenant_id: Uuid, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id,
            tenant_id,
            name: name.into(),
            email: None,
            role,
            settings: NotificationSettings::default(),
            created_at: Utc::now(),
        }
    }

    /// Set the contact email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Check if the user holds an administrative role.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Check if the user is an administrator of `tenant_id`.
    pub fn is_admin_of(&self, tenant_id: Uuid) -> bool {
        self.tenant_id == tenant_id && self.is_admin()
    }

    /// Check whether the user must follow a post to receive `event` for it.
    pub fn requires_subscription(&self, event: NotificationEvent) -> bool {
        event.requires_subscription(self.role)
    }
}
