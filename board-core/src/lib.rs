//! # Board Core
//!
//! Domain model for a multi-tenant feedback board, shared by the subscription
//! engine and whatever hosts it.
//!
//! ## Overview
//!
//! The board-core crate provides:
//! - **Tenants**: One feedback board each
//! - **Users**: Registered users with a role and notification settings
//! - **Roles**: Member and Administrator
//! - **Posts**: Feedback items addressed by a per-tenant number
//! - **Notifications**: Event types, delivery channels and channel bitmasks
//! - **Subscriptions**: Explicit follow / opt-out records per post and user
//! - **Context**: Tenant and user scope of a request
//!
//! ## Architecture
//!
//! ```text
//! Tenant
//!   ├─ User ── role, NotificationSettings (event → ChannelSet)
//!   └─ Post ── number, status
//!        └─ SubscriptionRecord (post, user) → Subscribed | Unsubscribed
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use board_core::{NotificationChannel, NotificationEvent, Tenant, User, UserId, UserRole};
//!
//! let tenant = Tenant::new("Demo", "demo");
//! let mut user = User::new(UserId(1), tenant.id, "Arya Stark", UserRole::Member);
//!
//! // Opt in to new-post notifications by email only
//! user.settings.set(NotificationEvent::NewPost, NotificationChannel::Email.into());
//! assert!(user
//!     .settings
//!     .effective(NotificationEvent::NewPost, user.role)
//!     .contains(NotificationChannel::Email));
//! ```

pub mod context;
pub mod notification;
pub mod post;
pub mod roles;
pub mod settings;
pub mod subscription;
pub mod tenant;
pub mod user;

// Re-export main types for convenience
pub use context::RequestContext;
pub use notification::{ChannelSet, NotificationChannel, NotificationEvent};
pub use post::{Post, PostId, PostStatus};
pub use roles::UserRole;
pub use settings::NotificationSettings;
pub use subscription::{SubscriptionRecord, SubscriptionStatus};
pub use tenant::Tenant;
pub use user::{User, UserId};
