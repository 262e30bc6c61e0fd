//! # Board Subscriptions
//!
//! Decides who gets notified, and through which channel, when something
//! happens to a post on a feedback board.
//!
//! ## Overview
//!
//! The board-subscriptions crate provides:
//! - **Membership Ledger**: Explicit follow / opt-out records per post and user
//! - **Preference Store**: Per-user, per-event channel bitmasks
//! - **Role Resolver**: Administrators follow every post implicitly
//! - **Resolution Engine**: Merges the three into an ordered subscriber list
//! - **Service**: Commands, single and batched queries, change feed
//!
//! ## Resolution Rules
//!
//! | Who                                | New post | New comment | Status change |
//! |------------------------------------|----------|-------------|---------------|
//! | Administrator                      | yes      | yes         | yes           |
//! | Member with a `Subscribed` record  | opt-in   | yes         | yes           |
//! | Member without a record            | opt-in   | no          | no            |
//! | Anyone with an `Unsubscribed` record | no     | no          | no            |
//!
//! Stored channel preferences replace the role default for their event type.
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use board_core::{NotificationChannel, NotificationEvent, RequestContext, UserRole};
//! use board_subscriptions::{
//!     GetActiveSubscribers, MemoryStore, SubscriptionConfig, SubscriptionService,
//! };
//!
//! # async fn example() -> board_subscriptions::SubscriptionResult<()> {
//! let service = SubscriptionService::new(MemoryStore::new(), SubscriptionConfig::default())
//!     .expect("default config is valid");
//! let tenant = service.register_tenant("Demo", "demo").await?;
//! let admin = service
//!     .register_user(tenant.id, "Jon Snow", None, UserRole::Administrator)
//!     .await?;
//! let ctx = RequestContext::new(tenant.id).with_user(admin.id);
//! let post = service.create_post(&ctx, "Dark mode", "Please").await?;
//!
//! // Web notifications only for new comments
//! let settings = HashMap::from([(
//!     "event_notification_new_comment".to_string(),
//!     "1".to_string(),
//! )]);
//! service.update_settings(&ctx, admin.id, settings).await?;
//!
//! let by_email = GetActiveSubscribers::new(
//!     post.number,
//!     NotificationEvent::NewComment,
//!     NotificationChannel::Email,
//! );
//! assert!(service.active_subscribers(&ctx, &by_email).await?.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod changes;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod preferences;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use changes::{ChangeEnvelope, ChangeFeed, ChangeListener, SubscriptionChange};
pub use commands::{Command, GetActiveSubscribers, HasSubscribedTo};
pub use config::{ConfigError, SubscriptionConfig};
pub use engine::{active_subscribers, has_subscribed_to};
pub use error::{SubscriptionError, SubscriptionResult};
pub use memory::MemoryStore;
pub use preferences::SettingsUpdate;
pub use service::SubscriptionService;
pub use store::{
    Directory, DirectoryWriter, LedgerWriter, MembershipLedger, PreferenceStore, PreferenceWriter,
    RoleResolver, Snapshot, Storage, Transaction,
};
