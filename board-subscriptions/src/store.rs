//! Storage abstraction
//!
//! The engine never talks to a database directly. A [`Storage`] hands out
//! either a read-only [`Snapshot`] or an exclusive [`Transaction`]; everything
//! read through one snapshot reflects a single consistent state of the store,
//! and a transaction's writes land all together on commit or not at all.
//!
//! The read side is split into the components the engine composes:
//! - [`MembershipLedger`]: explicit subscription records per (post, user)
//! - [`PreferenceStore`]: per-user, per-event channel bitmasks
//! - [`RoleResolver`]: administrative roles per tenant
//! - [`Directory`]: lookups of users and posts

use async_trait::async_trait;
use board_core::{
    ChannelSet, NotificationEvent, Post, PostId, SubscriptionStatus, Tenant, User, UserId,
    UserRole,
};
use uuid::Uuid;

use crate::error::SubscriptionResult;

/// Read access to explicit subscription records.
pub trait MembershipLedger {
    /// Explicit state of `(post, user)`, or `None` if no record exists.
    fn status_of(&self, post: PostId, user: UserId) -> SubscriptionResult<Option<SubscriptionStatus>>;

    /// Every record of `post`, ordered by user.
    fn records_for(&self, post: PostId) -> SubscriptionResult<Vec<(UserId, SubscriptionStatus)>>;
}

/// Write access to explicit subscription records.
///
/// Every write is an upsert of a single (post, user) key.
pub trait LedgerWriter {
    /// Store `status` for `(post, user)`, replacing any previous record.
    fn upsert_status(
        &mut self,
        post: PostId,
        user: UserId,
        status: SubscriptionStatus,
    ) -> SubscriptionResult<()>;

    /// Subscribe the author of a freshly created post.
    fn record_author(&mut self, post: PostId, user: UserId) -> SubscriptionResult<()> {
        self.upsert_status(post, user, SubscriptionStatus::Subscribed)
    }

    /// Explicit opt-in.
    fn add(&mut self, post: PostId, user: UserId) -> SubscriptionResult<()> {
        self.upsert_status(post, user, SubscriptionStatus::Subscribed)
    }

    /// Explicit opt-out. The record stays and suppresses implicit defaults.
    fn remove(&mut self, post: PostId, user: UserId) -> SubscriptionResult<()> {
        self.upsert_status(post, user, SubscriptionStatus::Unsubscribed)
    }
}

/// Read access to users' channel preferences.
pub trait PreferenceStore {
    /// Stored bitmask of `user` for `event`; `None` if never configured.
    fn preference_of(
        &self,
        user: UserId,
        event: NotificationEvent,
    ) -> SubscriptionResult<Option<ChannelSet>>;

    /// Users of `tenant_id` that stored a preference for `event`.
    fn users_with_preference(
        &self,
        tenant_id: Uuid,
        event: NotificationEvent,
    ) -> SubscriptionResult<Vec<UserId>>;
}

/// Write access to users' channel preferences.
pub trait PreferenceWriter {
    /// Replace the stored bitmask of `user` for `event`.
    fn store_preference(
        &mut self,
        user: UserId,
        event: NotificationEvent,
        channels: ChannelSet,
    ) -> SubscriptionResult<()>;
}

/// Resolves administrative roles.
pub trait RoleResolver {
    /// Whether `user` is an administrator of `tenant_id`.
    ///
    /// Unknown users and users of other tenants are not administrators.
    fn is_admin(&self, user: UserId, tenant_id: Uuid) -> SubscriptionResult<bool>;

    /// Every administrator of `tenant_id`.
    fn administrators(&self, tenant_id: Uuid) -> SubscriptionResult<Vec<UserId>>;

    /// Role `user` holds within `tenant_id`.
    fn role_in(&self, user: UserId, tenant_id: Uuid) -> SubscriptionResult<UserRole> {
        Ok(if self.is_admin(user, tenant_id)? {
            UserRole::Administrator
        } else {
            UserRole::Member
        })
    }
}

/// Lookups of tenants, users and posts.
pub trait Directory {
    /// Tenant by ID.
    fn tenant(&self, id: Uuid) -> SubscriptionResult<Option<Tenant>>;

    /// User by ID.
    fn user(&self, id: UserId) -> SubscriptionResult<Option<User>>;

    /// Post by ID.
    fn post(&self, id: PostId) -> SubscriptionResult<Option<Post>>;

    /// Post by its per-tenant number.
    fn post_by_number(&self, tenant_id: Uuid, number: i32) -> SubscriptionResult<Option<Post>>;
}

/// Registration of tenants, users and posts.
///
/// Only what the engine needs to have something to resolve against; this is
/// not a content management layer.
pub trait DirectoryWriter {
    /// Store a new tenant.
    fn insert_tenant(&mut self, tenant: Tenant) -> SubscriptionResult<()>;

    /// Register a user, assigning the next user ID.
    fn insert_user(
        &mut self,
        tenant_id: Uuid,
        name: &str,
        email: Option<&str>,
        role: UserRole,
    ) -> SubscriptionResult<User>;

    /// Store a new open post, assigning its ID and next per-tenant number.
    fn insert_post(
        &mut self,
        tenant_id: Uuid,
        author: UserId,
        title: &str,
        description: &str,
    ) -> SubscriptionResult<Post>;

    /// Persist changes to an existing post.
    fn update_post(&mut self, post: &Post) -> SubscriptionResult<()>;
}

/// A consistent read-only view of the store.
pub trait Snapshot: MembershipLedger + PreferenceStore + RoleResolver + Directory {}

/// An exclusive read-write view of the store.
///
/// Reads through a transaction see its own uncommitted writes. Nothing is
/// visible to other views until [`Transaction::commit`] succeeds; dropping a
/// transaction without committing discards every write made through it.
pub trait Transaction:
    Snapshot + LedgerWriter + PreferenceWriter + DirectoryWriter
{
    /// Make every write of this transaction visible at once.
    fn commit(self: Box<Self>) -> SubscriptionResult<()>;
}

/// Backing store of the subscription engine.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a consistent read-only view.
    async fn snapshot<'a>(&'a self) -> SubscriptionResult<Box<dyn Snapshot + Send + 'a>>;

    /// Open an exclusive read-write view. Writes are rolled back unless the
    /// transaction is committed.
    async fn transaction<'a>(&'a self) -> SubscriptionResult<Box<dyn Transaction + Send + 'a>>;
}
