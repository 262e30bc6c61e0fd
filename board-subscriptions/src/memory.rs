//! In-memory storage implementation
//!
//! This is suitable for single-process embedders and testing. Snapshots share a
//! read lock; transactions hold the write lock for their whole lifetime and
//! stage their writes on a private copy of the state, which replaces the
//! shared state on commit.

use async_trait::async_trait;
use board_core::{
    ChannelSet, NotificationEvent, Post, PostId, SubscriptionRecord, SubscriptionStatus, Tenant,
    User, UserId, UserRole,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::{SubscriptionError, SubscriptionResult};
use crate::store::{
    Directory, DirectoryWriter, LedgerWriter, MembershipLedger, PreferenceStore, PreferenceWriter,
    RoleResolver, Snapshot, Storage, Transaction,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tenants: HashMap<Uuid, Tenant>,
    users: BTreeMap<UserId, User>,
    posts: HashMap<PostId, Post>,
    post_numbers: HashMap<(Uuid, i32), PostId>,
    post_counters: HashMap<Uuid, i32>,
    subscriptions: HashMap<PostId, BTreeMap<UserId, SubscriptionRecord>>,
    last_user_id: i64,
    last_post_id: i64,
}

impl MemoryState {
    fn tenant_users(&self, tenant_id: Uuid) -> impl Iterator<Item = &User> {
        self.users
            .values()
            .filter(move |user| user.tenant_id == tenant_id)
    }

    fn status_of(&self, post: PostId, user: UserId) -> Option<SubscriptionStatus> {
        self.subscriptions
            .get(&post)
            .and_then(|records| records.get(&user))
            .map(|record| record.status)
    }

    fn records_for(&self, post: PostId) -> Vec<(UserId, SubscriptionStatus)> {
        self.subscriptions
            .get(&post)
            .map(|records| {
                records
                    .iter()
                    .map(|(user_id, record)| (*user_id, record.status))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn preference_of(&self, user: UserId, event: NotificationEvent) -> Option<ChannelSet> {
        self.users
            .get(&user)
            .and_then(|user| user.settings.get(event))
    }

    fn users_with_preference(&self, tenant_id: Uuid, event: NotificationEvent) -> Vec<UserId> {
        self.tenant_users(tenant_id)
            .filter(|user| user.settings.is_configured(event))
            .map(|user| user.id)
            .collect()
    }

    fn is_admin(&self, user: UserId, tenant_id: Uuid) -> bool {
        self.users
            .get(&user)
            .map(|user| user.is_admin_of(tenant_id))
            .unwrap_or(false)
    }

    fn administrators(&self, tenant_id: Uuid) -> Vec<UserId> {
        self.tenant_users(tenant_id)
            .filter(|user| user.is_admin())
            .map(|user| user.id)
            .collect()
    }

    fn post_by_number(&self, tenant_id: Uuid, number: i32) -> Option<Post> {
        self.post_numbers
            .get(&(tenant_id, number))
            .and_then(|id| self.posts.get(id))
            .cloned()
    }
}

/// In-memory [`Storage`] backed by a single `tokio` read-write lock.
///
/// # Example
///
/// ```rust
/// use board_subscriptions::{MemoryStore, Storage};
///
/// # async fn example() -> board_subscriptions::SubscriptionResult<()> {
/// let store = MemoryStore::new();
/// let snapshot = store.snapshot().await?;
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    open: AtomicBool,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("open", &self.open.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            open: AtomicBool::new(true),
        }
    }

    /// Close the store. Every later snapshot or transaction fails with
    /// [`SubscriptionError::StorageUnavailable`]; views already handed out
    /// stay usable until dropped.
    pub fn close(&self) {
        self.open.store(false, Ordering::Relaxed);
        tracing::debug!("MemoryStore closed");
    }

    /// Check whether the store still accepts requests.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> SubscriptionResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SubscriptionError::StorageUnavailable(
                "memory store is closed".to_string(),
            ))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn snapshot<'a>(&'a self) -> SubscriptionResult<Box<dyn Snapshot + Send + 'a>> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(Box::new(MemorySnapshot { state }))
    }

    async fn transaction<'a>(&'a self) -> SubscriptionResult<Box<dyn Transaction + Send + 'a>> {
        self.ensure_open()?;
        let guard = self.state.write().await;
        let state = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, state }))
    }
}

/// Read view over [`MemoryStore`].
struct MemorySnapshot<'a> {
    state: RwLockReadGuard<'a, MemoryState>,
}

/// Write view over [`MemoryStore`].
///
/// `state` is the staged copy; `guard` keeps every other view out until the
/// transaction is committed or dropped.
struct MemoryTransaction<'a> {
    guard: RwLockWriteGuard<'a, MemoryState>,
    state: MemoryState,
}

/// Implements the read-side traits for a view whose `state` derefs to `MemoryState`.
macro_rules! impl_read_views {
    ($($view:ident),*) => {$(
        impl MembershipLedger for $view<'_> {
            fn status_of(
                &self,
                post: PostId,
                user: UserId,
            ) -> SubscriptionResult<Option<SubscriptionStatus>> {
                Ok(self.state.status_of(post, user))
            }

            fn records_for(
                &self,
                post: PostId,
            ) -> SubscriptionResult<Vec<(UserId, SubscriptionStatus)>> {
                Ok(self.state.records_for(post))
            }
        }

        impl PreferenceStore for $view<'_> {
            fn preference_of(
                &self,
                user: UserId,
                event: NotificationEvent,
            ) -> SubscriptionResult<Option<ChannelSet>> {
                Ok(self.state.preference_of(user, event))
            }

            fn users_with_preference(
                &self,
                tenant_id: Uuid,
                event: NotificationEvent,
            ) -> SubscriptionResult<Vec<UserId>> {
                Ok(self.state.users_with_preference(tenant_id, event))
            }
        }

        impl RoleResolver for $view<'_> {
            fn is_admin(&self, user: UserId, tenant_id: Uuid) -> SubscriptionResult<bool> {
                Ok(self.state.is_admin(user, tenant_id))
            }

            fn administrators(&self, tenant_id: Uuid) -> SubscriptionResult<Vec<UserId>> {
                Ok(self.state.administrators(tenant_id))
            }
        }

        impl Directory for $view<'_> {
            fn tenant(&self, id: Uuid) -> SubscriptionResult<Option<Tenant>> {
                Ok(self.state.tenants.get(&id).cloned())
            }

            fn user(&self, id: UserId) -> SubscriptionResult<Option<User>> {
                Ok(self.state.users.get(&id).cloned())
            }

            fn post(&self, id: PostId) -> SubscriptionResult<Option<Post>> {
                Ok(self.state.posts.get(&id).cloned())
            }

            fn post_by_number(
                &self,
                tenant_id: Uuid,
                number: i32,
            ) -> SubscriptionResult<Option<Post>> {
                Ok(self.state.post_by_number(tenant_id, number))
            }
        }

        impl Snapshot for $view<'_> {}
    )*};
}

impl_read_views!(MemorySnapshot, MemoryTransaction);

impl LedgerWriter for MemoryTransaction<'_> {
    fn upsert_status(
        &mut self,
        post: PostId,
        user: UserId,
        status: SubscriptionStatus,
    ) -> SubscriptionResult<()> {
        self.state
            .subscriptions
            .entry(post)
            .or_default()
            .entry(user)
            .and_modify(|record| record.set_status(status))
            .or_insert_with(|| SubscriptionRecord::new(post, user, status));
        Ok(())
    }
}

impl PreferenceWriter for MemoryTransaction<'_> {
    fn store_preference(
        &mut self,
        user: UserId,
        event: NotificationEvent,
        channels: ChannelSet,
    ) -> SubscriptionResult<()> {
        let user = self
            .state
            .users
            .get_mut(&user)
            .ok_or_else(|| SubscriptionError::not_found("User", user))?;
        user.settings.set(event, channels);
        Ok(())
    }
}

impl DirectoryWriter for MemoryTransaction<'_> {
    fn insert_tenant(&mut self, tenant: Tenant) -> SubscriptionResult<()> {
        self.state.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    fn insert_user(
        &mut self,
        tenant_id: Uuid,
        name: &str,
        email: Option<&str>,
        role: UserRole,
    ) -> SubscriptionResult<User> {
        if !self.state.tenants.contains_key(&tenant_id) {
            return Err(SubscriptionError::not_found("Tenant", tenant_id));
        }

        self.state.last_user_id += 1;
        let mut user = User::new(UserId(self.state.last_user_id), tenant_id, name, role);
        user.email = email.map(str::to_string);

        self.state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn insert_post(
        &mut self,
        tenant_id: Uuid,
        author: UserId,
        title: &str,
        description: &str,
    ) -> SubscriptionResult<Post> {
        match self.state.users.get(&author) {
            Some(user) if user.tenant_id == tenant_id => {}
            _ => return Err(SubscriptionError::not_found("User", author)),
        }

        self.state.last_post_id += 1;
        let counter = self.state.post_counters.entry(tenant_id).or_insert(0);
        *counter += 1;
        let number = *counter;

        let post = Post::new(
            PostId(self.state.last_post_id),
            tenant_id,
            number,
            author,
            title,
            description,
        );

        self.state.post_numbers.insert((tenant_id, number), post.id);
        self.state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    fn update_post(&mut self, post: &Post) -> SubscriptionResult<()> {
        match self.state.posts.get_mut(&post.id) {
            Some(stored) => {
                *stored = post.clone();
                Ok(())
            }
            None => Err(SubscriptionError::not_found("Post", post.id)),
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(self: Box<Self>) -> SubscriptionResult<()> {
        let MemoryTransaction { mut guard, state } = *self;
        *guard = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Uuid, User, User) {
        let store = MemoryStore::new();
        let tenant = Tenant::new("Demo", "demo");
        let tenant_id = tenant.id;

        let mut txn = store.transaction().await.unwrap();
        txn.insert_tenant(tenant).unwrap();
        let admin = txn
            .insert_user(tenant_id, "Jon Snow", Some("jon.snow@example.com"), UserRole::Administrator)
            .unwrap();
        let member = txn
            .insert_user(tenant_id, "Arya Stark", None, UserRole::Member)
            .unwrap();
        txn.commit().unwrap();

        (store, tenant_id, admin, member)
    }

    #[tokio::test]
    async fn test_user_ids_follow_registration_order() {
        let (_store, _tenant_id, admin, member) = seeded().await;
        assert_eq!(admin.id, UserId(1));
        assert_eq!(member.id, UserId(2));
        assert_eq!(admin.email.as_deref(), Some("jon.snow@example.com"));
    }

    #[tokio::test]
    async fn test_insert_user_requires_tenant() {
        let store = MemoryStore::new();
        let mut txn = store.transaction().await.unwrap();

        let result = txn.insert_user(Uuid::now_v7(), "Nobody", None, UserRole::Member);
        assert!(matches!(result, Err(SubscriptionError::NotFound { entity: "Tenant", .. })));
    }

    #[tokio::test]
    async fn test_post_numbers_are_per_tenant() {
        let (store, tenant_id, admin, _member) = seeded().await;

        let other = Tenant::new("Other", "other");
        let other_id = other.id;

        let mut txn = store.transaction().await.unwrap();
        txn.insert_tenant(other).unwrap();
        let other_admin = txn
            .insert_user(other_id, "Sansa Stark", None, UserRole::Administrator)
            .unwrap();

        let first = txn.insert_post(tenant_id, admin.id, "Post #1", "d").unwrap();
        let second = txn.insert_post(tenant_id, admin.id, "Post #2", "d").unwrap();
        let foreign = txn.insert_post(other_id, other_admin.id, "Post #1", "d").unwrap();
        txn.commit().unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(foreign.number, 1);

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.post_by_number(tenant_id, 2).unwrap().unwrap().id, second.id);
        assert_eq!(snapshot.post_by_number(other_id, 1).unwrap().unwrap().id, foreign.id);
        assert!(snapshot.post_by_number(other_id, 2).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_post_rejects_foreign_author() {
        let (store, _tenant_id, admin, _member) = seeded().await;

        let mut txn = store.transaction().await.unwrap();
        let result = txn.insert_post(Uuid::now_v7(), admin.id, "t", "d");
        assert!(matches!(result, Err(SubscriptionError::NotFound { entity: "User", .. })));
    }

    #[tokio::test]
    async fn test_ledger_upserts_single_record() {
        let (store, tenant_id, admin, member) = seeded().await;

        let mut txn = store.transaction().await.unwrap();
        let post = txn.insert_post(tenant_id, member.id, "t", "d").unwrap();
        txn.record_author(post.id, member.id).unwrap();
        txn.remove(post.id, member.id).unwrap();
        txn.remove(post.id, member.id).unwrap();
        txn.add(post.id, admin.id).unwrap();
        txn.commit().unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(
            snapshot.records_for(post.id).unwrap(),
            vec![
                (admin.id, SubscriptionStatus::Subscribed),
                (member.id, SubscriptionStatus::Unsubscribed),
            ]
        );
        assert_eq!(
            snapshot.status_of(post.id, member.id).unwrap(),
            Some(SubscriptionStatus::Unsubscribed)
        );
        assert_eq!(snapshot.status_of(PostId(999), member.id).unwrap(), None);
    }

    #[tokio::test]
    async fn test_roles_and_preferences() {
        let (store, tenant_id, admin, member) = seeded().await;

        let mut txn = store.transaction().await.unwrap();
        txn.store_preference(member.id, NotificationEvent::NewPost, ChannelSet::ALL)
            .unwrap();
        assert!(txn
            .store_preference(UserId(404), NotificationEvent::NewPost, ChannelSet::ALL)
            .is_err());
        txn.commit().unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.is_admin(admin.id, tenant_id).unwrap());
        assert!(!snapshot.is_admin(member.id, tenant_id).unwrap());
        assert!(!snapshot.is_admin(admin.id, Uuid::now_v7()).unwrap());
        assert_eq!(snapshot.administrators(tenant_id).unwrap(), vec![admin.id]);
        assert_eq!(snapshot.role_in(member.id, tenant_id).unwrap(), UserRole::Member);

        assert_eq!(
            snapshot.preference_of(member.id, NotificationEvent::NewPost).unwrap(),
            Some(ChannelSet::ALL)
        );
        assert_eq!(
            snapshot.preference_of(member.id, NotificationEvent::NewComment).unwrap(),
            None
        );
        assert_eq!(
            snapshot
                .users_with_preference(tenant_id, NotificationEvent::NewPost)
                .unwrap(),
            vec![member.id]
        );
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (store, tenant_id, admin, member) = seeded().await;

        let mut txn = store.transaction().await.unwrap();
        let post = txn.insert_post(tenant_id, member.id, "t", "d").unwrap();
        txn.record_author(post.id, member.id).unwrap();
        txn.store_preference(admin.id, NotificationEvent::NewPost, ChannelSet::NONE)
            .unwrap();

        // Visible inside the transaction only.
        assert_eq!(txn.post_by_number(tenant_id, 1).unwrap().unwrap().id, post.id);
        assert_eq!(
            txn.status_of(post.id, member.id).unwrap(),
            Some(SubscriptionStatus::Subscribed)
        );
        drop(txn);

        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.post(post.id).unwrap().is_none());
        assert!(snapshot.post_by_number(tenant_id, 1).unwrap().is_none());
        assert_eq!(snapshot.status_of(post.id, member.id).unwrap(), None);
        assert_eq!(
            snapshot.preference_of(admin.id, NotificationEvent::NewPost).unwrap(),
            None
        );
        drop(snapshot);

        // Rolled-back IDs and numbers are handed out again.
        let mut txn = store.transaction().await.unwrap();
        let again = txn.insert_post(tenant_id, member.id, "t", "d").unwrap();
        txn.commit().unwrap();
        assert_eq!(again.id, post.id);
        assert_eq!(again.number, 1);
    }

    #[tokio::test]
    async fn test_commit_publishes_all_writes() {
        let (store, tenant_id, admin, member) = seeded().await;

        let mut txn = store.transaction().await.unwrap();
        let post = txn.insert_post(tenant_id, admin.id, "t", "d").unwrap();
        txn.record_author(post.id, admin.id).unwrap();
        txn.add(post.id, member.id).unwrap();
        txn.commit().unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.post(post.id).unwrap().is_some());
        assert_eq!(
            snapshot.records_for(post.id).unwrap(),
            vec![
                (admin.id, SubscriptionStatus::Subscribed),
                (member.id, SubscriptionStatus::Subscribed),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let store = MemoryStore::new();
        store.close();

        assert!(!store.is_open());
        assert!(matches!(
            store.snapshot().await.err(),
            Some(SubscriptionError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.transaction().await.err(),
            Some(SubscriptionError::StorageUnavailable(_))
        ));
    }
}
