//! Subscription service
//!
//! The in-process boundary hosts call into. Every command runs inside one
//! storage transaction, committed only if every step succeeded; every query,
//! including a whole batch, reads one snapshot. Committed writes are announced
//! on the change feed.

use board_core::{Post, PostId, PostStatus, RequestContext, Tenant, User, UserId, UserRole};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::changes::{ChangeEnvelope, ChangeFeed, ChangeListener, SubscriptionChange};
use crate::commands::{Command, GetActiveSubscribers, HasSubscribedTo};
use crate::config::{ConfigError, SubscriptionConfig};
use crate::engine;
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::preferences::SettingsUpdate;
use crate::store::{Directory, Snapshot, Storage, Transaction};

/// Subscription service over a [`Storage`] backend.
///
/// # Example
///
/// ```rust
/// use board_core::{
///     NotificationChannel, NotificationEvent, RequestContext, UserRole,
/// };
/// use board_subscriptions::{
///     GetActiveSubscribers, MemoryStore, SubscriptionConfig, SubscriptionService,
/// };
///
/// # async fn example() -> board_subscriptions::SubscriptionResult<()> {
/// let service = SubscriptionService::new(MemoryStore::new(), SubscriptionConfig::default())
///     .expect("default config is valid");
///
/// let tenant = service.register_tenant("Demo", "demo").await?;
/// let admin = service
///     .register_user(tenant.id, "Jon Snow", None, UserRole::Administrator)
///     .await?;
/// let member = service
///     .register_user(tenant.id, "Arya Stark", None, UserRole::Member)
///     .await?;
///
/// let ctx = RequestContext::new(tenant.id).with_user(member.id);
/// let post = service.create_post(&ctx, "Dark mode", "Please").await?;
///
/// let query = GetActiveSubscribers::new(
///     post.number,
///     NotificationEvent::NewComment,
///     NotificationChannel::Web,
/// );
/// let users = service.active_subscribers(&ctx, &query).await?;
/// assert_eq!(
///     users.iter().map(|u| u.id).collect::<Vec<_>>(),
///     vec![admin.id, member.id]
/// );
/// # Ok(())
/// # }
/// ```
pub struct SubscriptionService<S: Storage> {
    storage: S,
    config: SubscriptionConfig,
    changes: ChangeFeed,
}

impl<S: Storage> std::fmt::Debug for SubscriptionService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionService")
            .field("config", &self.config)
            .field("listeners", &self.changes.receiver_count())
            .finish()
    }
}

impl<S: Storage> SubscriptionService<S> {
    /// Create a service over `storage`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] if `config` fails
    /// [`SubscriptionConfig::validate`].
    pub fn new(storage: S, config: SubscriptionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let changes = ChangeFeed::new(config.change_channel_capacity);
        Ok(Self {
            storage,
            config,
            changes,
        })
    }

    /// Backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Active configuration.
    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    /// Listen for changes committed from now on.
    pub fn subscribe_changes(&self) -> ChangeListener {
        self.changes.subscribe()
    }

    // ------------------------------------------------------------------
    // Directory
    // ------------------------------------------------------------------

    /// Register a tenant.
    #[instrument(skip(self))]
    pub async fn register_tenant(&self, name: &str, subdomain: &str) -> SubscriptionResult<Tenant> {
        let tenant = Tenant::new(name, subdomain);

        let mut txn = self.storage.transaction().await?;
        txn.insert_tenant(tenant.clone())?;
        txn.commit()?;

        info!(tenant_id = %tenant.id, "Registered tenant");
        Ok(tenant)
    }

    /// Register a user of `tenant_id`.
    ///
    /// Notification settings start empty, so role defaults apply.
    #[instrument(skip(self, name, email))]
    pub async fn register_user(
        &self,
        tenant_id: Uuid,
        name: &str,
        email: Option<&str>,
        role: UserRole,
    ) -> SubscriptionResult<User> {
        let mut txn = self.storage.transaction().await?;
        let user = txn.insert_user(tenant_id, name, email, role)?;
        txn.commit()?;

        info!(user_id = %user.id, role = role.as_str(), "Registered user");
        Ok(user)
    }

    /// Create a post authored by the context user and subscribe the author.
    ///
    /// # Errors
    ///
    /// - [`SubscriptionError::Validation`] for an anonymous context
    /// - [`SubscriptionError::NotFound`] if the author is not a user of the
    ///   context tenant
    #[instrument(skip(self, ctx, title, description), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_post(
        &self,
        ctx: &RequestContext,
        title: &str,
        description: &str,
    ) -> SubscriptionResult<Post> {
        let author = ctx.user_id.ok_or_else(|| {
            SubscriptionError::Validation("creating a post requires a signed-in user".to_string())
        })?;

        let post = self
            .with_transaction(|txn| {
                let post = txn.insert_post(ctx.tenant_id, author, title, description)?;
                txn.record_author(post.id, author)?;
                Ok(post)
            })
            .await?;

        info!(post_id = %post.id, number = post.number, author_id = %author, "Created post");
        self.publish(
            ctx,
            SubscriptionChange::PostCreated {
                post_id: post.id,
                number: post.number,
                author_id: author,
            },
        );
        Ok(post)
    }

    /// Change a post's status and response text.
    ///
    /// Subscriptions are left untouched, including when the post is deleted.
    #[instrument(skip(self, ctx, response), fields(tenant_id = %ctx.tenant_id))]
    pub async fn set_post_status(
        &self,
        ctx: &RequestContext,
        post_id: PostId,
        status: PostStatus,
        response: &str,
    ) -> SubscriptionResult<Post> {
        let post = self
            .with_transaction(|txn| {
                let mut post = tenant_post(&*txn, ctx.tenant_id, post_id)?;
                post.respond(status, response);
                txn.update_post(&post)?;
                Ok(post)
            })
            .await?;

        info!(post_id = %post.id, status = status.as_str(), "Changed post status");
        self.publish(
            ctx,
            SubscriptionChange::PostStatusChanged {
                post_id: post.id,
                status,
            },
        );
        Ok(post)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Execute a command in one transaction.
    ///
    /// # Errors
    ///
    /// - [`SubscriptionError::NotFound`] if the post or user is not part of
    ///   the context tenant
    /// - [`SubscriptionError::Validation`] for a malformed settings update;
    ///   nothing is written
    /// - [`SubscriptionError::StorageUnavailable`] if the store fails
    #[instrument(skip(self, ctx, command), fields(tenant_id = %ctx.tenant_id, command = command.name()))]
    pub async fn execute(&self, ctx: &RequestContext, command: Command) -> SubscriptionResult<()> {
        let result = self.apply(ctx, command).await;
        match &result {
            Ok(()) => {}
            Err(e) if e.is_server_error() => error!(error = %e, "Command failed"),
            Err(e) => debug!(error = %e, "Command rejected"),
        }
        result
    }

    /// Subscribe `user` to `post`.
    pub async fn add_subscriber(
        &self,
        ctx: &RequestContext,
        post: PostId,
        user: UserId,
    ) -> SubscriptionResult<()> {
        self.execute(ctx, Command::AddSubscriber { post, user }).await
    }

    /// Unsubscribe `user` from `post`.
    pub async fn remove_subscriber(
        &self,
        ctx: &RequestContext,
        post: PostId,
        user: UserId,
    ) -> SubscriptionResult<()> {
        self.execute(ctx, Command::RemoveSubscriber { post, user }).await
    }

    /// Replace some of `user`'s notification preferences.
    pub async fn update_settings(
        &self,
        ctx: &RequestContext,
        user: UserId,
        settings: HashMap<String, String>,
    ) -> SubscriptionResult<()> {
        self.execute(ctx, Command::UpdateSettings { user, settings })
            .await
    }

    async fn apply(&self, ctx: &RequestContext, command: Command) -> SubscriptionResult<()> {
        let change = match command {
            Command::AddSubscriber { post, user } => {
                self.with_transaction(|txn| {
                    tenant_post(&*txn, ctx.tenant_id, post)?;
                    tenant_user(&*txn, ctx.tenant_id, user)?;
                    txn.add(post, user)
                })
                .await?;
                SubscriptionChange::SubscriberAdded {
                    post_id: post,
                    user_id: user,
                }
            }
            Command::RemoveSubscriber { post, user } => {
                self.with_transaction(|txn| {
                    tenant_post(&*txn, ctx.tenant_id, post)?;
                    tenant_user(&*txn, ctx.tenant_id, user)?;
                    txn.remove(post, user)
                })
                .await?;
                SubscriptionChange::SubscriberRemoved {
                    post_id: post,
                    user_id: user,
                }
            }
            Command::UpdateSettings { user, settings } => {
                let update = SettingsUpdate::parse(&settings)?;
                self.with_transaction(|txn| {
                    tenant_user(&*txn, ctx.tenant_id, user)?;
                    for (event, channels) in update.entries() {
                        txn.store_preference(user, *event, *channels)?;
                    }
                    Ok(())
                })
                .await?;
                SubscriptionChange::SettingsUpdated {
                    user_id: user,
                    events: update.events(),
                }
            }
        };

        self.publish(ctx, change);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Users to notify for `query`, ascending by ID.
    ///
    /// # Errors
    ///
    /// - [`SubscriptionError::NotFound`] if no post has that number in the
    ///   context tenant
    /// - [`SubscriptionError::StorageUnavailable`] if the store fails
    #[instrument(
        skip(self, ctx, query),
        fields(tenant_id = %ctx.tenant_id, number = query.number, event = %query.event, channel = %query.channel)
    )]
    pub async fn active_subscribers(
        &self,
        ctx: &RequestContext,
        query: &GetActiveSubscribers,
    ) -> SubscriptionResult<Vec<User>> {
        let snapshot = self.storage.snapshot().await?;
        resolve(&*snapshot, ctx.tenant_id, query)
    }

    /// Answer several queries against one snapshot.
    ///
    /// Results are returned in query order. A post that does not exist fails
    /// only its own query.
    ///
    /// # Errors
    ///
    /// - [`SubscriptionError::Validation`] if the batch exceeds
    ///   [`SubscriptionConfig::max_batch_size`]
    /// - [`SubscriptionError::StorageUnavailable`] if no snapshot can be opened
    #[instrument(skip(self, ctx, queries), fields(tenant_id = %ctx.tenant_id, queries = queries.len()))]
    pub async fn active_subscribers_batch(
        &self,
        ctx: &RequestContext,
        queries: &[GetActiveSubscribers],
    ) -> SubscriptionResult<Vec<SubscriptionResult<Vec<User>>>> {
        if queries.len() > self.config.max_batch_size {
            warn!(
                max_batch_size = self.config.max_batch_size,
                "Rejected oversized query batch"
            );
            return Err(SubscriptionError::Validation(format!(
                "batch of {} queries exceeds the limit of {}",
                queries.len(),
                self.config.max_batch_size
            )));
        }

        let snapshot = self.storage.snapshot().await?;
        Ok(queries
            .iter()
            .map(|query| resolve(&*snapshot, ctx.tenant_id, query))
            .collect())
    }

    /// Whether the context user follows the post. Anonymous users never do.
    #[instrument(skip(self, ctx, query), fields(tenant_id = %ctx.tenant_id, post_id = %query.post))]
    pub async fn has_subscribed_to(
        &self,
        ctx: &RequestContext,
        query: &HasSubscribedTo,
    ) -> SubscriptionResult<bool> {
        let snapshot = self.storage.snapshot().await?;
        let post = tenant_post(&*snapshot, ctx.tenant_id, query.post)?;

        let user = match ctx.user_id {
            Some(id) => Some(tenant_user(&*snapshot, ctx.tenant_id, id)?),
            None => None,
        };

        engine::has_subscribed_to(&*snapshot, &post, user.as_ref())
    }

    /// Run `work` in one transaction. Commits on `Ok`; on `Err` the
    /// transaction is dropped and nothing it wrote is kept.
    async fn with_transaction<T, F>(&self, work: F) -> SubscriptionResult<T>
    where
        F: FnOnce(&mut (dyn Transaction + Send + '_)) -> SubscriptionResult<T>,
    {
        let mut txn = self.storage.transaction().await?;
        let value = work(&mut *txn)?;
        txn.commit()?;
        Ok(value)
    }

    fn publish(&self, ctx: &RequestContext, change: SubscriptionChange) {
        self.changes.publish(
            ChangeEnvelope::new(ctx.tenant_id, change)
                .with_correlation_id(ctx.correlation_id.clone()),
        );
    }
}

fn resolve<V>(view: &V, tenant_id: Uuid, query: &GetActiveSubscribers) -> SubscriptionResult<Vec<User>>
where
    V: Snapshot + ?Sized,
{
    let post = view
        .post_by_number(tenant_id, query.number)?
        .ok_or_else(|| SubscriptionError::not_found("Post", format!("#{}", query.number)))?;

    engine::active_subscribers(view, &post, query.event, query.channel)
}

fn tenant_post<V>(view: &V, tenant_id: Uuid, id: PostId) -> SubscriptionResult<Post>
where
    V: Directory + ?Sized,
{
    view.post(id)?
        .filter(|post| post.tenant_id == tenant_id)
        .ok_or_else(|| SubscriptionError::not_found("Post", id))
}

fn tenant_user<V>(view: &V, tenant_id: Uuid, id: UserId) -> SubscriptionResult<User>
where
    V: Directory + ?Sized,
{
    view.user(id)?
        .filter(|user| user.tenant_id == tenant_id)
        .ok_or_else(|| SubscriptionError::not_found("User", id))
}
