//! Subscriber resolution
//!
//! Decides who gets notified of an event on a post through a given channel.
//! Resolution is a pure function of one storage [`Snapshot`]:
//!
//! ```text
//! candidates = Subscribed records of the post
//!            ∪ administrators of the post's tenant
//!            ∪ users with a stored preference for the event   (tenant-wide events only)
//! audience   = candidates − Unsubscribed records of the post
//!              filtered by effective channels ∋ channel
//!              ordered by user ID
//! ```
//!
//! Effective channels are the user's stored preference for the event, or the
//! role default when nothing is stored.

use board_core::{
    ChannelSet, NotificationChannel, NotificationEvent, Post, SubscriptionStatus, User, UserRole,
};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::error::SubscriptionResult;
use crate::store::Snapshot;

/// Users to notify of `event` on `post` through `channel`, ascending by ID.
///
/// The result never contains duplicates and is empty when nobody qualifies.
/// Any storage failure aborts the resolution; no partial result is returned.
pub fn active_subscribers<S>(
    snapshot: &S,
    post: &Post,
    event: NotificationEvent,
    channel: NotificationChannel,
) -> SubscriptionResult<Vec<User>>
where
    S: Snapshot + ?Sized,
{
    let mut candidates = BTreeSet::new();
    let mut suppressed = HashSet::new();

    for (user_id, status) in snapshot.records_for(post.id)? {
        match status {
            SubscriptionStatus::Subscribed => {
                candidates.insert(user_id);
            }
            SubscriptionStatus::Unsubscribed => {
                suppressed.insert(user_id);
            }
        }
    }

    candidates.extend(snapshot.administrators(post.tenant_id)?);

    // Tenant-wide events reach anyone who opted in, follower or not.
    if !event.requires_subscription(UserRole::Member) {
        candidates.extend(snapshot.users_with_preference(post.tenant_id, event)?);
    }

    let candidate_count = candidates.len();
    let mut subscribers = Vec::new();

    for user_id in candidates {
        if suppressed.contains(&user_id) {
            continue;
        }

        let Some(user) = snapshot.user(user_id)? else {
            continue;
        };
        if user.tenant_id != post.tenant_id {
            continue;
        }

        let role = snapshot.role_in(user_id, post.tenant_id)?;
        if effective_channels(snapshot, &user, role, event)?.contains(channel) {
            subscribers.push(user);
        }
    }

    debug!(
        post_id = %post.id,
        event = %event,
        channel = %channel,
        candidates = candidate_count,
        suppressed = suppressed.len(),
        subscribers = subscribers.len(),
        "Resolved active subscribers"
    );

    Ok(subscribers)
}

/// Channels in effect for `user` and `event`: the stored preference verbatim,
/// otherwise the default for `role`.
fn effective_channels<S>(
    snapshot: &S,
    user: &User,
    role: UserRole,
    event: NotificationEvent,
) -> SubscriptionResult<ChannelSet>
where
    S: Snapshot + ?Sized,
{
    Ok(snapshot
        .preference_of(user.id, event)?
        .unwrap_or_else(|| event.default_channels(role)))
}

/// Whether `user` follows `post`.
///
/// - no user (anonymous request): `false`
/// - explicit record: whether it is `Subscribed`
/// - no record: `true` only for roles that follow every post implicitly
pub fn has_subscribed_to<S>(snapshot: &S, post: &Post, user: Option<&User>) -> SubscriptionResult<bool>
where
    S: Snapshot + ?Sized,
{
    let Some(user) = user else {
        return Ok(false);
    };

    match snapshot.status_of(post.id, user.id)? {
        Some(status) => Ok(status.is_active()),
        None => {
            let role = snapshot.role_in(user.id, post.tenant_id)?;
            Ok(!NotificationEvent::ALL
                .iter()
                .any(|event| event.requires_subscription(role)))
        }
    }
}
