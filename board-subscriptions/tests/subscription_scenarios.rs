//! End-to-end subscription scenarios through the public service API.

use std::collections::HashMap;

use board_core::NotificationChannel::{self, Email, Web};
use board_core::NotificationEvent::{self, ChangeStatus, NewComment, NewPost};
use board_core::{Post, PostStatus, RequestContext, Tenant, User, UserId, UserRole};
use board_subscriptions::{
    GetActiveSubscribers, HasSubscribedTo, MemoryStore, SubscriptionChange, SubscriptionConfig,
    SubscriptionError, SubscriptionService,
};

struct Demo {
    service: SubscriptionService<MemoryStore>,
    tenant: Tenant,
    jon: User,
    arya: User,
    sansa: User,
}

/// Demo board: Jon Snow administers it, Arya and Sansa Stark are members.
async fn demo() -> Demo {
    let service = SubscriptionService::new(MemoryStore::new(), SubscriptionConfig::default())
        .expect("default config is valid");
    let tenant = service.register_tenant("Demonstration", "demo").await.unwrap();

    let jon = service
        .register_user(
            tenant.id,
            "Jon Snow",
            Some("jon.snow@got.com"),
            UserRole::Administrator,
        )
        .await
        .unwrap();
    let arya = service
        .register_user(tenant.id, "Arya Stark", Some("arya.stark@got.com"), UserRole::Member)
        .await
        .unwrap();
    let sansa = service
        .register_user(tenant.id, "Sansa Stark", None, UserRole::Member)
        .await
        .unwrap();

    Demo {
        service,
        tenant,
        jon,
        arya,
        sansa,
    }
}

impl Demo {
    fn ctx(&self, user: &User) -> RequestContext {
        RequestContext::new(self.tenant.id).with_user(user.id)
    }

    async fn post_as(&self, author: &User, title: &str) -> Post {
        self.service
            .create_post(&self.ctx(author), title, "Description")
            .await
            .unwrap()
    }

    async fn subscribers(
        &self,
        post: &Post,
        event: NotificationEvent,
        channel: NotificationChannel,
    ) -> Vec<UserId> {
        let query = GetActiveSubscribers::new(post.number, event, channel);
        self.service
            .active_subscribers(&self.ctx(&self.jon), &query)
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.id)
            .collect()
    }

    async fn follows(&self, post: &Post, user: Option<&User>) -> bool {
        let ctx = match user {
            Some(user) => self.ctx(user),
            None => RequestContext::new(self.tenant.id),
        };
        self.service
            .has_subscribed_to(&ctx, &HasSubscribedTo { post: post.id })
            .await
            .unwrap()
    }

    async fn update_settings(&self, user: &User, pairs: &[(&str, &str)]) {
        let settings: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.service
            .update_settings(&self.ctx(user), user.id, settings)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_no_settings() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "My new post").await;

    assert_eq!(demo.subscribers(&post, NewPost, Web).await, vec![demo.jon.id]);
    assert_eq!(
        demo.subscribers(&post, NewComment, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );
    assert_eq!(
        demo.subscribers(&post, ChangeStatus, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );

    assert!(!demo.follows(&post, None).await);
    assert!(demo.follows(&post, Some(&demo.jon)).await);
    assert!(demo.follows(&post, Some(&demo.arya)).await);
    assert!(!demo.follows(&post, Some(&demo.sansa)).await);
}

#[tokio::test]
async fn test_remove_author() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "Post #1").await;

    demo.service
        .remove_subscriber(&demo.ctx(&demo.arya), post.id, demo.arya.id)
        .await
        .unwrap();

    for event in NotificationEvent::ALL {
        assert_eq!(demo.subscribers(&post, event, Web).await, vec![demo.jon.id]);
    }

    assert!(demo.follows(&post, Some(&demo.jon)).await);
    assert!(!demo.follows(&post, Some(&demo.arya)).await);
    assert!(!demo.follows(&post, Some(&demo.sansa)).await);
}

#[tokio::test]
async fn test_admin_submitted() {
    let demo = demo().await;
    let post = demo.post_as(&demo.jon, "Post #1").await;

    for event in NotificationEvent::ALL {
        assert_eq!(demo.subscribers(&post, event, Web).await, vec![demo.jon.id]);
    }

    assert!(demo.follows(&post, Some(&demo.jon)).await);
    assert!(!demo.follows(&post, Some(&demo.arya)).await);
    assert!(!demo.follows(&post, Some(&demo.sansa)).await);
}

#[tokio::test]
async fn test_admin_unsubscribed() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "Post #1").await;
    let ctx = demo.ctx(&demo.arya);

    demo.service
        .remove_subscriber(&ctx, post.id, demo.arya.id)
        .await
        .unwrap();
    demo.service
        .remove_subscriber(&ctx, post.id, demo.jon.id)
        .await
        .unwrap();

    assert!(demo.subscribers(&post, NewComment, Web).await.is_empty());
    assert!(!demo.follows(&post, Some(&demo.jon)).await);
    assert!(!demo.follows(&post, Some(&demo.arya)).await);
    assert!(!demo.follows(&post, Some(&demo.sansa)).await);
}

#[tokio::test]
async fn test_disabled_email() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "Post #1").await;

    demo.update_settings(&demo.arya, &[("event_notification_new_comment", "1")])
        .await;

    assert_eq!(
        demo.subscribers(&post, NewComment, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );
    assert_eq!(demo.subscribers(&post, NewComment, Email).await, vec![demo.jon.id]);
    assert_eq!(
        demo.subscribers(&post, ChangeStatus, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );

    assert!(demo.follows(&post, Some(&demo.jon)).await);
    assert!(demo.follows(&post, Some(&demo.arya)).await);
    assert!(!demo.follows(&post, Some(&demo.sansa)).await);
}

#[tokio::test]
async fn test_member_enabled_new_post() {
    let demo = demo().await;
    let post = demo.post_as(&demo.jon, "Post #1").await;

    demo.update_settings(&demo.arya, &[("event_notification_new_post", "3")])
        .await;

    assert_eq!(
        demo.subscribers(&post, NewPost, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );
    assert_eq!(
        demo.subscribers(&post, NewPost, Email).await,
        vec![demo.jon.id, demo.arya.id]
    );
}

#[tokio::test]
async fn test_disabled_everything() {
    let demo = demo().await;
    let post = demo.post_as(&demo.jon, "Post #1").await;

    let disable_all = [
        ("event_notification_new_post", "0"),
        ("event_notification_new_comment", "0"),
        ("event_notification_change_status", "0"),
    ];
    demo.update_settings(&demo.jon, &disable_all).await;
    demo.update_settings(&demo.arya, &disable_all).await;

    for event in NotificationEvent::ALL {
        for channel in NotificationChannel::ALL {
            assert!(
                demo.subscribers(&post, event, channel).await.is_empty(),
                "{event} via {channel} should reach nobody"
            );
        }
    }
}

#[tokio::test]
async fn test_deleted_post() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "Post #1").await;

    let deleted = demo
        .service
        .set_post_status(&demo.ctx(&demo.arya), post.id, PostStatus::Deleted, "Invalid Post!")
        .await
        .unwrap();
    assert_eq!(deleted.status, PostStatus::Deleted);
    assert_eq!(deleted.response.as_deref(), Some("Invalid Post!"));

    assert_eq!(
        demo.subscribers(&post, NewComment, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );
}

#[tokio::test]
async fn test_subscribed_to_different_post() {
    let demo = demo().await;
    let first = demo.post_as(&demo.jon, "Post #1").await;
    let second = demo.post_as(&demo.jon, "Post #2").await;

    demo.service
        .add_subscriber(&demo.ctx(&demo.jon), second.id, demo.arya.id)
        .await
        .unwrap();

    assert_eq!(demo.subscribers(&first, NewComment, Web).await, vec![demo.jon.id]);
    assert_eq!(
        demo.subscribers(&second, NewComment, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );
}

#[tokio::test]
async fn test_add_and_remove_are_idempotent() {
    let demo = demo().await;
    let post = demo.post_as(&demo.jon, "Post #1").await;
    let ctx = demo.ctx(&demo.sansa);

    for _ in 0..2 {
        demo.service
            .add_subscriber(&ctx, post.id, demo.sansa.id)
            .await
            .unwrap();
    }
    assert_eq!(
        demo.subscribers(&post, ChangeStatus, Web).await,
        vec![demo.jon.id, demo.sansa.id]
    );

    for _ in 0..2 {
        demo.service
            .remove_subscriber(&ctx, post.id, demo.sansa.id)
            .await
            .unwrap();
    }
    assert_eq!(demo.subscribers(&post, ChangeStatus, Web).await, vec![demo.jon.id]);

    // Removal is sticky until an explicit add.
    demo.update_settings(&demo.sansa, &[("event_notification_change_status", "3")])
        .await;
    assert_eq!(demo.subscribers(&post, ChangeStatus, Web).await, vec![demo.jon.id]);

    demo.service
        .add_subscriber(&ctx, post.id, demo.sansa.id)
        .await
        .unwrap();
    assert!(demo.follows(&post, Some(&demo.sansa)).await);
}

#[tokio::test]
async fn test_status_change_keeps_subscriptions() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "Post #1").await;
    let before = demo.subscribers(&post, ChangeStatus, Email).await;

    for status in [PostStatus::Started, PostStatus::Completed, PostStatus::Declined] {
        demo.service
            .set_post_status(&demo.ctx(&demo.jon), post.id, status, "")
            .await
            .unwrap();
        assert_eq!(demo.subscribers(&post, ChangeStatus, Email).await, before);
    }
}

#[tokio::test]
async fn test_invalid_settings_are_rejected() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "Post #1").await;
    let ctx = demo.ctx(&demo.arya);

    for (key, value) in [
        ("event_notification_new_vote", "1"),
        ("event_notification_new_comment", "web"),
        ("event_notification_new_comment", "8"),
    ] {
        let settings = HashMap::from([(key.to_string(), value.to_string())]);
        let err = demo
            .service
            .update_settings(&ctx, demo.arya.id, settings)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR", "{key}={value}");
    }

    // Defaults are still in effect.
    assert_eq!(
        demo.subscribers(&post, NewComment, Email).await,
        vec![demo.jon.id, demo.arya.id]
    );
}

#[tokio::test]
async fn test_batch_answers_each_query() {
    let demo = demo().await;
    let first = demo.post_as(&demo.arya, "Post #1").await;
    let second = demo.post_as(&demo.sansa, "Post #2").await;

    let queries = [
        GetActiveSubscribers::new(first.number, NewComment, Web),
        GetActiveSubscribers::new(second.number, NewComment, Email),
        GetActiveSubscribers::new(second.number, NewPost, Web),
    ];
    let results = demo
        .service
        .active_subscribers_batch(&demo.ctx(&demo.jon), &queries)
        .await
        .unwrap();

    let ids: Vec<Vec<UserId>> = results
        .into_iter()
        .map(|result| result.unwrap().into_iter().map(|user| user.id).collect())
        .collect();
    assert_eq!(
        ids,
        vec![
            vec![demo.jon.id, demo.arya.id],
            vec![demo.jon.id, demo.sansa.id],
            vec![demo.jon.id],
        ]
    );
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let demo = demo().await;
    let post = demo.post_as(&demo.arya, "Post #1").await;

    let other = demo.service.register_tenant("Other", "other").await.unwrap();
    let cersei = demo
        .service
        .register_user(other.id, "Cersei Lannister", None, UserRole::Administrator)
        .await
        .unwrap();
    let other_ctx = RequestContext::new(other.id).with_user(cersei.id);

    // Same number, different board.
    let query = GetActiveSubscribers::new(post.number, NewComment, Web);
    let err = demo
        .service
        .active_subscribers(&other_ctx, &query)
        .await
        .unwrap_err();
    assert!(matches!(err, SubscriptionError::NotFound { entity: "Post", .. }));

    assert_eq!(
        demo.subscribers(&post, NewComment, Web).await,
        vec![demo.jon.id, demo.arya.id]
    );
}

#[tokio::test]
async fn test_change_feed_reports_commands() {
    let demo = demo().await;
    let mut changes = demo.service.subscribe_changes();

    let post = demo.post_as(&demo.arya, "Post #1").await;
    demo.service
        .add_subscriber(&demo.ctx(&demo.sansa), post.id, demo.sansa.id)
        .await
        .unwrap();
    demo.update_settings(&demo.sansa, &[("event_notification_new_comment", "2")])
        .await;

    let mut received = Vec::new();
    while let Some(envelope) = changes.try_recv() {
        received.push(envelope.change);
    }

    assert_eq!(
        received,
        vec![
            SubscriptionChange::PostCreated {
                post_id: post.id,
                number: post.number,
                author_id: demo.arya.id,
            },
            SubscriptionChange::SubscriberAdded {
                post_id: post.id,
                user_id: demo.sansa.id,
            },
            SubscriptionChange::SettingsUpdated {
                user_id: demo.sansa.id,
                events: vec![NewComment],
            },
        ]
    );
}
