//! Commands and queries accepted by the service.
//!
//! These are plain data so hosts can deserialize them straight from a request
//! body or a message queue.

use board_core::{NotificationChannel, NotificationEvent, PostId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A state-changing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Explicitly subscribe `user` to `post`.
    AddSubscriber {
        /// Post to follow
        post: PostId,
        /// Subscribing user
        user: UserId,
    },

    /// Explicitly unsubscribe `user` from `post`.
    RemoveSubscriber {
        /// Post to stop following
        post: PostId,
        /// Unsubscribing user
        user: UserId,
    },

    /// Replace some of `user`'s notification preferences.
    UpdateSettings {
        /// User whose settings change
        user: UserId,
        /// Settings key to decimal channel bitmask
        settings: HashMap<String, String>,
    },
}

impl Command {
    /// Command name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddSubscriber { .. } => "add_subscriber",
            Command::RemoveSubscriber { .. } => "remove_subscriber",
            Command::UpdateSettings { .. } => "update_settings",
        }
    }

    /// User the command acts on.
    pub fn user(&self) -> UserId {
        match self {
            Command::AddSubscriber { user, .. }
            | Command::RemoveSubscriber { user, .. }
            | Command::UpdateSettings { user, .. } => *user,
        }
    }
}

/// Who should be notified of `event` on post `number` through `channel`?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GetActiveSubscribers {
    /// Per-tenant post number
    pub number: i32,
    /// Delivery channel
    pub channel: NotificationChannel,
    /// Event type
    pub event: NotificationEvent,
}

impl GetActiveSubscribers {
    /// Build a query.
    pub fn new(number: i32, event: NotificationEvent, channel: NotificationChannel) -> Self {
        Self {
            number,
            channel,
            event,
        }
    }
}

/// Does the requesting user follow `post`?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HasSubscribedTo {
    /// Post to check
    pub post: PostId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let json = r#"{"command":"remove_subscriber","post":7,"user":2}"#;
        let command: Command = serde_json::from_str(json).unwrap();

        assert_eq!(
            command,
            Command::RemoveSubscriber {
                post: PostId(7),
                user: UserId(2),
            }
        );
        assert_eq!(command.name(), "remove_subscriber");
        assert_eq!(command.user(), UserId(2));
    }

    #[test]
    fn test_update_settings_wire_format() {
        let json = r#"{
            "command": "update_settings",
            "user": 3,
            "settings": {"event_notification_new_post": "2"}
        }"#;
        let command: Command = serde_json::from_str(json).unwrap();

        match command {
            Command::UpdateSettings { user, settings } => {
                assert_eq!(user, UserId(3));
                assert_eq!(settings["event_notification_new_post"], "2");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_query_wire_format() {
        let query: GetActiveSubscribers =
            serde_json::from_str(r#"{"number":1,"channel":"email","event":"change_status"}"#)
                .unwrap();

        assert_eq!(
            query,
            GetActiveSubscribers::new(1, NotificationEvent::ChangeStatus, NotificationChannel::Email)
        );
    }
}
