//! Per-user notification settings
//!
//! This module provides the settings type holding a user's channel preferences.
//! The event set is closed and small, so preferences live in a fixed-size table
//! indexed by [`NotificationEvent::index`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::notification::{ChannelSet, NotificationEvent};
use crate::roles::UserRole;

/// Channel preferences of one user, per event type.
///
/// An unset entry means the user never configured that event type; the role
/// default from [`NotificationEvent::default_channels`] applies instead.
///
/// # Examples
///
/// ```
/// use board_core::{NotificationChannel, NotificationEvent, NotificationSettings, UserRole};
///
/// let mut settings = NotificationSettings::default();
/// assert_eq!(settings.get(NotificationEvent::NewComment), None);
///
/// settings.set(NotificationEvent::NewComment, NotificationChannel::Web.into());
/// let effective = settings.effective(NotificationEvent::NewComment, UserRole::Member);
/// assert!(!effective.contains(NotificationChannel::Email));
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationSettings {
    #[serde(default)]
    channels: [Option<ChannelSet>; NotificationEvent::COUNT],
}

impl NotificationSettings {
    /// Stored preference for `event`, if any.
    pub fn get(&self, event: NotificationEvent) -> Option<ChannelSet> {
        self.channels[event.index()]
    }

    /// Replace the stored preference for `event`.
    pub fn set(&mut self, event: NotificationEvent, channels: ChannelSet) {
        self.channels[event.index()] = Some(channels);
    }

    /// Forget the stored preference for `event`, falling back to role defaults.
    pub fn clear(&mut self, event: NotificationEvent) {
        self.channels[event.index()] = None;
    }

    /// Check whether `event` has a stored preference.
    pub fn is_configured(&self, event: NotificationEvent) -> bool {
        self.get(event).is_some()
    }

    /// Channels in effect for `event`: the stored preference verbatim, or the
    /// default for `role` when nothing is stored.
    pub fn effective(&self, event: NotificationEvent, role: UserRole) -> ChannelSet {
        self.get(event)
            .unwrap_or_else(|| event.default_channels(role))
    }

    /// Iterate over configured events and their stored channels.
    pub fn iter(&self) -> impl Iterator<Item = (NotificationEvent, ChannelSet)> + '_ {
        NotificationEvent::ALL
            .into_iter()
            .filter_map(move |event| self.get(event).map(|channels| (event, channels)))
    }

    /// Render configured entries in the settings-key form used by clients.
    ///
    /// # Returns
    ///
    /// A map of settings key to decimal bitmask, e.g.
    /// `{"event_notification_new_post": "3"}`
    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(event, channels)| (event.settings_key().to_string(), channels.to_string()))
            .collect()
    }
}
