//! Validation of user settings updates.
//!
//! Clients send settings as a map of settings key to decimal bitmask, e.g.
//! `{"event_notification_new_comment": "1"}`. An update is validated as a
//! whole before anything is written, so a rejected update changes nothing.

use board_core::{ChannelSet, NotificationEvent};
use std::collections::HashMap;

use crate::error::{SubscriptionError, SubscriptionResult};

/// A validated, partial settings update.
///
/// Event types absent from the update keep their stored preference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    entries: Vec<(NotificationEvent, ChannelSet)>,
}

impl SettingsUpdate {
    /// Validate a raw settings map.
    ///
    /// # Errors
    ///
    /// [`SubscriptionError::Validation`] if a key is not a notification
    /// settings key, or a value is not a bitmask of known channels. Keys are
    /// checked in sorted order, so the reported entry is deterministic.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use board_core::{ChannelSet, NotificationEvent};
    /// use board_subscriptions::SettingsUpdate;
    ///
    /// let raw = HashMap::from([("event_notification_new_post".to_string(), "3".to_string())]);
    /// let update = SettingsUpdate::parse(&raw).unwrap();
    /// assert_eq!(update.entries(), &[(NotificationEvent::NewPost, ChannelSet::ALL)]);
    ///
    /// let bad = HashMap::from([("theme".to_string(), "dark".to_string())]);
    /// assert!(SettingsUpdate::parse(&bad).is_err());
    /// ```
    pub fn parse(raw: &HashMap<String, String>) -> SubscriptionResult<Self> {
        let mut keys: Vec<&String> = raw.keys().collect();
        keys.sort();

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let event = NotificationEvent::from_settings_key(key).ok_or_else(|| {
                SubscriptionError::Validation(format!("unknown settings key '{key}'"))
            })?;

            let value = &raw[key];
            let channels = ChannelSet::parse(value).ok_or_else(|| {
                SubscriptionError::Validation(format!(
                    "invalid channel bitmask '{value}' for '{key}'"
                ))
            })?;

            entries.push((event, channels));
        }

        entries.sort_by_key(|(event, _)| event.index());
        Ok(Self { entries })
    }

    /// Validated entries, ordered by event type.
    pub fn entries(&self) -> &[(NotificationEvent, ChannelSet)] {
        &self.entries
    }

    /// Event types touched by this update.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.entries.iter().map(|(event, _)| *event).collect()
    }

    /// Check whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
