//! Notification events and delivery channels
//!
//! A notification is addressed by an event type (what happened to a post) and
//! a delivery channel (how the user hears about it). Users store, per event
//! type, a [`ChannelSet`] bitmask of the channels they want.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::roles::UserRole;

/// Delivery channel for a notification.
///
/// Each channel owns one bit of a [`ChannelSet`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// In-app notification
    Web = 1,

    /// Email notification
    Email = 2,
}

impl NotificationChannel {
    /// Every known channel, in bit order.
    pub const ALL: [NotificationChannel; 2] = [Self::Web, Self::Email];

    /// The bit this channel occupies in a [`ChannelSet`].
    pub fn bit(self) -> u8 {
        self as u8
    }

    /// Get string representation of the channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Email => "email",
        }
    }

    /// Parse channel from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "web" => Some(Self::Web),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask of enabled delivery channels.
///
/// Only bits of known [`NotificationChannel`]s can be set.
///
/// # Examples
///
/// ```
/// use board_core::{ChannelSet, NotificationChannel};
///
/// let set = NotificationChannel::Web | NotificationChannel::Email;
/// assert!(set.contains(NotificationChannel::Email));
/// assert_eq!(set.to_string(), "3");
/// assert_eq!(ChannelSet::parse("1"), Some(ChannelSet::from(NotificationChannel::Web)));
/// assert_eq!(ChannelSet::parse("8"), None);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChannelSet(u8);

impl ChannelSet {
    /// No channel enabled.
    pub const NONE: ChannelSet = ChannelSet(0);

    /// Every known channel enabled.
    pub const ALL: ChannelSet = ChannelSet(1 | 2);

    /// Build a set from raw bits, rejecting bits of unknown channels.
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 != 0 {
            return None;
        }
        Some(Self(bits))
    }

    /// Raw bits of this set.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Parse the decimal form used in user settings (e.g. `"3"`).
    ///
    /// Surrounding whitespace is ignored. Negative, non-numeric and
    /// out-of-range values as well as unknown bits yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<u8>().ok().and_then(Self::from_bits)
    }

    /// Check whether `channel` is enabled.
    pub fn contains(self, channel: NotificationChannel) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Enable `channel`.
    pub fn insert(&mut self, channel: NotificationChannel) {
        self.0 |= channel.bit();
    }

    /// Disable `channel`.
    pub fn remove(&mut self, channel: NotificationChannel) {
        self.0 &= !channel.bit();
    }

    /// Check whether no channel is enabled.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the enabled channels.
    pub fn channels(self) -> impl Iterator<Item = NotificationChannel> {
        NotificationChannel::ALL
            .into_iter()
            .filter(move |channel| self.contains(*channel))
    }
}

impl From<NotificationChannel> for ChannelSet {
    fn from(channel: NotificationChannel) -> Self {
        Self(channel.bit())
    }
}

impl BitOr for NotificationChannel {
    type Output = ChannelSet;

    fn bitor(self, rhs: Self) -> ChannelSet {
        ChannelSet(self.bit() | rhs.bit())
    }
}

impl BitOr for ChannelSet {
    type Output = ChannelSet;

    fn bitor(self, rhs: Self) -> ChannelSet {
        ChannelSet(self.0 | rhs.0)
    }
}

impl BitOr<NotificationChannel> for ChannelSet {
    type Output = ChannelSet;

    fn bitor(self, rhs: NotificationChannel) -> ChannelSet {
        ChannelSet(self.0 | rhs.bit())
    }
}

impl BitOrAssign<NotificationChannel> for ChannelSet {
    fn bitor_assign(&mut self, rhs: NotificationChannel) {
        self.insert(rhs);
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of post activity that can trigger a notification.
///
/// # Subscription Model
///
/// - **NewPost**: tenant-wide; nobody needs to follow a post to hear about it.
///   Administrators get it by default, members only once they opt in.
/// - **NewComment** / **ChangeStatus**: per post; members must follow the
///   post, administrators follow every post implicitly.
///
/// # Examples
///
/// ```
/// use board_core::{NotificationEvent, UserRole};
///
/// let event = NotificationEvent::from_settings_key("event_notification_new_comment");
/// assert_eq!(event, Some(NotificationEvent::NewComment));
/// assert!(NotificationEvent::NewComment.requires_subscription(UserRole::Member));
/// assert!(!NotificationEvent::NewPost.requires_subscription(UserRole::Member));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A post was submitted
    NewPost,

    /// A comment was added to a post
    NewComment,

    /// A post's status changed
    ChangeStatus,
}

impl NotificationEvent {
    /// Number of event types.
    pub const COUNT: usize = 3;

    /// Every event type, ordered by [`NotificationEvent::index`].
    pub const ALL: [NotificationEvent; Self::COUNT] =
        [Self::NewPost, Self::NewComment, Self::ChangeStatus];

    /// Position of this event in fixed-size per-event tables.
    pub fn index(self) -> usize {
        match self {
            Self::NewPost => 0,
            Self::NewComment => 1,
            Self::ChangeStatus => 2,
        }
    }

    /// Key addressing this event in a user's settings.
    pub fn settings_key(&self) -> &'static str {
        match self {
            Self::NewPost => "event_notification_new_post",
            Self::NewComment => "event_notification_new_comment",
            Self::ChangeStatus => "event_notification_change_status",
        }
    }

    /// Resolve a settings key back to its event type.
    pub fn from_settings_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.settings_key() == key)
    }

    /// Get string representation of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewPost => "new_post",
            Self::NewComment => "new_comment",
            Self::ChangeStatus => "change_status",
        }
    }

    /// Channels enabled for a user of `role` who never configured this event.
    pub fn default_channels(&self, role: UserRole) -> ChannelSet {
        match (self, role.is_admin()) {
            (Self::NewPost, false) => ChannelSet::NONE,
            _ => ChannelSet::ALL,
        }
    }

    /// Whether a user of `role` must follow a post to be notified about it.
    pub fn requires_subscription(&self, role: UserRole) -> bool {
        match self {
            Self::NewPost => false,
            Self::NewComment | Self::ChangeStatus => !role.is_admin(),
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
