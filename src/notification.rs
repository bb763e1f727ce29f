//! OS notification values shown by the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context attached to a notification, read back when it is clicked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
  pub redirect_to: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub team_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
  pub icon: String,
  /// Collapse key. A non-empty tag replaces a shown notification with the
  /// same tag; an empty tag never collapses.
  pub tag: String,
  pub body: String,
  pub data: NotificationData,
}

/// A notification currently shown by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedNotification {
  pub id: u64,
  pub title: String,
  pub options: NotificationOptions,
  pub shown_at: DateTime<Utc>,
}

impl DisplayedNotification {
  pub fn data(&self) -> &NotificationData {
    &self.options.data
  }

  /// Whether showing `options` must replace this notification.
  pub fn collapses_with(&self, options: &NotificationOptions) -> bool {
    !options.tag.is_empty() && self.options.tag == options.tag
  }
}
