//! Messages exchanged between pages and the worker.

use serde::{Deserialize, Serialize};

/// Page → worker messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
  /// Fetch and store the given URLs in the worker cache
  #[serde(rename = "CACHE_URLS")]
  CacheUrls { payload: Vec<String> },
  #[serde(other)]
  Unknown,
}

impl PageMessage {
  /// Decode a message. Anything that is not a known message is `Unknown`.
  pub fn decode(value: &serde_json::Value) -> Self {
    serde_json::from_value(value.clone()).unwrap_or(PageMessage::Unknown)
  }
}

/// Worker → page messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
  #[serde(rename = "notification-clicked")]
  NotificationClicked { message: ClickedChannel },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickedChannel {
  pub channel: ChannelRef,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub team_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRef {
  pub id: String,
}

impl WorkerMessage {
  pub fn notification_clicked(channel_id: &str, team_id: Option<&str>) -> Self {
    WorkerMessage::NotificationClicked {
      message: ClickedChannel {
        channel: ChannelRef {
          id: channel_id.to_string(),
        },
        team_id: team_id.map(String::from),
      },
    }
  }
}
