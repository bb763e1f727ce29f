//! Push payload decoding and dispatch.
//!
//! A push body is JSON of the form `{ "data": { "type": ..., ... } }`. The
//! `type` tag selects one of four behaviors; missing bodies, bad JSON,
//! a missing `data` object or an unknown tag all decode to a no-op.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::host::Host;
use crate::notification::{NotificationData, NotificationOptions};

/// Behavior selected by the push `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
  Message,
  Clear,
  UpdateBadge,
  Session,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushData {
  #[serde(rename = "type", default = "unknown_kind")]
  pub kind: PushKind,
  #[serde(default, deserialize_with = "lenient_string")]
  pub team_id: Option<String>,
  #[serde(default, deserialize_with = "lenient_string")]
  pub channel_id: Option<String>,
  #[serde(default, deserialize_with = "lenient_string")]
  pub ack_id: Option<String>,
  /// Unread count; pushes send it as a string or a number
  pub badge: Option<Value>,
  #[serde(default, deserialize_with = "lenient_string")]
  pub override_icon_url: Option<String>,
}

fn unknown_kind() -> PushKind {
  PushKind::Unknown
}

/// Numbers become their decimal text; any other non-string is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(deserializer)? {
    Value::String(s) => Some(s),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct PushEnvelope {
  data: Option<PushData>,
}

/// Decode a push body. `None` means there is nothing to do.
pub fn decode(body: Option<&[u8]>) -> Option<PushData> {
  let body = body?;
  let envelope: PushEnvelope = match serde_json::from_slice(body) {
    Ok(envelope) => envelope,
    Err(e) => {
      debug!("Ignoring undecodable push payload: {}", e);
      return None;
    }
  };
  envelope.data
}

/// Parse a badge value the way `parseInt(value, 10)` reads it: optional
/// sign, then leading decimal digits, anything after ignored.
pub fn parse_badge(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n
      .as_i64()
      .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
    Value::String(s) => {
      let s = s.trim_start();
      let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
      };
      let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
      if digits.is_empty() {
        return None;
      }
      let magnitude: i64 = digits.parse().unwrap_or(i64::MAX);
      Some(if negative { -magnitude } else { magnitude })
    }
    _ => None,
  }
}

impl PushData {
  /// Deep link opened when the notification is clicked.
  pub fn redirect_to(&self) -> String {
    match non_empty(&self.channel_id) {
      Some(channel_id) => format!("/_redirect/{}", channel_id),
      None => "/".to_string(),
    }
  }

  fn icon(&self, config: &Config) -> String {
    non_empty(&self.override_icon_url)
      .map(str::to_string)
      .unwrap_or_else(|| config.notifications.default_icon.clone())
  }

  fn tag(&self) -> String {
    self.ack_id.clone().unwrap_or_default()
  }

  /// Notification options for a new-message push.
  pub fn message_options(&self, config: &Config) -> NotificationOptions {
    NotificationOptions {
      icon: self.icon(config),
      tag: self.tag(),
      body: config.notifications.message_body.clone(),
      data: NotificationData {
        redirect_to: self.redirect_to(),
        team_id: self.team_id.clone(),
        channel_id: self.channel_id.clone(),
      },
    }
  }

  /// Notification options for a session-expired push.
  pub fn session_options(&self, config: &Config) -> NotificationOptions {
    NotificationOptions {
      icon: self.icon(config),
      tag: self.tag(),
      body: config.notifications.session_body.clone(),
      data: NotificationData {
        redirect_to: config.notifications.login_path.clone(),
        team_id: None,
        channel_id: None,
      },
    }
  }
}

/// Routes decoded pushes to notifications and badge updates.
pub struct PushRouter<'a, H: Host> {
  config: &'a Config,
  host: &'a H,
}

impl<'a, H: Host> PushRouter<'a, H> {
  pub fn new(config: &'a Config, host: &'a H) -> Self {
    Self { config, host }
  }

  /// Handle one push body. Platform failures are logged, never returned.
  pub async fn route(&self, body: Option<&[u8]>) {
    let Some(data) = decode(body) else {
      debug!("Push without data, ignoring");
      return;
    };

    debug!(kind = ?data.kind, ack_id = ?data.ack_id, "push received");

    match data.kind {
      PushKind::Message => self.show_message(&data).await,
      PushKind::Clear => self.clear(&data).await,
      PushKind::UpdateBadge => self.update_badge(&data).await,
      PushKind::Session => self.show_session_expired(&data).await,
      PushKind::Unknown => debug!("Unknown push type, ignoring"),
    }
  }

  async fn show_message(&self, data: &PushData) {
    let options = data.message_options(self.config);
    self.update_badge(data).await;
    if let Err(e) = self
      .host
      .show_notification(&self.config.product_name, options)
      .await
    {
      warn!("Failed to show message notification: {}", e);
    }
  }

  async fn clear(&self, data: &PushData) {
    match self.host.get_notifications().await {
      Ok(shown) => {
        for notification in shown {
          if let Err(e) = self.host.close_notification(notification.id).await {
            warn!("Failed to close notification {}: {}", notification.id, e);
          }
        }
      }
      Err(e) => warn!("Failed to list notifications: {}", e),
    }
    self.update_badge(data).await;
  }

  /// Positive counts are shown on the badge; anything else clears it.
  async fn update_badge(&self, data: &PushData) {
    if !self.host.badge_supported() {
      debug!("App badge not supported, skipping");
      return;
    }

    let count = data
      .badge
      .as_ref()
      .and_then(parse_badge)
      .filter(|c| *c > 0);

    let result = match count {
      Some(count) => self.host.set_app_badge(count as u64).await,
      None => self.host.clear_app_badge().await,
    };
    if let Err(e) = result {
      warn!("Failed to update app badge: {}", e);
    }
  }

  async fn show_session_expired(&self, data: &PushData) {
    let options = data.session_options(self.config);
    if let Err(e) = self
      .host
      .show_notification(&self.config.product_name, options)
      .await
    {
      warn!("Failed to show session notification: {}", e);
    }
  }
}
