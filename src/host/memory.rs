//! In-process platform that keeps notification, badge and client state in
//! memory and records every side effect.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use super::{AppBadge, Clients, Notifications, WindowClient};
use crate::message::WorkerMessage;
use crate::notification::{DisplayedNotification, NotificationOptions};

/// A platform side effect caused by the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
  NotificationShown {
    notification: DisplayedNotification,
    #[serde(skip_serializing_if = "Option::is_none")]
    replaced: Option<u64>,
  },
  NotificationClosed {
    id: u64,
  },
  BadgeSet {
    count: u64,
  },
  BadgeCleared,
  MessagePosted {
    client: String,
    message: WorkerMessage,
  },
  Focused {
    client: String,
  },
  WindowOpened {
    client: WindowClient,
  },
  ClientsClaimed,
}

#[derive(Default)]
struct State {
  next_notification_id: u64,
  next_client_id: u64,
  notifications: Vec<DisplayedNotification>,
  badge: Option<u64>,
  windows: Vec<WindowClient>,
  effects: Vec<Effect>,
}

pub struct InMemoryHost {
  state: Mutex<State>,
  badge_supported: bool,
}

impl Default for InMemoryHost {
  fn default() -> Self {
    Self::new()
  }
}

impl InMemoryHost {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(State::default()),
      badge_supported: true,
    }
  }

  /// Simulate a platform without app badge support.
  pub fn without_badge(mut self) -> Self {
    self.badge_supported = false;
    self
  }

  fn lock(&self) -> Result<MutexGuard<'_, State>> {
    self.state.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Register an already-open page.
  pub fn add_window(&self, url: &str) -> Result<WindowClient> {
    let mut state = self.lock()?;
    let client = new_client(&mut state, url);
    state.windows.push(client.clone());
    Ok(client)
  }

  pub fn displayed(&self) -> Vec<DisplayedNotification> {
    self
      .lock()
      .map(|s| s.notifications.clone())
      .unwrap_or_default()
  }

  pub fn find_notification(&self, tag: &str) -> Option<DisplayedNotification> {
    self
      .displayed()
      .into_iter()
      .find(|n| n.options.tag == tag)
  }

  pub fn badge(&self) -> Option<u64> {
    self.lock().ok().and_then(|s| s.badge)
  }

  pub fn effects(&self) -> Vec<Effect> {
    self.lock().map(|s| s.effects.clone()).unwrap_or_default()
  }

  /// Take the effects recorded since the last call.
  pub fn drain_effects(&self) -> Vec<Effect> {
    self
      .lock()
      .map(|mut s| std::mem::take(&mut s.effects))
      .unwrap_or_default()
  }
}

fn new_client(state: &mut State, url: &str) -> WindowClient {
  state.next_client_id += 1;
  WindowClient {
    id: format!("client-{}", state.next_client_id),
    url: url.to_string(),
  }
}

impl Notifications for InMemoryHost {
  async fn show_notification(&self, title: &str, options: NotificationOptions) -> Result<()> {
    let mut state = self.lock()?;

    let existing = state
      .notifications
      .iter()
      .position(|n| n.collapses_with(&options));
    let replaced = existing.map(|idx| state.notifications.remove(idx).id);

    state.next_notification_id += 1;
    let notification = DisplayedNotification {
      id: state.next_notification_id,
      title: title.to_string(),
      options,
      shown_at: Utc::now(),
    };

    info!(id = notification.id, tag = %notification.options.tag, "notification shown");
    state.notifications.push(notification.clone());
    state.effects.push(Effect::NotificationShown {
      notification,
      replaced,
    });
    Ok(())
  }

  async fn get_notifications(&self) -> Result<Vec<DisplayedNotification>> {
    Ok(self.lock()?.notifications.clone())
  }

  async fn close_notification(&self, id: u64) -> Result<()> {
    let mut state = self.lock()?;
    let before = state.notifications.len();
    state.notifications.retain(|n| n.id != id);
    if state.notifications.len() != before {
      state.effects.push(Effect::NotificationClosed { id });
    }
    Ok(())
  }
}

impl AppBadge for InMemoryHost {
  fn badge_supported(&self) -> bool {
    self.badge_supported
  }

  async fn set_app_badge(&self, count: u64) -> Result<()> {
    let mut state = self.lock()?;
    state.badge = Some(count);
    state.effects.push(Effect::BadgeSet { count });
    Ok(())
  }

  async fn clear_app_badge(&self) -> Result<()> {
    let mut state = self.lock()?;
    state.badge = None;
    state.effects.push(Effect::BadgeCleared);
    Ok(())
  }
}

impl Clients for InMemoryHost {
  async fn match_windows(&self) -> Result<Vec<WindowClient>> {
    Ok(self.lock()?.windows.clone())
  }

  async fn post_message(&self, client: &WindowClient, message: &WorkerMessage) -> Result<()> {
    let mut state = self.lock()?;
    if !state.windows.iter().any(|w| w.id == client.id) {
      return Err(eyre!("Client {} is gone", client.id));
    }
    state.effects.push(Effect::MessagePosted {
      client: client.id.clone(),
      message: message.clone(),
    });
    Ok(())
  }

  async fn focus(&self, client: &WindowClient) -> Result<()> {
    let mut state = self.lock()?;
    let idx = state
      .windows
      .iter()
      .position(|w| w.id == client.id)
      .ok_or_else(|| eyre!("Client {} is gone", client.id))?;

    // Focused window moves to the front, like the platform's focus order.
    let window = state.windows.remove(idx);
    state.windows.insert(0, window);
    state.effects.push(Effect::Focused {
      client: client.id.clone(),
    });
    Ok(())
  }

  async fn open_window(&self, url: &str) -> Result<Option<WindowClient>> {
    let mut state = self.lock()?;
    let client = new_client(&mut state, url);
    state.windows.push(client.clone());
    state.effects.push(Effect::WindowOpened {
      client: client.clone(),
    });
    Ok(Some(client))
  }

  async fn claim(&self) -> Result<()> {
    self.lock()?.effects.push(Effect::ClientsClaimed);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notification::NotificationData;

  fn options(tag: &str) -> NotificationOptions {
    NotificationOptions {
      icon: "/static/icon_144x144.png".to_string(),
      tag: tag.to_string(),
      body: "body".to_string(),
      data: NotificationData {
        redirect_to: "/".to_string(),
        ..Default::default()
      },
    }
  }

  #[tokio::test]
  async fn test_same_tag_replaces() {
    let host = InMemoryHost::new();
    host.show_notification("RemoTalk", options("a1")).await.unwrap();
    host.show_notification("RemoTalk", options("a1")).await.unwrap();
    host.show_notification("RemoTalk", options("a2")).await.unwrap();

    let shown = host.displayed();
    assert_eq!(shown.len(), 2);
    assert!(matches!(
      host.effects()[1],
      Effect::NotificationShown {
        replaced: Some(1),
        ..
      }
    ));
  }

  #[tokio::test]
  async fn test_empty_tag_never_collapses() {
    let host = InMemoryHost::new();
    host.show_notification("RemoTalk", options("")).await.unwrap();
    host.show_notification("RemoTalk", options("")).await.unwrap();
    assert_eq!(host.displayed().len(), 2);
  }

  #[tokio::test]
  async fn test_focus_moves_window_to_front() {
    let host = InMemoryHost::new();
    host.add_window("https://a.test/one").unwrap();
    let second = host.add_window("https://a.test/two").unwrap();

    host.focus(&second).await.unwrap();
    assert_eq!(host.match_windows().await.unwrap()[0], second);
  }
}
