//! Platform services the worker drives: notifications, the app badge and
//! page clients.
//!
//! The worker never talks to a browser directly; it calls these traits and
//! awaits them, so any embedding (a real browser binding, the command line
//! driver, tests) supplies the implementation.

mod memory;

pub use memory::{Effect, InMemoryHost};

use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::message::WorkerMessage;
use crate::notification::{DisplayedNotification, NotificationOptions};

/// An open page client of window type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
  pub id: String,
  pub url: String,
}

#[allow(async_fn_in_trait)]
pub trait Notifications {
  /// Show a notification, replacing any shown one with the same non-empty tag.
  async fn show_notification(&self, title: &str, options: NotificationOptions) -> Result<()>;

  async fn get_notifications(&self) -> Result<Vec<DisplayedNotification>>;

  async fn close_notification(&self, id: u64) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait AppBadge {
  /// Platforms without badge support silently skip badge updates.
  fn badge_supported(&self) -> bool {
    true
  }

  async fn set_app_badge(&self, count: u64) -> Result<()>;

  async fn clear_app_badge(&self) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait Clients {
  /// Open window clients, in focus order.
  async fn match_windows(&self) -> Result<Vec<WindowClient>>;

  async fn post_message(&self, client: &WindowClient, message: &WorkerMessage) -> Result<()>;

  async fn focus(&self, client: &WindowClient) -> Result<()>;

  /// Open a new window. `None` when the platform opened it but gave no handle.
  async fn open_window(&self, url: &str) -> Result<Option<WindowClient>>;

  /// Take control of every open page without a reload.
  async fn claim(&self) -> Result<()>;
}

/// Everything the worker needs from its platform.
pub trait Host: Notifications + AppBadge + Clients {}

impl<T: Notifications + AppBadge + Clients> Host for T {}
