//! Notification click routing.

use tracing::{debug, warn};

use crate::host::Host;
use crate::message::WorkerMessage;
use crate::notification::DisplayedNotification;

/// Close the clicked notification, then bring the user to the app.
///
/// An open window is preferred: it is told which channel to show (when the
/// notification has one) and focused. Only when no window is open is a new
/// one opened at the notification's redirect target. At most one window is
/// focused or opened.
pub async fn route_click<H: Host>(host: &H, notification: &DisplayedNotification) {
  if let Err(e) = host.close_notification(notification.id).await {
    warn!("Failed to close notification {}: {}", notification.id, e);
  }

  let data = notification.data();
  let windows = match host.match_windows().await {
    Ok(windows) => windows,
    Err(e) => {
      warn!("Failed to list window clients: {}", e);
      Vec::new()
    }
  };

  if let Some(client) = windows.first() {
    if let Some(channel_id) = data.channel_id.as_deref().filter(|id| !id.is_empty()) {
      let message = WorkerMessage::notification_clicked(channel_id, data.team_id.as_deref());
      if let Err(e) = host.post_message(client, &message).await {
        warn!("Failed to notify client {}: {}", client.id, e);
      }
    }
    if let Err(e) = host.focus(client).await {
      warn!("Failed to focus client {}: {}", client.id, e);
    }
    return;
  }

  let target = if data.redirect_to.is_empty() {
    "/"
  } else {
    data.redirect_to.as_str()
  };
  debug!(url = target, "no open window, opening one");

  match host.open_window(target).await {
    Ok(Some(client)) => {
      if let Err(e) = host.focus(&client).await {
        warn!("Failed to focus new window {}: {}", client.id, e);
      }
    }
    Ok(None) => {}
    Err(e) => warn!("Failed to open window at {}: {}", target, e),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::{Effect, InMemoryHost, Notifications};
  use crate::notification::{NotificationData, NotificationOptions};

  async fn shown(host: &InMemoryHost, data: NotificationData) -> DisplayedNotification {
    let options = NotificationOptions {
      icon: "/static/icon_144x144.png".to_string(),
      tag: "a1".to_string(),
      body: "body".to_string(),
      data,
    };
    host.show_notification("RemoTalk", options).await.unwrap();
    host.drain_effects();
    host.find_notification("a1").unwrap()
  }

  fn channel_data() -> NotificationData {
    NotificationData {
      redirect_to: "/_redirect/c1".to_string(),
      team_id: Some("t1".to_string()),
      channel_id: Some("c1".to_string()),
    }
  }

  #[tokio::test]
  async fn test_open_client_gets_message_then_focus() {
    let host = InMemoryHost::new();
    let first = host.add_window("https://chat.example.com/team/town-square").unwrap();
    host.add_window("https://chat.example.com/other").unwrap();
    let notification = shown(&host, channel_data()).await;

    route_click(&host, &notification).await;

    assert_eq!(
      host.effects(),
      vec![
        Effect::NotificationClosed {
          id: notification.id
        },
        Effect::MessagePosted {
          client: first.id.clone(),
          message: WorkerMessage::notification_clicked("c1", Some("t1")),
        },
        Effect::Focused { client: first.id },
      ]
    );
    assert!(host.displayed().is_empty());
  }

  #[tokio::test]
  async fn test_open_client_without_channel_is_only_focused() {
    let host = InMemoryHost::new();
    let client = host.add_window("https://chat.example.com/").unwrap();
    let notification = shown(
      &host,
      NotificationData {
        redirect_to: "/login".to_string(),
        ..Default::default()
      },
    )
    .await;

    route_click(&host, &notification).await;

    let effects = host.effects();
    assert!(!effects
      .iter()
      .any(|e| matches!(e, Effect::MessagePosted { .. })));
    assert_eq!(effects.last(), Some(&Effect::Focused { client: client.id }));
  }

  #[tokio::test]
  async fn test_empty_channel_id_posts_no_message() {
    let host = InMemoryHost::new();
    let client = host.add_window("https://chat.example.com/").unwrap();
    let notification = shown(
      &host,
      NotificationData {
        redirect_to: "/".to_string(),
        team_id: Some("t1".to_string()),
        channel_id: Some(String::new()),
      },
    )
    .await;

    route_click(&host, &notification).await;

    let effects = host.effects();
    assert!(!effects
      .iter()
      .any(|e| matches!(e, Effect::MessagePosted { .. })));
    assert_eq!(effects.last(), Some(&Effect::Focused { client: client.id }));
  }

  #[tokio::test]
  async fn test_no_client_opens_one_window_at_redirect() {
    let host = InMemoryHost::new();
    let notification = shown(&host, channel_data()).await;

    route_click(&host, &notification).await;

    let opened: Vec<_> = host
      .effects()
      .into_iter()
      .filter_map(|e| match e {
        Effect::WindowOpened { client } => Some(client),
        _ => None,
      })
      .collect();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].url, "/_redirect/c1");
    assert_eq!(
      host.effects().last(),
      Some(&Effect::Focused {
        client: opened[0].id.clone()
      })
    );
  }

  #[tokio::test]
  async fn test_empty_redirect_opens_root() {
    let host = InMemoryHost::new();
    let notification = shown(&host, NotificationData::default()).await;

    route_click(&host, &notification).await;

    assert!(host.effects().iter().any(|e| matches!(
      e,
      Effect::WindowOpened { client } if client.url == "/"
    )));
  }
}
