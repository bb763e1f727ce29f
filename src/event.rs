use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::http::Request;

/// One line of an event script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
  Install,
  Activate,
  Fetch {
    request: Request,
  },
  /// Push with a JSON payload, a raw text body, or no body at all
  Push {
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    raw: Option<String>,
  },
  /// Click the displayed notification with this tag
  #[serde(rename = "notificationclick")]
  NotificationClick {
    tag: String,
  },
  /// Page → worker message
  Message {
    data: Value,
  },
  /// An already-open page client
  OpenClient {
    url: String,
  },
}

impl ScriptEvent {
  /// Push body bytes as the platform would deliver them.
  pub fn push_body(payload: &Option<Value>, raw: &Option<String>) -> Option<Vec<u8>> {
    match (payload, raw) {
      (Some(value), _) => serde_json::to_vec(value).ok(),
      (None, Some(raw)) => Some(raw.clone().into_bytes()),
      (None, None) => None,
    }
  }
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<Result<ScriptEvent, serde_json::Error>> {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return None;
  }
  Some(serde_json::from_str(line))
}

/// Event source that reads a JSON-lines script in the background
pub struct EventSource {
  rx: mpsc::UnboundedReceiver<ScriptEvent>,
}

impl EventSource {
  /// Start reading events from the given input
  pub fn new<R>(input: R) -> Self
  where
    R: AsyncRead + Send + Unpin + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      let mut lines = BufReader::new(input).lines();
      let mut line_no = 0usize;
      loop {
        let line = match lines.next_line().await {
          Ok(Some(line)) => line,
          Ok(None) => break,
          Err(e) => {
            warn!("Failed to read event script: {}", e);
            break;
          }
        };
        line_no += 1;

        match parse_line(&line) {
          None => {}
          Some(Ok(event)) => {
            if tx.send(event).is_err() {
              break;
            }
          }
          Some(Err(e)) => warn!("Skipping line {}: {}", line_no, e),
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event; `None` once the script is exhausted
  pub async fn next(&mut self) -> Option<ScriptEvent> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_every_event_kind() {
    let script = r#"
      # lifecycle
      {"event":"install"}
      {"event":"activate"}
      {"event":"fetch","request":{"url":"https://chat.example.com/static/a.png"}}
      {"event":"push","payload":{"data":{"type":"update_badge","badge":"5"}}}
      {"event":"notificationclick","tag":"a1"}
      {"event":"message","data":{"type":"CACHE_URLS","payload":[]}}
      {"event":"open_client","url":"https://chat.example.com/"}
    "#;

    let events: Vec<ScriptEvent> = script
      .lines()
      .filter_map(parse_line)
      .map(|r| r.unwrap())
      .collect();

    assert_eq!(events.len(), 7);
    assert_eq!(events[0], ScriptEvent::Install);
    assert_eq!(
      events[4],
      ScriptEvent::NotificationClick {
        tag: "a1".to_string()
      }
    );
  }

  #[test]
  fn test_push_body_variants() {
    let payload = Some(json!({"data": {}}));
    assert_eq!(
      ScriptEvent::push_body(&payload, &None),
      Some(br#"{"data":{}}"#.to_vec())
    );
    assert_eq!(
      ScriptEvent::push_body(&None, &Some("oops".to_string())),
      Some(b"oops".to_vec())
    );
    assert_eq!(ScriptEvent::push_body(&None, &None), None);
  }

  #[tokio::test]
  async fn test_source_skips_bad_lines() {
    let input: &'static [u8] = b"{\"event\":\"install\"}\nnot json\n{\"event\":\"activate\"}\n";
    let mut source = EventSource::new(input);

    assert_eq!(source.next().await, Some(ScriptEvent::Install));
    assert_eq!(source.next().await, Some(ScriptEvent::Activate));
    assert_eq!(source.next().await, None);
  }
}
