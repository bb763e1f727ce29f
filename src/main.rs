mod logging;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use remotalk_sw::cache::{CacheSource, CacheStorage, SqliteStorage};
use remotalk_sw::config::Config;
use remotalk_sw::event::{EventSource, ScriptEvent};
use remotalk_sw::fetch::{Fetcher, HttpFetcher};
use remotalk_sw::host::InMemoryHost;
use remotalk_sw::{Event, EventOutcome, Worker};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tracing::{info, warn};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "remotalk-sw")]
#[command(about = "Replay worker events against the RemoTalk notification and cache worker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/remotalk-sw/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Origin the worker is registered for; overrides the config file
  #[arg(short, long)]
  origin: Option<Url>,

  /// JSON-lines event script (default: stdin)
  #[arg(short, long)]
  script: Option<PathBuf>,

  /// Write logs to a daily rolling file in this directory instead of stderr
  #[arg(long)]
  log_dir: Option<PathBuf>,
}

/// One handled event, printed as a JSON line
#[derive(Debug, Serialize)]
struct Report {
  seq: usize,
  event: &'static str,
  outcome: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  status: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  source: Option<&'static str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  bytes: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
}

impl Report {
  fn new(seq: usize, event: &'static str, outcome: &'static str) -> Self {
    Self {
      seq,
      event,
      outcome,
      url: None,
      status: None,
      source: None,
      bytes: None,
      error: None,
    }
  }
}

fn source_name(source: CacheSource) -> &'static str {
  match source {
    CacheSource::Cache => "cache",
    CacheSource::Network => "network",
    CacheSource::Fallback => "fallback",
  }
}

async fn handle<S, F>(
  worker: &Worker<S, F, InMemoryHost>,
  seq: usize,
  event: Event,
) -> Report
where
  S: CacheStorage,
  F: Fetcher,
{
  let kind = event.kind();
  let url = match &event {
    Event::Fetch(request) => Some(request.url.clone()),
    _ => None,
  };

  match worker.dispatch(event).await {
    Ok(EventOutcome::Done) => Report::new(seq, kind, "done"),
    Ok(EventOutcome::Passthrough) => Report {
      url,
      ..Report::new(seq, kind, "passthrough")
    },
    Ok(EventOutcome::Respond(result)) => Report {
      url,
      status: Some(result.response.status),
      source: Some(source_name(result.source)),
      bytes: Some(result.response.body.len()),
      ..Report::new(seq, kind, "respond")
    },
    Err(e) => Report {
      error: Some(format!("{:#}", e)),
      ..Report::new(seq, kind, "error")
    },
  }
}

/// Turn a script line into a worker event. Lines that only change the
/// simulated platform yield `None`.
fn to_worker_event<S, F>(
  worker: &Worker<S, F, InMemoryHost>,
  script_event: ScriptEvent,
) -> Result<Option<Event>>
where
  S: CacheStorage,
  F: Fetcher,
{
  let event = match script_event {
    ScriptEvent::Install => Event::Install,
    ScriptEvent::Activate => Event::Activate,
    ScriptEvent::Fetch { request } => Event::Fetch(request),
    ScriptEvent::Push { payload, raw } => Event::Push(ScriptEvent::push_body(&payload, &raw)),
    ScriptEvent::Message { data } => Event::Message(data),
    ScriptEvent::NotificationClick { tag } => {
      let notification = worker
        .host()
        .find_notification(&tag)
        .ok_or_else(|| eyre!("No displayed notification tagged {:?}", tag))?;
      Event::NotificationClick(notification)
    }
    ScriptEvent::OpenClient { url } => {
      let client = worker.host().add_window(&url)?;
      info!(client = %client.id, url = %client.url, "page client opened");
      return Ok(None);
    }
  };
  Ok(Some(event))
}

fn emit<T: Serialize>(value: &T) {
  match serde_json::to_string(value) {
    Ok(line) => println!("{}", line),
    Err(e) => warn!("Failed to serialize output: {}", e),
  }
}

/// Dispatch every scripted event, keeping handlers in flight concurrently.
async fn run<S, F>(worker: &Worker<S, F, InMemoryHost>, events: &mut EventSource)
where
  S: CacheStorage,
  F: Fetcher,
{
  let mut in_flight = FuturesUnordered::new();
  let mut input_done = false;
  let mut seq = 0usize;

  loop {
    tokio::select! {
      biased;

      Some(report) = in_flight.next(), if !in_flight.is_empty() => {
        emit(&report);
      }
      next = events.next(), if !input_done => match next {
        Some(script_event) => {
          seq += 1;
          match to_worker_event(worker, script_event) {
            Ok(Some(event)) => in_flight.push(handle(worker, seq, event)),
            Ok(None) => {}
            Err(e) => warn!("Skipping event {}: {}", seq, e),
          }
        }
        None => input_done = true,
      },
      else => break,
    }

    for effect in worker.host().drain_effects() {
      emit(&effect);
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.log_dir.as_deref())?;

  let config = Config::load(args.config.as_deref(), args.origin)?;

  let storage = if config.cache.in_memory {
    SqliteStorage::open_in_memory()?
  } else {
    SqliteStorage::open(config.cache.path.as_deref())?
  };

  info!(origin = %config.origin, cache = %config.cache.name, "starting worker");
  let worker = Worker::new(config, storage, HttpFetcher::new()?, InMemoryHost::new());

  let input: Box<dyn AsyncRead + Send + Unpin> = match &args.script {
    Some(path) => Box::new(
      tokio::fs::File::open(path)
        .await
        .map_err(|e| eyre!("Failed to open script {}: {}", path.display(), e))?,
    ),
    None => Box::new(tokio::io::stdin()),
  };

  let mut events = EventSource::new(input);
  run(&worker, &mut events).await;

  Ok(())
}
