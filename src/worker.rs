//! The worker: one handler per platform event.

use color_eyre::Result;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheLayer, CacheResult, CacheScope, CacheStorage};
use crate::click::route_click;
use crate::config::Config;
use crate::fetch::Fetcher;
use crate::host::Host;
use crate::http::Request;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::message::PageMessage;
use crate::notification::DisplayedNotification;
use crate::push::PushRouter;

/// Events delivered to the worker by its platform.
#[derive(Debug, Clone)]
pub enum Event {
  Install,
  Activate,
  /// A page request inside the worker's scope
  Fetch(Request),
  /// Push message; `None` when the push carried no body
  Push(Option<Vec<u8>>),
  NotificationClick(DisplayedNotification),
  /// Structured message posted by a page
  Message(Value),
}

impl Event {
  pub fn kind(&self) -> &'static str {
    match self {
      Event::Install => "install",
      Event::Activate => "activate",
      Event::Fetch(_) => "fetch",
      Event::Push(_) => "push",
      Event::NotificationClick(_) => "notificationclick",
      Event::Message(_) => "message",
    }
  }
}

/// What the platform should do once a handler finished.
#[derive(Debug, Clone)]
pub enum EventOutcome {
  Done,
  /// Let the request go to the network untouched
  Passthrough,
  /// Answer the request with this response
  Respond(CacheResult),
}

pub struct Worker<S: CacheStorage, F: Fetcher, H: Host> {
  config: Config,
  scope: CacheScope,
  cache: CacheLayer<S, F>,
  host: H,
  lifecycle: Lifecycle,
}

impl<S: CacheStorage, F: Fetcher, H: Host> Worker<S, F, H> {
  pub fn new(config: Config, storage: S, fetcher: F, host: H) -> Self {
    let scope = CacheScope::from_config(&config);
    let cache = CacheLayer::new(storage, fetcher, &config.cache.name);

    Self {
      config,
      scope,
      cache,
      host,
      lifecycle: Lifecycle::new(),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn cache(&self) -> &CacheLayer<S, F> {
    &self.cache
  }

  pub fn host(&self) -> &H {
    &self.host
  }

  pub fn state(&self) -> LifecycleState {
    self.lifecycle.state()
  }

  /// Run the handler for one event to completion.
  ///
  /// The returned future covers all asynchronous work the event triggers,
  /// so the caller keeps the worker alive until it resolves. Only install
  /// can fail; every other handler absorbs its own failures.
  pub async fn dispatch(&self, event: Event) -> Result<EventOutcome> {
    debug!(event = event.kind(), "dispatching");

    match event {
      Event::Install => self.on_install().await.map(|_| EventOutcome::Done),
      Event::Activate => {
        self.on_activate().await;
        Ok(EventOutcome::Done)
      }
      Event::Fetch(request) => Ok(self.on_fetch(&request).await),
      Event::Push(body) => {
        self.on_push(body.as_deref()).await;
        Ok(EventOutcome::Done)
      }
      Event::NotificationClick(notification) => {
        self.on_notification_click(&notification).await;
        Ok(EventOutcome::Done)
      }
      Event::Message(value) => {
        self.on_message(&value).await;
        Ok(EventOutcome::Done)
      }
    }
  }

  /// Flush every cache, then pre-warm the configured assets.
  ///
  /// The worker becomes eligible for activation before pre-warming starts,
  /// so activation may run while warming is still in flight.
  pub async fn on_install(&self) -> Result<()> {
    self.lifecycle.transition(LifecycleState::Installing)?;
    self.lifecycle.skip_waiting();

    match self.cache.delete_all() {
      Ok(removed) => info!(removed, "deleted existing caches"),
      Err(e) => {
        let _ = self.lifecycle.transition(LifecycleState::Redundant);
        return Err(e.wrap_err("Install failed while deleting caches"));
      }
    }

    self.lifecycle.installed()?;

    let urls = self.resolve_all(&self.config.cache.prewarm);
    if !urls.is_empty() {
      let stored = self.cache.warm(&urls).await;
      info!(stored, requested = urls.len(), "pre-warmed static assets");
    }
    Ok(())
  }

  /// Take control of every open page.
  ///
  /// A repeated activate is a no-op; one arriving before a successful
  /// install is logged and ignored.
  pub async fn on_activate(&self) {
    if self.lifecycle.state() == LifecycleState::Active {
      debug!("Already active, ignoring activate");
      return;
    }
    if let Err(e) = self.lifecycle.begin_activation() {
      warn!("Ignoring activate: {}", e);
      return;
    }
    if let Err(e) = self.host.claim().await {
      warn!("Failed to claim clients: {}", e);
    }
    if let Err(e) = self.lifecycle.transition(LifecycleState::Active) {
      warn!("Failed to finish activation: {}", e);
    }
  }

  pub async fn on_fetch(&self, request: &Request) -> EventOutcome {
    if self.scope.should_bypass_cache(request) {
      return EventOutcome::Passthrough;
    }
    EventOutcome::Respond(self.cache.respond_with_cache(request).await)
  }

  pub async fn on_push(&self, body: Option<&[u8]>) {
    PushRouter::new(&self.config, &self.host).route(body).await;
  }

  pub async fn on_notification_click(&self, notification: &DisplayedNotification) {
    route_click(&self.host, notification).await;
  }

  pub async fn on_message(&self, value: &Value) {
    match PageMessage::decode(value) {
      PageMessage::CacheUrls { payload } => {
        let mut urls = Vec::with_capacity(payload.len());
        for raw in &payload {
          match self.config.origin.join(raw) {
            Ok(url) => urls.push(url),
            Err(e) => {
              warn!("Not caching URL batch, invalid URL {}: {}", raw, e);
              return;
            }
          }
        }

        match self.cache.add_all(&urls).await {
          Ok(stored) => info!(stored, "cached URLs requested by page"),
          Err(e) => warn!("Failed to cache requested URLs: {}", e),
        }
      }
      PageMessage::Unknown => debug!("Ignoring unknown page message"),
    }
  }

  /// Resolve configured paths against the worker origin, skipping bad ones.
  fn resolve_all(&self, paths: &[String]) -> Vec<Url> {
    paths
      .iter()
      .filter_map(|p| match self.config.origin.join(p) {
        Ok(url) => Some(url),
        Err(e) => {
          warn!("Skipping invalid asset URL {}: {}", p, e);
          None
        }
      })
      .collect()
  }
}
