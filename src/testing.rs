//! Test doubles shared by the unit tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::{CacheKey, CacheStorage, CachedResponse};
use crate::fetch::Fetcher;
use crate::http::{Request, Response};

/// Fetcher that answers from a fixed table and counts calls per URL.
///
/// URLs missing from the table behave like an unreachable network.
#[derive(Default)]
pub struct ScriptedFetcher {
  routes: HashMap<String, Option<Response>>,
  calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(mut self, url: &str, response: Response) -> Self {
    self.routes.insert(url.to_string(), Some(response));
    self
  }

  pub fn fail(mut self, url: &str) -> Self {
    self.routes.insert(url.to_string(), None);
    self
  }

  pub fn calls(&self, url: &str) -> usize {
    self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
  }

  pub fn total_calls(&self) -> usize {
    self.calls.lock().unwrap().values().sum()
  }
}

impl Fetcher for ScriptedFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    *self
      .calls
      .lock()
      .unwrap()
      .entry(request.url.clone())
      .or_default() += 1;

    match self.routes.get(&request.url) {
      Some(Some(resp)) => Ok(resp.clone()),
      _ => Err(eyre!("network unreachable: {}", request.url)),
    }
  }
}

/// Storage whose every operation fails, like a broken or full disk.
#[derive(Default)]
pub struct FailingStorage {
  writes: Mutex<usize>,
}

impl FailingStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Write attempts seen so far.
  pub fn writes(&self) -> usize {
    *self.writes.lock().unwrap()
  }
}

impl CacheStorage for FailingStorage {
  fn cache_names(&self) -> Result<Vec<String>> {
    Err(eyre!("storage unavailable"))
  }

  fn open_cache(&self, _name: &str) -> Result<()> {
    Err(eyre!("storage unavailable"))
  }

  fn delete_cache(&self, _name: &str) -> Result<bool> {
    Err(eyre!("storage unavailable"))
  }

  fn match_request(&self, _key: &CacheKey) -> Result<Option<CachedResponse>> {
    Err(eyre!("storage unavailable"))
  }

  fn put(&self, _cache_name: &str, _key: &CacheKey, _response: &Response) -> Result<()> {
    *self.writes.lock().unwrap() += 1;
    Err(eyre!("disk full"))
  }

  fn put_all(&self, _cache_name: &str, _entries: &[(CacheKey, Response)]) -> Result<()> {
    *self.writes.lock().unwrap() += 1;
    Err(eyre!("disk full"))
  }

  fn keys(&self, _cache_name: &str) -> Result<Vec<CacheKey>> {
    Err(eyre!("storage unavailable"))
  }
}
