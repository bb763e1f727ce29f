//! Cache layer that orchestrates cache lookups with network fetching.

use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::storage::CacheStorage;
use super::traits::{CacheKey, CacheResult};
use crate::fetch::Fetcher;
use crate::http::Request;

/// Read-through cache over the worker's single named store.
///
/// Entries are never evicted individually; the whole store is dropped on
/// install.
pub struct CacheLayer<S: CacheStorage, F: Fetcher> {
  storage: Arc<S>,
  fetcher: Arc<F>,
  cache_name: String,
}

impl<S: CacheStorage, F: Fetcher> CacheLayer<S, F> {
  pub fn new(storage: S, fetcher: F, cache_name: &str) -> Self {
    Self {
      storage: Arc::new(storage),
      fetcher: Arc::new(fetcher),
      cache_name: cache_name.to_string(),
    }
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  pub fn fetcher(&self) -> &F {
    &self.fetcher
  }

  pub fn cache_name(&self) -> &str {
    &self.cache_name
  }

  /// Answer a request cache-first.
  ///
  /// 1. Stored response → returned verbatim, no network
  /// 2. Miss → network; a 200 is stored before being returned
  /// 3. Network unreachable → synthetic 503 page
  ///
  /// Storage failures never fail the request: a failed lookup counts as a
  /// miss and a failed write is logged.
  pub async fn respond_with_cache(&self, request: &Request) -> CacheResult {
    let key = match CacheKey::from_request(request) {
      Ok(key) => Some(key),
      Err(e) => {
        warn!("Not caching {}: {}", request.url, e);
        None
      }
    };

    if let Some(key) = &key {
      match self.storage.match_request(key) {
        Ok(Some(cached)) => {
          debug!(url = key.url(), cached_at = %cached.cached_at, "cache hit");
          return CacheResult::from_cache(cached.response);
        }
        Ok(None) => {}
        Err(e) => warn!("Cache lookup for {} failed: {}", key.url(), e),
      }
    }

    let resp = match self.fetcher.fetch(request).await {
      Ok(resp) => resp,
      Err(e) => {
        warn!("Serving error page for {}: {}", request.url, e);
        return CacheResult::fallback();
      }
    };

    if resp.status != 200 {
      debug!(url = %request.url, status = resp.status, "not caching non-200 response");
      return CacheResult::from_network(resp);
    }

    if let Some(key) = &key {
      if let Err(e) = self.storage.put(&self.cache_name, key, &resp) {
        warn!("Failed to cache {}: {}", key.url(), e);
      }
    }

    CacheResult::from_network(resp)
  }

  /// Delete every named cache. Returns how many were removed.
  pub fn delete_all(&self) -> Result<usize> {
    let names = self.storage.cache_names()?;
    let mut removed = 0;
    for name in &names {
      if self.storage.delete_cache(name)? {
        removed += 1;
      }
    }
    Ok(removed)
  }

  /// Fetch and store each URL independently.
  ///
  /// A failed asset is logged and skipped; it never affects the others.
  /// Returns how many assets were stored.
  pub async fn warm(&self, urls: &[Url]) -> usize {
    let results = join_all(urls.iter().map(|url| async move {
      let request = Request::get(url.as_str());
      let resp = self.fetcher.fetch(&request).await?;
      if resp.status != 200 {
        return Err(eyre!("unexpected status {}", resp.status));
      }
      let key = CacheKey::from_request(&request)?;
      self.storage.put(&self.cache_name, &key, &resp)
    }))
    .await;

    let mut stored = 0;
    for (url, result) in urls.iter().zip(results) {
      match result {
        Ok(()) => stored += 1,
        Err(e) => warn!("Failed to pre-warm {}: {}", url, e),
      }
    }
    stored
  }

  /// Fetch every URL and store them all, or store nothing.
  ///
  /// Any network failure or non-2xx status aborts the whole batch.
  pub async fn add_all(&self, urls: &[Url]) -> Result<usize> {
    self.storage.open_cache(&self.cache_name)?;

    let requests: Vec<Request> = urls.iter().map(|u| Request::get(u.as_str())).collect();
    let results = join_all(requests.iter().map(|r| self.fetcher.fetch(r))).await;

    let mut entries = Vec::with_capacity(requests.len());
    for (request, result) in requests.iter().zip(results) {
      let resp = result?;
      if !resp.is_ok() {
        return Err(eyre!(
          "Request for {} returned status {}",
          request.url,
          resp.status
        ));
      }
      entries.push((CacheKey::from_request(request)?, resp));
    }

    self.storage.put_all(&self.cache_name, &entries)?;
    Ok(entries.len())
  }
}

impl<S: CacheStorage, F: Fetcher> Clone for CacheLayer<S, F> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      fetcher: Arc::clone(&self.fetcher),
      cache_name: self.cache_name.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, SqliteStorage};
  use crate::http::Response;
  use crate::testing::{FailingStorage, ScriptedFetcher};

  const ICON: &str = "https://chat.example.com/static/icon_144x144.png";

  fn layer(fetcher: ScriptedFetcher) -> CacheLayer<SqliteStorage, ScriptedFetcher> {
    CacheLayer::new(SqliteStorage::open_in_memory().unwrap(), fetcher, "FDX cache")
  }

  fn entries(layer: &CacheLayer<SqliteStorage, ScriptedFetcher>) -> usize {
    layer.storage().keys("FDX cache").unwrap().len()
  }

  #[tokio::test]
  async fn test_miss_then_hit_uses_network_once() {
    let fetcher = ScriptedFetcher::new().respond(ICON, Response::new(200, "icon-bytes"));
    let layer = layer(fetcher);

    let first = layer.respond_with_cache(&Request::get(ICON)).await;
    assert_eq!(first.source, CacheSource::Network);

    let second = layer.respond_with_cache(&Request::get(ICON)).await;
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(first.response, second.response);
    assert_eq!(layer.fetcher().calls(ICON), 1);
  }

  #[tokio::test]
  async fn test_non_200_is_returned_but_not_stored() {
    for status in [201, 204, 304, 404, 500] {
      let fetcher = ScriptedFetcher::new().respond(ICON, Response::new(status, ""));
      let layer = layer(fetcher);

      let result = layer.respond_with_cache(&Request::get(ICON)).await;
      assert_eq!(result.response.status, status);
      assert_eq!(result.source, CacheSource::Network);
      assert_eq!(entries(&layer), 0);
    }
  }

  #[tokio::test]
  async fn test_network_failure_yields_error_page() {
    let layer = layer(ScriptedFetcher::new().fail(ICON));

    let result = layer.respond_with_cache(&Request::get(ICON)).await;
    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.response.status, 503);
    assert_eq!(result.response.header("Content-Type"), Some("text/html"));
    assert_eq!(entries(&layer), 0);
  }

  #[tokio::test]
  async fn test_warm_isolates_failures() {
    let good = "https://chat.example.com/static/good.png";
    let bad = "https://chat.example.com/static/bad.png";
    let missing = "https://chat.example.com/static/missing.png";
    let fetcher = ScriptedFetcher::new()
      .respond(good, Response::new(200, "ok"))
      .fail(bad)
      .respond(missing, Response::new(404, ""));
    let layer = layer(fetcher);

    let urls: Vec<Url> = [good, bad, missing]
      .iter()
      .map(|u| Url::parse(u).unwrap())
      .collect();
    assert_eq!(layer.warm(&urls).await, 1);
    assert_eq!(entries(&layer), 1);
  }

  #[tokio::test]
  async fn test_add_all_stores_every_url() {
    let a = "https://chat.example.com/static/a.css";
    let b = "https://chat.example.com/static/b.png";
    let fetcher = ScriptedFetcher::new()
      .respond(a, Response::new(200, "a"))
      .respond(b, Response::new(200, "b"));
    let layer = layer(fetcher);

    let urls: Vec<Url> = [a, b].iter().map(|u| Url::parse(u).unwrap()).collect();
    assert_eq!(layer.add_all(&urls).await.unwrap(), 2);

    for url in [a, b] {
      let hit = layer.respond_with_cache(&Request::get(url)).await;
      assert_eq!(hit.source, CacheSource::Cache);
    }
  }

  #[tokio::test]
  async fn test_add_all_is_all_or_nothing() {
    let a = "https://chat.example.com/static/a.css";
    let b = "https://chat.example.com/static/b.png";
    let fetcher = ScriptedFetcher::new()
      .respond(a, Response::new(200, "a"))
      .respond(b, Response::new(404, ""));
    let layer = layer(fetcher);

    let urls: Vec<Url> = [a, b].iter().map(|u| Url::parse(u).unwrap()).collect();
    assert!(layer.add_all(&urls).await.is_err());
    assert_eq!(entries(&layer), 0);
  }

  #[tokio::test]
  async fn test_delete_all_flushes_every_cache() {
    let layer = layer(ScriptedFetcher::new());
    let key = CacheKey::from_request(&Request::get(ICON)).unwrap();
    layer.storage().put("old-a", &key, &Response::new(200, "x")).unwrap();
    layer.storage().put("old-b", &key, &Response::new(200, "y")).unwrap();

    assert_eq!(layer.delete_all().unwrap(), 2);
    assert!(layer.storage().cache_names().unwrap().is_empty());
    assert!(layer.storage().match_request(&key).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_failed_write_still_returns_network_response() {
    let fetcher = ScriptedFetcher::new().respond(ICON, Response::new(200, "icon-bytes"));
    let layer = CacheLayer::new(FailingStorage::new(), fetcher, "FDX cache");

    let result = layer.respond_with_cache(&Request::get(ICON)).await;
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.response.status, 200);
    assert_eq!(result.response.body, b"icon-bytes".to_vec());
    assert_eq!(layer.storage().writes(), 1);
  }

  #[tokio::test]
  async fn test_failed_lookup_counts_as_miss() {
    let fetcher = ScriptedFetcher::new().respond(ICON, Response::new(200, "icon-bytes"));
    let layer = CacheLayer::new(FailingStorage::new(), fetcher, "FDX cache");

    for _ in 0..2 {
      let result = layer.respond_with_cache(&Request::get(ICON)).await;
      assert_eq!(result.source, CacheSource::Network);
    }
    assert_eq!(layer.fetcher().calls(ICON), 2);
  }
}
