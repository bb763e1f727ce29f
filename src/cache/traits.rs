//! Core types for the response cache.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};

use crate::http::{Request, Response};

/// Normalized request identity: method plus URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  method: String,
  url: String,
}

impl CacheKey {
  /// Build a key from a request with an absolute URL.
  pub fn from_request(request: &Request) -> Result<Self> {
    let mut url = request
      .parsed_url()
      .map_err(|e| eyre!("Invalid request URL {}: {}", request.url, e))?;
    url.set_fragment(None);

    Ok(Self {
      method: request.method.to_ascii_uppercase(),
      url: url.to_string(),
    })
  }

  pub(crate) fn from_parts(method: String, url: String) -> Self {
    Self { method, url }
  }

  pub fn method(&self) -> &str {
    &self.method
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  /// Stable fixed-length storage key.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// A stored response and when it was stored.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  pub cached_at: DateTime<Utc>,
}

/// Response handed back to a page, with where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult {
  pub response: Response,
  pub source: CacheSource,
}

impl CacheResult {
  pub fn from_cache(response: Response) -> Self {
    Self {
      response,
      source: CacheSource::Cache,
    }
  }

  pub fn from_network(response: Response) -> Self {
    Self {
      response,
      source: CacheSource::Network,
    }
  }

  /// Synthetic error page after a network failure.
  pub fn fallback() -> Self {
    Self {
      response: Response::error_page(),
      source: CacheSource::Fallback,
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Served from the cache store without network contact
  Cache,
  /// Fetched from the network (and stored when the status was 200)
  Network,
  /// Network unreachable, synthetic error page
  Fallback,
}
