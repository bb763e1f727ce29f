//! Decides which page requests the worker may answer from its cache.

use url::{Origin, Url};

use crate::config::Config;
use crate::http::Request;

/// The slice of requests the worker is allowed to cache.
#[derive(Debug, Clone)]
pub struct CacheScope {
  origin: Origin,
  static_prefix: String,
  exclude_scripts: bool,
}

impl CacheScope {
  pub fn new(origin: &Url, static_prefix: &str, exclude_scripts: bool) -> Self {
    Self {
      origin: origin.origin(),
      static_prefix: static_prefix.to_string(),
      exclude_scripts,
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(
      &config.origin,
      &config.cache.static_prefix,
      config.cache.exclude_scripts,
    )
  }

  /// Whether the request must go to the network untouched.
  ///
  /// Unparsable URLs fail open: they are bypassed.
  pub fn should_bypass_cache(&self, request: &Request) -> bool {
    let url = match request.parsed_url() {
      Ok(url) => url,
      Err(_) => return true,
    };

    url.origin() != self.origin
      || !url.path().starts_with(&self.static_prefix)
      || request.method != "GET"
      || (self.exclude_scripts && url.path().ends_with(".js"))
  }
}
