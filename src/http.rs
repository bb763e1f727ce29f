//! Request and response values exchanged between pages, the worker and the network.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Body served when a cache-mediated request cannot reach the network.
pub const ERROR_PAGE: &str = "<html>
<h1>Oops...</h1>
<p>Looks like something went wrong! Please check your internet connection and try to reload the page.</p>
</html>";

/// An outgoing page request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
  #[serde(default = "default_method")]
  pub method: String,
  pub url: String,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
  "GET".to_string()
}

impl Request {
  pub fn new(method: &str, url: &str) -> Self {
    Self {
      method: method.to_string(),
      url: url.to_string(),
      headers: BTreeMap::new(),
    }
  }

  pub fn get(url: &str) -> Self {
    Self::new("GET", url)
  }

  /// Parse the request URL. Fails for relative or malformed URLs.
  pub fn parsed_url(&self) -> Result<Url, url::ParseError> {
    Url::parse(&self.url)
  }
}

/// A captured HTTP response.
///
/// Bodies are fully buffered, so cloning yields an independent copy that can
/// be stored while the original is handed back to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  #[serde(default)]
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: BTreeMap::new(),
      body: body.into(),
    }
  }

  /// Add a header. Names are stored lowercased.
  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.to_string());
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }

  /// Status in the 2xx range.
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Synthetic 503 page returned when the network is unreachable.
  pub fn error_page() -> Self {
    Self::new(503, ERROR_PAGE).with_header("Content-Type", "text/html")
  }
}
