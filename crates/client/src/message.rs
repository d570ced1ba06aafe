//! Request and response values passed through the strategies.
//!
//! Bodies are `Bytes` so a cached response can be handed out repeatedly
//! without copying.

use beekon_core::cache::hash::compute_cache_key;
use beekon_core::{CachedEntry, Error, PendingWrite};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

/// Synthetic header carrying the capture timestamp of a cached response.
pub const CACHED_AT_HEADER: &str = "x-beekon-cached-at";

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: None }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Normalized storage key (method + URL without fragment).
    pub fn key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        compute_cache_key(self.method.as_str(), url.as_str())
    }

    /// Only GET responses are ever cached.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether replaying this request later makes sense.
    pub fn is_write(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
    }

    pub fn to_pending_write(&self) -> PendingWrite {
        PendingWrite {
            method: self.method.as_str().to_string(),
            url: self.url.to_string(),
            headers: headers_to_pairs(&self.headers),
            body: self.body.as_ref().map(|b| b.to_vec()),
        }
    }

    pub fn from_pending_write(write: &PendingWrite) -> Result<Self, Error> {
        let method = Method::from_bytes(write.method.as_bytes())
            .map_err(|e| Error::CorruptEntry(format!("bad method {:?}: {e}", write.method)))?;
        let url = Url::parse(&write.url).map_err(|e| Error::CorruptEntry(format!("bad url {:?}: {e}", write.url)))?;
        Ok(Self { method, url, headers: pairs_to_headers(&write.headers)?, body: write.body.clone().map(Bytes::from) })
    }
}

/// A response from the network, the cache, or a synthetic fallback.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Capture timestamp, present only on responses served from cache.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.headers.get(CACHED_AT_HEADER)?.to_str().ok()?;
        DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.with_timezone(&Utc))
    }

    /// Snapshot this response for storage, stamped with `cached_at`.
    pub fn to_entry(&self, request: &Request, cached_at: DateTime<Utc>) -> CachedEntry {
        let mut headers = self.headers.clone();
        headers.remove(CACHED_AT_HEADER);
        CachedEntry {
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            status: self.status.as_u16(),
            headers: headers_to_pairs(&headers),
            body: self.body.to_vec(),
            cached_at,
        }
    }

    /// Rebuild a response from a stored entry, adding the capture timestamp header.
    pub fn from_entry(entry: &CachedEntry) -> Result<Self, Error> {
        let status = StatusCode::from_u16(entry.status)
            .map_err(|_| Error::CorruptEntry(format!("status {} for {}", entry.status, entry.url)))?;
        let mut headers = pairs_to_headers(&entry.headers)?;
        let stamp = entry.cached_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let stamp = HeaderValue::from_str(&stamp).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        headers.insert(HeaderName::from_static(CACHED_AT_HEADER), stamp);
        Ok(Self { status, headers, body: Bytes::from(entry.body.clone()) })
    }
}

/// Non-UTF-8 header values are dropped.
fn headers_to_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

fn pairs_to_headers(pairs: &[(String, String)]) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_entry_roundtrip_adds_cached_at() {
        let request = Request::get(url("https://example.com/rest/v1/brands"));
        let response = Response::new(StatusCode::OK, r#"[{"id":1}]"#).with_content_type("application/json");
        let captured = Utc::now();

        let entry = response.to_entry(&request, captured);
        assert_eq!(entry.method, "GET");
        assert!(entry.headers.iter().all(|(name, _)| name != CACHED_AT_HEADER));

        let restored = Response::from_entry(&entry).unwrap();
        assert_eq!(restored.body, response.body);
        assert_eq!(restored.content_type(), Some("application/json"));
        let stamp = restored.cached_at().unwrap();
        assert_eq!(stamp.timestamp_millis(), captured.timestamp_millis());
    }

    #[test]
    fn test_cached_at_not_stored_twice() {
        let request = Request::get(url("https://example.com/app.js"));
        let entry = Response::new(StatusCode::OK, "x").to_entry(&request, Utc::now());
        let served = Response::from_entry(&entry).unwrap();

        let restored = served.to_entry(&request, Utc::now());
        assert_eq!(restored.headers.iter().filter(|(name, _)| name == CACHED_AT_HEADER).count(), 0);
    }

    #[test]
    fn test_key_depends_on_method() {
        let get = Request::get(url("https://example.com/rest/v1/brands"));
        let post = Request::new(Method::POST, url("https://example.com/rest/v1/brands"));
        assert_ne!(get.key(), post.key());
        assert!(get.is_cacheable());
        assert!(!post.is_cacheable());
        assert!(post.is_write());
    }

    #[test]
    fn test_key_ignores_fragment_and_host_case() {
        let plain = Request::get(url("https://example.com/assets/app.js"));
        let anchored = Request::get(url("https://EXAMPLE.com:443/assets/app.js#x"));
        assert_eq!(plain.key(), anchored.key());

        let query = Request::get(url("https://example.com/assets/app.js?v=2"));
        assert_ne!(plain.key(), query.key());
    }

    #[test]
    fn test_pending_write_roundtrip() {
        let request = Request::new(Method::PATCH, url("https://example.com/rest/v1/brands?id=eq.1"))
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(r#"{"name":"acme"}"#);

        let write = request.to_pending_write();
        let replay = Request::from_pending_write(&write).unwrap();
        assert_eq!(replay.method, Method::PATCH);
        assert_eq!(replay.url, request.url);
        assert_eq!(replay.body, request.body);
        assert_eq!(replay.headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_corrupt_status_rejected() {
        let entry = CachedEntry {
            method: "GET".into(),
            url: "https://example.com/".into(),
            status: 42,
            headers: vec![],
            body: vec![],
            cached_at: Utc::now(),
        };
        assert!(matches!(Response::from_entry(&entry), Err(Error::CorruptEntry(_))));
    }
}
