//! Buffered response handed back to callers.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::{FetchError, FetchResult};

/// A fully read response.
///
/// Revalidated responses are the cached body of a `304`, presented as a `200`
/// with the headers the server sent on the `304`.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    url: String,
    revalidated: bool,
}

impl Response {
    pub(crate) fn new(status: u16, headers: HeaderMap, body: Bytes, url: &str) -> Self {
        Self {
            status,
            headers,
            body,
            url: url.to_string(),
            revalidated: false,
        }
    }

    pub(crate) fn revalidated(headers: HeaderMap, body: Bytes, url: &str) -> Self {
        Self {
            revalidated: true,
            ..Self::new(200, headers, body, url)
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True when the body came from the ETag cache after a `304`.
    pub fn is_revalidated(&self) -> bool {
        self.revalidated
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> FetchResult<T> {
        serde_json::from_slice(&self.body).map_err(|source| FetchError::JsonParse {
            url: self.url.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, ETAG};

    #[test]
    fn test_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"x\""));
        let res = Response::new(200, headers, Bytes::from_static(b"{\"a\":true}"), "http://api.test/flags");

        assert_eq!(res.status(), 200);
        assert_eq!(res.header("etag"), Some("\"x\""));
        assert_eq!(res.text(), "{\"a\":true}");
        assert!(!res.is_revalidated());

        let value: serde_json::Value = res.json().unwrap();
        assert_eq!(value, serde_json::json!({"a": true}));
    }

    #[test]
    fn test_revalidated_is_200() {
        let res = Response::revalidated(HeaderMap::new(), Bytes::from_static(b"B"), "http://api.test");
        assert_eq!(res.status(), 200);
        assert!(res.is_revalidated());
        assert_eq!(res.into_bytes(), Bytes::from_static(b"B"));
    }

    #[test]
    fn test_json_error_carries_url() {
        let res = Response::new(200, HeaderMap::new(), Bytes::from_static(b"<html>"), "http://api.test/x");
        let err = res.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, FetchError::JsonParse { ref url, .. } if url == "http://api.test/x"));
    }
}
