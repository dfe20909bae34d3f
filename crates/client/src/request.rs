//! Per-call request description and successful reply.

use reqwest::header::HeaderMap;
use reqwest::{Body, Method, StatusCode};
use serde::Serialize;

use crate::error::Error;

/// Everything needed to issue one API call.
///
/// Built fresh per call and consumed by [`Client::send`](crate::Client::send)
/// or [`Client::execute`](crate::Client::execute).
#[derive(Debug)]
pub struct RequestSpec {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) root: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Body>,
    pub(crate) payload: Option<serde_json::Value>,
    pub(crate) keep_body_open: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            root: None,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            payload: None,
            keep_body_open: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sends this call to `root` instead of the client's default authority.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Adds a header; replaces a client default with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a raw request body. A raw body takes precedence over [`json`](Self::json).
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON payload, encoded when the request is sent.
    ///
    /// Sequence fields must be `Vec`s, so that an empty collection goes on
    /// the wire as `[]` rather than `null`; the server rejects the latter.
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self, Error> {
        self.payload = Some(serde_json::to_value(payload).map_err(Error::Encode)?);
        Ok(self)
    }

    /// Leaves the response body open in the returned [`Reply`] for streaming.
    pub fn keep_body_open(mut self) -> Self {
        self.keep_body_open = true;
        self
    }
}

/// A successful (2xx) response.
///
/// The body is present only when the request asked for it to stay open;
/// otherwise it was released before the reply was returned.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<reqwest::Response>,
}

impl Reply {
    pub(crate) fn new(resp: reqwest::Response, keep_body_open: bool) -> Self {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = if keep_body_open {
            Some(resp)
        } else {
            drop(resp);
            None
        };
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Takes the open response body, if one was kept.
    pub fn into_body(self) -> Option<reqwest::Response> {
        self.body
    }
}
