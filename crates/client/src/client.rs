//! Egnyte API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.
//! All API calls go through [`Client::send`] or [`Client::execute`].

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::{
    AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use reqwest::{Body, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, Error};
use crate::request::{Reply, RequestSpec};

/// Client identifier sent when none is configured.
pub const SOURCE_NAME: &str = "rust-sdk";

/// Version reported in the `User-Agent` header.
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

const CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("egnyte-client-id");

/// Characters escaped in URL paths; `/` is kept as the separator.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Egnyte API client.
///
/// Cheap to clone and safe to share across tasks; the only state besides
/// the connection pool is the fixed default header set.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    root: String,
    scheme: &'static str,
    headers: HeaderMap,
}

impl Client {
    /// Creates a client for `root` (a domain such as `acme.egnyte.com`)
    /// authenticating with `token`.
    pub fn new(root: &str, token: &str) -> Result<Self, Error> {
        Self::build(root, token, SOURCE_NAME, false)
    }

    /// Creates a client from a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let client_id = if config.client_id.is_empty() {
            SOURCE_NAME
        } else {
            config.client_id.as_str()
        };
        Self::build(
            &config.domain,
            &config.access_token,
            client_id,
            config.insecure,
        )
    }

    fn build(root: &str, token: &str, client_id: &str, insecure: bool) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CLIENT_ID_HEADER, header_value("Egnyte-Client-Id", client_id)?);
        headers.insert(
            USER_AGENT,
            header_value("User-Agent", &format!("{SOURCE_NAME}/{VERSION}"))?,
        );
        let mut auth = header_value("Authorization", &format!("Bearer {token}"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            root: root.to_string(),
            scheme: if insecure { "http" } else { "https" },
            headers,
        })
    }

    /// Replaces the underlying HTTP client (timeouts, proxies, TLS roots).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The default authority requests are sent to.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Issues a call and returns status and headers.
    ///
    /// The response body is released before returning unless the request
    /// was built with [`RequestSpec::keep_body_open`].
    pub async fn send(&self, spec: RequestSpec) -> Result<Reply, Error> {
        let keep_body_open = spec.keep_body_open;
        let resp = self.dispatch(spec).await?;
        Ok(Reply::new(resp, keep_body_open))
    }

    /// Issues a call and decodes the JSON response body into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, Error> {
        let resp = self.dispatch(spec).await?;
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(Error::Decode)
    }

    async fn dispatch(&self, spec: RequestSpec) -> Result<reqwest::Response, Error> {
        let RequestSpec {
            method,
            path,
            root,
            headers,
            query,
            body,
            payload,
            ..
        } = spec;

        let body = match (body, payload) {
            (Some(body), _) => Some(body),
            (None, Some(payload)) => Some(Body::from(
                serde_json::to_vec(&payload).map_err(Error::Encode)?,
            )),
            (None, None) => None,
        };

        let root = root.as_deref().unwrap_or(&self.root);
        let url = self.build_url(root, &path, &query)?;
        let headers = self.request_headers(&headers)?;

        debug!(%method, %url, "sending request");
        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        let resp = request.send().await?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let err = ApiError::from_response(resp).await;
        warn!(
            status = err.status,
            code = %err.code,
            timeout = err.is_timeout(),
            message = %err.message,
            "request failed"
        );
        Err(err.into())
    }

    fn build_url(&self, root: &str, path: &str, query: &[(String, String)]) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}://{root}", self.scheme))
            .map_err(|e| Error::InvalidUrl(format!("{root}: {e}")))?;
        let full_path = format!("{}{path}", url.path().trim_end_matches('/'));
        url.set_path(&utf8_percent_encode(&full_path, PATH).to_string());
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Defaults overlaid with the call's own headers; the call wins.
    fn request_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut headers = self.headers.clone();
        for (name, value) in extra {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value(name, value)?);
        }
        Ok(headers)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
