//! Client error types and the server error classifier.

use std::fmt;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;

/// Status codes reported as timeouts by [`ApiError::is_timeout`].
pub const TIMEOUT_STATUS_CODES: [u16; 4] = [408, 504, 598, 599];

/// Errors produced by the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, DNS or TLS failure; no response was received.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("JSON decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("JSON encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("stream error: {0}")]
    StreamRead(#[from] egnyte_transfer::TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("server changed upload id from {cached} to {received}")]
    UploadIdConflict { cached: String, received: String },

    #[error("server did not return an upload id")]
    MissingUploadId,

    #[error("nothing to upload")]
    EmptyUpload,

    #[error("cancelled")]
    Cancelled,

    #[error("upload task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("object must be a folder")]
    FolderRequired,

    #[error("{permission} is not a valid permission for {name}")]
    InvalidPermission { name: String, permission: String },

    #[error("invalid timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },

    #[error("config read error: {0}")]
    ConfigRead(#[from] toml::de::Error),

    #[error("config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

impl Error {
    /// The normalized server error, if this is one.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// True for server errors whose status is timeout-class.
    pub fn is_timeout(&self) -> bool {
        self.api().is_some_and(ApiError::is_timeout)
    }
}

/// A non-2xx response, normalized across the server's error body formats.
///
/// Status, raw body and headers are always populated, even when none of
/// the known body formats matched.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    /// Vendor error code; empty when the body carried none.
    pub code: String,
    pub message: String,
    pub body: String,
    pub headers: HeaderMap,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(
                f,
                "got HTTP response code {} with body: {}",
                self.status, self.body
            )
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        TIMEOUT_STATUS_CODES.contains(&self.status)
    }

    /// Classifies an error response from its parts.
    ///
    /// Body formats are tried in a fixed order and the first one that
    /// yields a message wins. Server errors (500..=511) without a usable
    /// body fall back to the standard status text.
    pub fn classify(status: u16, headers: HeaderMap, body: String) -> Self {
        let (code, mut message) = parse_error_body(&body);
        if message.is_empty() && (500..=511).contains(&status) {
            message = StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string();
        }
        Self {
            status,
            code,
            message,
            body,
            headers,
        }
    }

    /// Reads the whole body of a failed response and classifies it.
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        // An unreadable body classifies like an empty one.
        let body = match resp.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        };
        Self::classify(status, headers, body)
    }
}

// ---------------------------------------------------------------------------
// Error body formats
// ---------------------------------------------------------------------------

/// `{"success": false, "responseCode": "...", "responseMsg": "..."}`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCodeReply {
    success: Option<bool>,
    #[serde(default)]
    response_code: String,
    #[serde(default)]
    response_msg: String,
}

/// `{"formErrors": [{"code": "...", "msg": "..."}], "inputErrors": {...}}`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormErrorsReply {
    #[serde(default)]
    form_errors: Vec<FieldError>,
}

#[derive(Deserialize)]
struct FieldError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: String,
}

/// `{"errorMessage": "..."}`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorMessageReply {
    #[serde(default)]
    error_message: String,
}

/// Returns `(code, message)` from the error body.
///
/// Formats are tried in order until one yields a message. A code from an
/// earlier format is kept unless a later format supplies its own.
fn parse_error_body(body: &str) -> (String, String) {
    let mut code = String::new();
    let mut message = String::new();

    if let Ok(reply) = serde_json::from_str::<ResponseCodeReply>(body)
        && reply.success == Some(false)
    {
        code = reply.response_code;
        message = reply.response_msg;
    }

    if message.is_empty()
        && let Ok(reply) = serde_json::from_str::<FormErrorsReply>(body)
        && let Some(first) = reply.form_errors.into_iter().next()
        && !first.msg.is_empty()
    {
        code = first.code;
        message = first.msg;
    }

    if message.is_empty()
        && let Ok(reply) = serde_json::from_str::<ErrorMessageReply>(body)
    {
        message = reply.error_message;
    }

    (code, message)
}
