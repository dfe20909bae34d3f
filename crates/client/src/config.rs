//! Client configuration.
//!
//! Stored as TOML, for example:
//!
//! ```toml
//! domain = "acme.egnyte.com"
//! access_token = "..."
//! chunk_size = 10485760
//! upload_concurrency = 8
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::upload::{DEFAULT_UPLOAD_CONCURRENCY, UploadOptions};

/// Connection and upload settings for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Authority of the API, e.g. `acme.egnyte.com`.
    pub domain: String,

    /// OAuth bearer token.
    #[serde(default)]
    pub access_token: String,

    /// Value of the `Egnyte-Client-Id` header; `rust-sdk` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,

    /// Use plain HTTP instead of HTTPS.
    #[serde(default)]
    pub insecure: bool,

    /// Chunk size for chunked uploads, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of chunks uploaded in parallel.
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
}

fn default_chunk_size() -> usize {
    egnyte_transfer::DEFAULT_CHUNK_SIZE
}

fn default_upload_concurrency() -> usize {
    DEFAULT_UPLOAD_CONCURRENCY
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            access_token: String::new(),
            client_id: String::new(),
            insecure: false,
            chunk_size: default_chunk_size(),
            upload_concurrency: default_upload_concurrency(),
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Saves the configuration as TOML, readable only by the owner on Unix.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // The file holds a bearer token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Upload options derived from this configuration.
    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            chunk_size: self.chunk_size,
            concurrency: self.upload_concurrency,
            ..Default::default()
        }
    }
}
