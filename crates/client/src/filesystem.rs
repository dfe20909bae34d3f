//! File and folder operations.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::Client;
use crate::endpoints;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::types::{FileInfo, Object};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S";

#[derive(Serialize)]
struct CreateFolder {
    action: &'static str,
}

/// Formats a timestamp the way `Last-Modified` expects it.
pub(crate) fn format_http_date(time: &DateTime<Utc>) -> String {
    format!("{} GMT", time.format(HTTP_DATE))
}

fn parse_http_date(value: &str) -> Result<DateTime<Utc>, Error> {
    let trimmed = value.trim().trim_end_matches("GMT").trim_end();
    NaiveDateTime::parse_from_str(trimmed, HTTP_DATE)
        .map(|t| t.and_utc())
        .map_err(|e| Error::Timestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_epoch_millis(millis: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp(millis.div_euclid(1000), 0).ok_or_else(|| Error::Timestamp {
        value: millis.to_string(),
        reason: "out of range".into(),
    })
}

impl Object {
    /// Fills `modified` on this object and its listed children.
    ///
    /// Objects that carry no timestamp at all are left as `None`.
    pub fn parse_mod_time(&mut self) -> Result<(), Error> {
        if self.is_folder {
            self.parse_folder_time()?;
        } else {
            self.parse_file_time()?;
        }
        for folder in &mut self.folders {
            folder.parse_folder_time()?;
        }
        for file in self.files.iter_mut().chain(self.versions.iter_mut()) {
            file.parse_file_time()?;
        }
        Ok(())
    }

    fn parse_file_time(&mut self) -> Result<(), Error> {
        if !self.last_modified_text.is_empty() {
            self.modified = Some(parse_http_date(&self.last_modified_text)?);
        }
        Ok(())
    }

    fn parse_folder_time(&mut self) -> Result<(), Error> {
        if self.last_modified_millis != 0 {
            self.modified = Some(parse_epoch_millis(self.last_modified_millis)?);
        }
        Ok(())
    }
}

impl Client {
    /// Lists a folder, or describes a file and its versions.
    pub async fn list(&self, path: &str) -> Result<Object, Error> {
        let spec = RequestSpec::get(endpoints::join(endpoints::FS, path));
        let mut object: Object = self.execute(spec).await?;
        object.parse_mod_time()?;
        Ok(object)
    }

    pub async fn create_folder(&self, path: &str) -> Result<Object, Error> {
        let spec = RequestSpec::post(endpoints::join(endpoints::FS, path)).json(&CreateFolder {
            action: "add_folder",
        })?;
        let mut object: Object = self.execute(spec).await?;
        object.is_folder = true;
        if object.path.is_empty() {
            object.path = path.to_string();
        }
        Ok(object)
    }

    /// Uploads a file in a single request.
    pub async fn create_file(
        &self,
        path: &str,
        body: impl Into<reqwest::Body>,
        modified: DateTime<Utc>,
    ) -> Result<FileInfo, Error> {
        let spec = RequestSpec::post(endpoints::join(endpoints::FS_CONTENT, path))
            .header("Last-Modified", format_http_date(&modified))
            .body(body);
        let reply = self.send(spec).await?;
        Ok(FileInfo {
            path: path.to_string(),
            checksum: reply
                .header("X-Sha512-Checksum")
                .unwrap_or_default()
                .to_string(),
            etag: reply.header("Etag").unwrap_or_default().to_string(),
            modified,
        })
    }

    /// Opens a file for download; `entry_id` selects a specific version.
    ///
    /// The returned response streams the content and must be consumed or
    /// dropped by the caller.
    pub async fn download(
        &self,
        path: &str,
        entry_id: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let spec = with_entry_id(
            RequestSpec::get(endpoints::join(endpoints::FS_CONTENT, path)),
            entry_id,
        )
        .keep_body_open();
        self.send(spec)
            .await?
            .into_body()
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "response body was released",
                ))
            })
    }

    /// Streams a file into `writer`, returning the byte count.
    pub async fn download_to<W>(
        &self,
        path: &str,
        entry_id: Option<&str>,
        writer: &mut W,
    ) -> Result<u64, Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut resp = self.download(path, entry_id).await?;
        let mut written = 0u64;
        while let Some(bytes) = resp.chunk().await? {
            writer.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }
        writer.flush().await?;
        tracing::debug!(path, bytes = written, "download complete");
        Ok(written)
    }

    /// Deletes a file or folder; `entry_id` deletes a single file version.
    pub async fn delete(&self, path: &str, entry_id: Option<&str>) -> Result<(), Error> {
        let spec = with_entry_id(
            RequestSpec::delete(endpoints::join(endpoints::FS, path)),
            entry_id,
        );
        self.send(spec).await?;
        Ok(())
    }
}

fn with_entry_id(spec: RequestSpec, entry_id: Option<&str>) -> RequestSpec {
    match entry_id.filter(|id| !id.is_empty()) {
        Some(id) => spec.query("entry_id", id),
        None => spec,
    }
}
