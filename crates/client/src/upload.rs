//! Chunked upload driver.
//!
//! Chunk 1 is sent alone so the server can assign an upload id. Middle
//! chunks are then pulled from the shared [`ChunkSequencer`] by a pool of
//! worker tasks and uploaded in parallel. The final chunk is held back by
//! the sequencer and sent last, flagged with `X-Egnyte-Last-Chunk`, once
//! every worker has finished.

use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use egnyte_transfer::{Chunk, ChunkSequencer, TransferError, checksum_bytes};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::Client;
use crate::endpoints;
use crate::error::Error;
use crate::filesystem::format_http_date;
use crate::request::{Reply, RequestSpec};

/// Default number of chunks uploaded in parallel.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

const UPLOAD_ID_HEADER: &str = "X-Egnyte-Upload-Id";
const CHUNK_NUM_HEADER: &str = "X-Egnyte-Chunk-Num";
const CHUNK_CHECKSUM_HEADER: &str = "X-Egnyte-Chunk-Sha512-Checksum";
const LAST_CHUNK_HEADER: &str = "X-Egnyte-Last-Chunk";
const FILE_CHECKSUM_HEADER: &str = "X-Sha512-Checksum";

/// Tuning for [`Client::chunked_upload`].
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Chunk size in bytes; 0 selects the default.
    pub chunk_size: usize,
    /// Worker tasks for the middle chunks; 0 is treated as 1.
    pub concurrency: usize,
    /// Sent as `Last-Modified` with the final chunk.
    pub modified: Option<DateTime<Utc>>,
    pub cancel: Option<CancellationToken>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: egnyte_transfer::DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            modified: None,
            cancel: None,
        }
    }
}

/// Result of a completed chunked upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub path: String,
    /// Server-assigned upload id; empty if a single-chunk upload got none.
    pub upload_id: String,
    pub chunks: usize,
    /// Per-chunk SHA-512 digests concatenated in chunk order.
    pub checksum: String,
    /// Whole-file SHA-512 reported with the final chunk, if any.
    pub server_checksum: Option<String>,
}

/// State of one chunked upload: destination, server-assigned id and the
/// sequencer that owns the source stream.
pub struct UploadSession<R> {
    path: String,
    upload_id: Mutex<Option<String>>,
    sequencer: ChunkSequencer<R>,
}

impl<R: Read> UploadSession<R> {
    pub fn new(path: impl Into<String>, source: R, total_size: u64, chunk_size: usize) -> Self {
        Self {
            path: path.into(),
            upload_id: Mutex::new(None),
            sequencer: ChunkSequencer::new(source, total_size, chunk_size),
        }
    }
}

impl<R> UploadSession<R> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The cached upload id, once the server has assigned one.
    pub fn upload_id(&self) -> Option<String> {
        self.upload_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sequencer(&self) -> &ChunkSequencer<R> {
        &self.sequencer
    }

    /// Caches the upload id from a chunk reply.
    ///
    /// A missing or empty id is ignored. The first id received is kept for
    /// the rest of the session; a different one is a conflict.
    pub fn accept_upload_id(&self, received: Option<&str>) -> Result<(), Error> {
        let Some(received) = received.filter(|id| !id.is_empty()) else {
            return Ok(());
        };
        let mut cached = self
            .upload_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match cached.as_deref() {
            None => {
                *cached = Some(received.to_string());
                Ok(())
            }
            Some(id) if id == received => Ok(()),
            Some(id) => Err(Error::UploadIdConflict {
                cached: id.to_string(),
                received: received.to_string(),
            }),
        }
    }
}

impl Client {
    /// Uploads `total_size` bytes from `source` to `path` in chunks.
    ///
    /// Zero-length content has no chunks to send and is rejected with
    /// [`Error::EmptyUpload`]; use [`Client::create_file`] instead. Any
    /// failure aborts the remaining workers.
    pub async fn chunked_upload<R>(
        &self,
        path: &str,
        source: R,
        total_size: u64,
        options: UploadOptions,
    ) -> Result<UploadOutcome, Error>
    where
        R: Read + Send + 'static,
    {
        if total_size == 0 {
            return Err(Error::EmptyUpload);
        }

        let cancel = options.cancel.clone().unwrap_or_default();
        let session = Arc::new(UploadSession::new(
            path,
            source,
            total_size,
            options.chunk_size,
        ));
        let uri = endpoints::join(endpoints::FS_CONTENT_CHUNKED, path);

        check_cancelled(&cancel)?;
        let (first, digest) = read_chunk(&session).await?;
        if first.is_empty() {
            return Err(Error::EmptyUpload);
        }

        // A one-chunk upload goes straight to the final request.
        if !first.is_last() {
            let index = first.index;
            self.upload_chunk(&session, &uri, first, &digest, &cancel)
                .await?;
            if session.upload_id().is_none() {
                return Err(Error::MissingUploadId);
            }

            let mut workers = JoinSet::new();
            for _ in 0..options.concurrency.max(1) {
                let client = self.clone();
                let session = Arc::clone(&session);
                let uri = uri.clone();
                let cancel = cancel.clone();
                workers.spawn(async move { client.upload_worker(session, uri, cancel).await });
            }
            debug!(path, chunk = index, "first chunk accepted, workers started");

            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined? {
                    workers.abort_all();
                    return Err(e);
                }
            }
        }

        check_cancelled(&cancel)?;
        let last = session.sequencer().last_chunk().ok_or_else(|| {
            Error::StreamRead(TransferError::Truncated {
                remaining: session.sequencer().remaining(),
            })
        })?;
        let digest = checksum_bytes(&last.data);

        let mut spec = chunk_request(&uri, last.chunk_count, &digest, session.upload_id(), last.data)
            .header(LAST_CHUNK_HEADER, "true");
        if let Some(modified) = options.modified {
            spec = spec.header("Last-Modified", format_http_date(&modified));
        }
        let reply = send_cancellable(self, spec, &cancel).await?;
        session.accept_upload_id(reply.header(UPLOAD_ID_HEADER))?;
        session.sequencer().record_digest(last.chunk_count, digest);

        let outcome = UploadOutcome {
            path: path.to_string(),
            upload_id: session.upload_id().unwrap_or_default(),
            chunks: last.chunk_count,
            checksum: session.sequencer().final_digest(),
            server_checksum: reply.header(FILE_CHECKSUM_HEADER).map(str::to_string),
        };
        info!(
            path,
            upload_id = %outcome.upload_id,
            chunks = outcome.chunks,
            "chunked upload complete"
        );
        Ok(outcome)
    }

    /// Pulls and uploads middle chunks until the sequencer hands out the
    /// final chunk or runs dry.
    async fn upload_worker<R>(
        &self,
        session: Arc<UploadSession<R>>,
        uri: String,
        cancel: CancellationToken,
    ) -> Result<(), Error>
    where
        R: Read + Send + 'static,
    {
        loop {
            check_cancelled(&cancel)?;
            let (chunk, digest) = read_chunk(&session).await?;
            if chunk.is_empty() || chunk.is_last() {
                return Ok(());
            }
            self.upload_chunk(&session, &uri, chunk, &digest, &cancel)
                .await?;
        }
    }

    /// Sends one non-final chunk and records its digest once acknowledged.
    async fn upload_chunk<R>(
        &self,
        session: &UploadSession<R>,
        uri: &str,
        chunk: Chunk,
        digest: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let index = chunk.index;
        let size = chunk.len();
        let spec = chunk_request(uri, index, digest, session.upload_id(), chunk.data);
        let reply = send_cancellable(self, spec, cancel).await?;
        session.accept_upload_id(reply.header(UPLOAD_ID_HEADER))?;
        session.sequencer().record_digest(index, digest);
        debug!(path = session.path(), chunk = index, size, "chunk uploaded");
        Ok(())
    }
}

/// Reads the next chunk on the blocking pool and digests it there.
async fn read_chunk<R>(session: &Arc<UploadSession<R>>) -> Result<(Chunk, String), Error>
where
    R: Read + Send + 'static,
{
    let session = Arc::clone(session);
    let (chunk, digest) = tokio::task::spawn_blocking(move || {
        let chunk = session.sequencer().next_chunk()?;
        let digest = if chunk.is_empty() {
            String::new()
        } else {
            checksum_bytes(&chunk.data)
        };
        Ok::<_, TransferError>((chunk, digest))
    })
    .await??;
    Ok((chunk, digest))
}

fn chunk_request(
    uri: &str,
    index: usize,
    digest: &str,
    upload_id: Option<String>,
    data: Vec<u8>,
) -> RequestSpec {
    let mut spec = RequestSpec::post(uri)
        .header(CHUNK_NUM_HEADER, index.to_string())
        .header(CHUNK_CHECKSUM_HEADER, digest)
        .body(data);
    if let Some(id) = upload_id {
        spec = spec.header(UPLOAD_ID_HEADER, id);
    }
    spec
}

async fn send_cancellable(
    client: &Client,
    spec: RequestSpec,
    cancel: &CancellationToken,
) -> Result<Reply, Error> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        reply = client.send(spec) => reply,
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), Error> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockServer, RecordedRequest};
    use chrono::TimeZone;
    use std::io::Cursor;

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn options(chunk_size: usize, concurrency: usize) -> UploadOptions {
        UploadOptions {
            chunk_size,
            concurrency,
            ..Default::default()
        }
    }

    fn chunk_num(req: &RecordedRequest) -> usize {
        req.header(CHUNK_NUM_HEADER).unwrap().parse().unwrap()
    }

    fn expected_checksum(data: &[u8], chunk_size: usize) -> String {
        data.chunks(chunk_size).map(checksum_bytes).collect()
    }

    fn accepting_server() -> impl Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static {
        |req| {
            let mut resp = MockResponse::json("").with_header(UPLOAD_ID_HEADER, "up-1");
            if req.header(LAST_CHUNK_HEADER).is_some() {
                resp = resp.with_header(FILE_CHECKSUM_HEADER, "server-sum");
            }
            resp
        }
    }

    #[test]
    fn session_caches_first_upload_id() {
        let session = UploadSession::new("/Shared/a", Cursor::new(Vec::new()), 0, 4);
        assert_eq!(session.upload_id(), None);

        session.accept_upload_id(None).unwrap();
        session.accept_upload_id(Some("")).unwrap();
        assert_eq!(session.upload_id(), None);

        session.accept_upload_id(Some("up-1")).unwrap();
        session.accept_upload_id(Some("up-1")).unwrap();
        session.accept_upload_id(None).unwrap();
        assert_eq!(session.upload_id().as_deref(), Some("up-1"));
    }

    #[test]
    fn session_rejects_different_upload_id() {
        let session = UploadSession::new("/Shared/a", Cursor::new(Vec::new()), 0, 4);
        session.accept_upload_id(Some("up-1")).unwrap();

        let err = session.accept_upload_id(Some("up-2")).unwrap_err();
        match err {
            Error::UploadIdConflict { cached, received } => {
                assert_eq!(cached, "up-1");
                assert_eq!(received, "up-2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.upload_id().as_deref(), Some("up-1"));
    }

    #[tokio::test]
    async fn three_chunk_upload() {
        let server = MockServer::start(accepting_server()).await;
        let content = data(10);

        let outcome = server
            .client()
            .chunked_upload(
                "/Shared/big.bin",
                Cursor::new(content.clone()),
                10,
                options(4, 4),
            )
            .await
            .unwrap();

        assert_eq!(outcome.path, "/Shared/big.bin");
        assert_eq!(outcome.upload_id, "up-1");
        assert_eq!(outcome.chunks, 3);
        assert_eq!(outcome.checksum, expected_checksum(&content, 4));
        assert_eq!(outcome.server_checksum.as_deref(), Some("server-sum"));

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        for req in &requests {
            assert_eq!(req.method, "POST");
            assert_eq!(req.path(), "/pubapi/v1/fs-content-chunked/Shared/big.bin");
            assert_eq!(
                req.header(CHUNK_CHECKSUM_HEADER),
                Some(checksum_bytes(&req.body).as_str())
            );
        }

        let first = &requests[0];
        assert_eq!(chunk_num(first), 1);
        assert_eq!(first.header(UPLOAD_ID_HEADER), None);
        assert_eq!(first.body, content[..4]);

        let last = &requests[2];
        assert_eq!(chunk_num(last), 3);
        assert_eq!(last.header(LAST_CHUNK_HEADER), Some("true"));
        assert_eq!(last.header(UPLOAD_ID_HEADER), Some("up-1"));
        assert_eq!(last.body, content[8..]);
        assert_eq!(last.header("last-modified"), None);
    }

    #[tokio::test]
    async fn parallel_upload_sends_every_chunk_once() {
        let server = MockServer::start(accepting_server()).await;
        let content = data(100);

        let outcome = server
            .client()
            .chunked_upload("/Shared/many", Cursor::new(content.clone()), 100, options(7, 4))
            .await
            .unwrap();

        assert_eq!(outcome.chunks, 15);
        assert_eq!(outcome.checksum, expected_checksum(&content, 7));

        let mut requests = server.requests();
        assert_eq!(requests.len(), 15);
        assert_eq!(chunk_num(&requests[0]), 1);
        assert_eq!(chunk_num(requests.last().unwrap()), 15);
        assert_eq!(
            requests
                .iter()
                .filter(|r| r.header(LAST_CHUNK_HEADER).is_some())
                .count(),
            1
        );

        requests.sort_by_key(chunk_num);
        let nums: Vec<usize> = requests.iter().map(chunk_num).collect();
        assert_eq!(nums, (1..=15).collect::<Vec<_>>());
        let reassembled: Vec<u8> = requests.iter().flat_map(|r| r.body.clone()).collect();
        assert_eq!(reassembled, content);
    }

    #[tokio::test]
    async fn single_chunk_goes_straight_to_final_request() {
        let server = MockServer::start(accepting_server()).await;
        let modified = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let outcome = server
            .client()
            .chunked_upload(
                "/Shared/small.txt",
                Cursor::new(b"abc".to_vec()),
                3,
                UploadOptions {
                    chunk_size: 4,
                    modified: Some(modified),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.chunks, 1);
        assert_eq!(outcome.checksum, checksum_bytes(b"abc"));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(chunk_num(&requests[0]), 1);
        assert_eq!(requests[0].header(LAST_CHUNK_HEADER), Some("true"));
        assert_eq!(requests[0].header(UPLOAD_ID_HEADER), None);
        assert_eq!(
            requests[0].header("last-modified"),
            Some("Tue, 02 Jan 2024 03:04:05 GMT")
        );
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let server = MockServer::start(accepting_server()).await;
        let err = server
            .client()
            .chunked_upload("/Shared/empty", Cursor::new(Vec::new()), 0, options(4, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyUpload));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn changed_upload_id_is_a_conflict() {
        let server = MockServer::start(|req| {
            let id = if chunk_num(req) == 1 { "up-1" } else { "up-2" };
            MockResponse::json("").with_header(UPLOAD_ID_HEADER, id)
        })
        .await;

        let err = server
            .client()
            .chunked_upload("/Shared/x", Cursor::new(data(12)), 12, options(4, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UploadIdConflict { .. }));
        assert!(
            server
                .requests()
                .iter()
                .all(|r| r.header(LAST_CHUNK_HEADER).is_none())
        );
    }

    #[tokio::test]
    async fn missing_upload_id_after_first_chunk() {
        let server = MockServer::start(|_| MockResponse::json("")).await;

        let err = server
            .client()
            .chunked_upload("/Shared/x", Cursor::new(data(12)), 12, options(4, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingUploadId));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn server_error_aborts_upload() {
        let server = MockServer::start(|req| {
            if chunk_num(req) == 2 {
                MockResponse::status(500, r#"{"errorMessage": "disk full"}"#)
            } else {
                MockResponse::json("").with_header(UPLOAD_ID_HEADER, "up-1")
            }
        })
        .await;

        let err = server
            .client()
            .chunked_upload("/Shared/x", Cursor::new(data(20)), 20, options(4, 1))
            .await
            .unwrap_err();

        let api = err.api().expect("server error");
        assert_eq!(api.status, 500);
        assert_eq!(api.message, "disk full");
        assert!(
            server
                .requests()
                .iter()
                .all(|r| r.header(LAST_CHUNK_HEADER).is_none())
        );
    }

    #[tokio::test]
    async fn truncated_source_fails() {
        let server = MockServer::start(accepting_server()).await;

        let err = server
            .client()
            .chunked_upload("/Shared/x", Cursor::new(data(6)), 10, options(4, 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::StreamRead(TransferError::Truncated { remaining: 4 })
        ));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let server = MockServer::start(accepting_server()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = server
            .client()
            .chunked_upload(
                "/Shared/x",
                Cursor::new(data(12)),
                12,
                UploadOptions {
                    chunk_size: 4,
                    cancel: Some(cancel),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn cancelled_mid_upload() {
        let cancel = CancellationToken::new();
        let server = MockServer::start({
            let cancel = cancel.clone();
            move |req| {
                if chunk_num(req) == 2 {
                    cancel.cancel();
                }
                MockResponse::json("").with_header(UPLOAD_ID_HEADER, "up-1")
            }
        })
        .await;

        let err = server
            .client()
            .chunked_upload(
                "/Shared/x",
                Cursor::new(data(40)),
                40,
                UploadOptions {
                    chunk_size: 4,
                    concurrency: 1,
                    cancel: Some(cancel),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        let requests = server.requests();
        assert!(requests.len() < 10);
        assert!(requests.iter().all(|r| r.header(LAST_CHUNK_HEADER).is_none()));
    }
}
