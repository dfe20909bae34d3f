//! Async client for the Egnyte public REST API.
//!
//! Every call funnels through [`Client`]: it resolves the target URL,
//! attaches the default headers, sends the request and normalizes the
//! server's several error payload shapes into one [`ApiError`].
//! Listing endpoints are driven to completion by [`pagination`], and large
//! files go through [`Client::chunked_upload`], which pulls chunks from an
//! [`egnyte_transfer::ChunkSequencer`] across a pool of worker tasks.

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod filesystem;
pub mod groups;
pub mod pagination;
pub mod permissions;
pub mod request;
pub mod types;
pub mod upload;
pub mod users;

#[cfg(test)]
pub(crate) mod mock;

pub use auth::{OAuthEndpoint, oauth_endpoint};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, Error};
pub use pagination::{PAGE_SIZE, Page, PageWindow, paginate};
pub use request::{Reply, RequestSpec};
pub use types::{
    EventCursor, FileInfo, FolderPermission, Group, GroupMember, Object, User, UserGroup,
    UserInfo, UserName,
};
pub use upload::{DEFAULT_UPLOAD_CONCURRENCY, UploadOptions, UploadOutcome, UploadSession};
