//! API request and response types.
//!
//! Sequence and map fields are plain `Vec`/`BTreeMap` so that empty
//! collections always serialize as `[]`/`{}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A file or folder.
///
/// Files report their modification time as an HTTP date in
/// `last_modified`, folders as epoch milliseconds in `lastModified`;
/// [`Client::list`](crate::Client::list) parses either into `modified`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(default)]
    pub uploaded: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub checksum: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub entry_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub group_id: String,
    #[serde(default, rename = "last_modified", deserialize_with = "null_default")]
    pub last_modified_text: String,
    #[serde(default, rename = "lastModified")]
    pub last_modified_millis: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub uploaded_by: String,
    #[serde(default)]
    pub num_versions: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub parent_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub folder_id: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub restrict_move_delete: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub public_links: String,
    #[serde(default)]
    pub allow_links: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub folders: Vec<Object>,
    #[serde(default, deserialize_with = "null_default")]
    pub files: Vec<Object>,
    #[serde(default, deserialize_with = "null_default")]
    pub versions: Vec<Object>,
    /// Parsed modification time.
    #[serde(skip)]
    pub modified: Option<DateTime<Utc>>,
}

/// Result of a single-request file upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub path: String,
    /// SHA-512 of the stored content, as reported by the server.
    pub checksum: String,
    pub etag: String,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserName {
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub given_name: String,
}

/// Group reference embedded in a [`User`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub user_name: String,
    /// Immutable identifier chosen by the API consumer.
    #[serde(default, deserialize_with = "null_default")]
    pub external_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: UserName,
    #[serde(default)]
    pub active: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub created_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub last_modification_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub last_active_date: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub auth_type: String,
    #[serde(default)]
    pub user_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub idp_user_id: String,
    #[serde(default)]
    pub is_service_account: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub language: String,
    #[serde(default)]
    pub delete_on_expiry: serde_json::Value,
    #[serde(default)]
    pub email_change_pending: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub expiry_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_default")]
    pub user_principal_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub groups: Vec<UserGroup>,
}

/// Response of the userinfo endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default)]
    pub username: String,
    #[serde(rename = "value")]
    pub id: i64,
    #[serde(default)]
    pub display: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub members: Vec<GroupMember>,
}

/// Permissions on a folder, keyed by user or group name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPermission {
    #[serde(default, deserialize_with = "null_default")]
    pub user_perms: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_default")]
    pub group_perms: BTreeMap<String, String>,
    #[serde(default)]
    pub inherits_permissions: bool,
    #[serde(default)]
    pub keep_parent_permissions: bool,
}

/// Position in the domain's event stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCursor {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub latest_event_id: i64,
    #[serde(default)]
    pub oldest_event_id: i64,
}

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
