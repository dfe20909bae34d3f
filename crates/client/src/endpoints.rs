//! API paths.

pub const FS: &str = "/pubapi/v1/fs";
pub const FS_CONTENT: &str = "/pubapi/v1/fs-content";
pub const FS_CONTENT_CHUNKED: &str = "/pubapi/v1/fs-content-chunked";
pub const EVENTS_CURSOR: &str = "/pubapi/v1/events/cursor";
pub const GROUPS: &str = "/pubapi/v2/groups";
pub const USERS: &str = "/pubapi/v2/users";
pub const USERINFO: &str = "/pubapi/v1/userinfo";
pub const PERMS: &str = "/pubapi/v2/perms";
pub const OAUTH_TOKEN: &str = "/puboauth/token";

/// Appends a filesystem path to an endpoint prefix with exactly one `/`
/// between them.
pub fn join(prefix: &str, path: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
