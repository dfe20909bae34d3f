//! OAuth scopes and endpoints.
//!
//! Token acquisition is left to the caller's OAuth library; this module
//! only supplies what it needs to talk to a given domain.

use crate::endpoints;

pub const FILESYSTEM_SCOPE: &str = "Egnyte.filesystem";
pub const USER_SCOPE: &str = "Egnyte.user";
pub const GROUP_SCOPE: &str = "Egnyte.group";
pub const PERMISSION_SCOPE: &str = "Egnyte.permission";
pub const LAUNCH_WEB_SESSION_SCOPE: &str = "Egnyte.launchwebsession";

/// Every scope this client can use.
pub const ALL_SCOPES: [&str; 5] = [
    FILESYSTEM_SCOPE,
    USER_SCOPE,
    GROUP_SCOPE,
    PERMISSION_SCOPE,
    LAUNCH_WEB_SESSION_SCOPE,
];

/// Authorization and token URLs for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoint {
    pub auth_url: String,
    pub token_url: String,
}

/// OAuth endpoint of `domain`, or `None` if the domain is empty.
///
/// The server uses the same URL for authorization and token exchange.
pub fn oauth_endpoint(domain: &str) -> Option<OAuthEndpoint> {
    let domain = domain.trim();
    if domain.is_empty() {
        return None;
    }
    let url = format!("https://{domain}{}", endpoints::OAUTH_TOKEN);
    Some(OAuthEndpoint {
        auth_url: url.clone(),
        token_url: url,
    })
}
