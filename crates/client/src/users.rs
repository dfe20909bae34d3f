//! User management.

use serde::Serialize;

use crate::client::Client;
use crate::endpoints;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::types::{User, UserInfo, UserName};

const DEFAULT_USER_TYPE: &str = "standard";
const DEFAULT_AUTH_TYPE: &str = "egnyte";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUser<'a> {
    user_name: &'a str,
    external_id: &'a str,
    email: &'a str,
    name: &'a UserName,
    active: bool,
    is_service_account: bool,
    language: &'a str,
    auth_type: &'a str,
    user_type: &'a str,
    role: &'a str,
    idp_user_id: &'a str,
    user_principal_name: &'a str,
    send_invite: bool,
}

impl<'a> CreateUser<'a> {
    fn new(user: &'a User, send_invite: bool) -> Self {
        Self {
            user_name: &user.user_name,
            external_id: &user.external_id,
            email: &user.email,
            name: &user.name,
            active: user.active,
            is_service_account: user.is_service_account,
            language: &user.language,
            auth_type: non_empty_or(&user.auth_type, DEFAULT_AUTH_TYPE),
            user_type: non_empty_or(&user.user_type, DEFAULT_USER_TYPE),
            role: &user.role,
            idp_user_id: &user.idp_user_id,
            user_principal_name: &user.user_principal_name,
            send_invite,
        }
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

fn user_path(id: u64) -> String {
    endpoints::join(endpoints::USERS, &id.to_string())
}

impl Client {
    /// Lists every user in the domain.
    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.list_all(endpoints::USERS).await
    }

    pub async fn get_user(&self, id: u64) -> Result<User, Error> {
        self.execute(RequestSpec::get(user_path(id))).await
    }

    /// Creates a user. Empty `user_type` and `auth_type` default to
    /// `standard` and `egnyte`.
    pub async fn create_user(&self, user: &User, send_invite: bool) -> Result<User, Error> {
        let spec =
            RequestSpec::post(endpoints::USERS).json(&CreateUser::new(user, send_invite))?;
        self.execute(spec).await
    }

    /// Sends the full user record as a partial update.
    pub async fn update_user(&self, user: &User) -> Result<(), Error> {
        let spec = RequestSpec::patch(user_path(user.id)).json(user)?;
        self.send(spec).await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: u64) -> Result<(), Error> {
        self.send(RequestSpec::delete(user_path(id))).await?;
        Ok(())
    }

    /// Identity of the token owner.
    pub async fn userinfo(&self) -> Result<UserInfo, Error> {
        self.execute(RequestSpec::get(endpoints::USERINFO)).await
    }
}
