//! Group management.

use serde::Serialize;

use crate::client::Client;
use crate::endpoints;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::types::{Group, GroupMember};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGroup<'a> {
    display_name: &'a str,
    members: &'a [GroupMember],
}

impl Client {
    /// Lists the domain's custom groups. Built-in groups are not included.
    pub async fn list_groups(&self) -> Result<Vec<Group>, Error> {
        self.list_all(endpoints::GROUPS).await
    }

    /// Fetches a group with its members.
    pub async fn get_group(&self, id: &str) -> Result<Group, Error> {
        self.execute(RequestSpec::get(endpoints::join(endpoints::GROUPS, id)))
            .await
    }

    pub async fn create_group(&self, name: &str, members: &[GroupMember]) -> Result<Group, Error> {
        let spec = RequestSpec::post(endpoints::GROUPS).json(&CreateGroup {
            display_name: name,
            members,
        })?;
        self.execute(spec).await
    }

    pub async fn delete_group(&self, id: &str) -> Result<(), Error> {
        self.send(RequestSpec::delete(endpoints::join(endpoints::GROUPS, id)))
            .await?;
        Ok(())
    }
}
