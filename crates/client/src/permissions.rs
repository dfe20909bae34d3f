//! Folder permissions.
//!
//! Permissions only apply to folders; every operation takes the folder as
//! an [`Object`] and rejects files with [`Error::FolderRequired`].

use std::collections::BTreeMap;

use crate::client::Client;
use crate::endpoints;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::types::{FolderPermission, Object};

/// Permission levels accepted by the server.
pub const VALID_PERMISSIONS: [&str; 4] = ["Viewer", "Editor", "Full", "Owner"];

/// Revokes an existing permission.
pub const PERMISSION_NONE: &str = "None";

pub fn is_valid_permission(permission: &str) -> bool {
    permission == PERMISSION_NONE || VALID_PERMISSIONS.contains(&permission)
}

fn validate(perms: &FolderPermission) -> Result<(), Error> {
    for (name, permission) in perms.user_perms.iter().chain(&perms.group_perms) {
        if !is_valid_permission(permission) {
            return Err(Error::InvalidPermission {
                name: name.clone(),
                permission: permission.clone(),
            });
        }
    }
    Ok(())
}

fn require_folder(object: &Object) -> Result<(), Error> {
    if object.is_folder {
        Ok(())
    } else {
        Err(Error::FolderRequired)
    }
}

impl Client {
    pub async fn get_permissions(&self, folder: &Object) -> Result<FolderPermission, Error> {
        require_folder(folder)?;
        self.execute(RequestSpec::get(endpoints::join(endpoints::PERMS, &folder.path)))
            .await
    }

    /// Applies `perms` to the folder. Nothing is sent if any value is not
    /// a known permission level.
    pub async fn set_permissions(
        &self,
        folder: &Object,
        perms: &FolderPermission,
    ) -> Result<(), Error> {
        require_folder(folder)?;
        validate(perms)?;
        let spec = RequestSpec::post(endpoints::join(endpoints::PERMS, &folder.path)).json(perms)?;
        self.send(spec).await?;
        Ok(())
    }

    pub async fn set_user_permission(
        &self,
        folder: &Object,
        user: &str,
        permission: &str,
    ) -> Result<(), Error> {
        let perms = FolderPermission {
            user_perms: BTreeMap::from([(user.to_string(), permission.to_string())]),
            ..Default::default()
        };
        self.set_permissions(folder, &perms).await
    }

    pub async fn remove_user_permission(&self, folder: &Object, user: &str) -> Result<(), Error> {
        self.set_user_permission(folder, user, PERMISSION_NONE)
            .await
    }

    pub async fn set_group_permission(
        &self,
        folder: &Object,
        group: &str,
        permission: &str,
    ) -> Result<(), Error> {
        let perms = FolderPermission {
            group_perms: BTreeMap::from([(group.to_string(), permission.to_string())]),
            ..Default::default()
        };
        self.set_permissions(folder, &perms).await
    }

    pub async fn remove_group_permission(&self, folder: &Object, group: &str) -> Result<(), Error> {
        self.set_group_permission(folder, group, PERMISSION_NONE)
            .await
    }
}
