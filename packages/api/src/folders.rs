//! # Folder lifecycle — listing, create/rename/delete, default-folder invariant
//!
//! Every account owns exactly one protected folder (display name "All",
//! marked by the stored `is_default` flag) that is created at registration and
//! can never be renamed or deleted. Deleting any other folder first moves its
//! notes into the default folder, then removes the folder row, atomically.
//!
//! All operations take a verified [`Principal`] and reach the store only
//! through owner-scoped calls; a folder id belonging to another account is
//! indistinguishable from one that does not exist.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use store::{Folder, Store, StoreError};

use crate::error::{Error, Result};
use crate::models::{FolderInfo, FolderSummary, Principal};

/// Display name given to the protected folder every account owns.
pub const DEFAULT_FOLDER_NAME: &str = "All";

const MAX_FOLDER_NAME_LEN: usize = 50;

#[derive(Clone)]
pub struct FolderService {
    store: Arc<dyn Store>,
}

impl FolderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All folders for the caller, in creation order, with note counts.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<FolderSummary>> {
        let folders = self.store.list_folders(principal.user_id).await?;
        Ok(folders.iter().map(FolderSummary::from).collect())
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<FolderInfo> {
        let folder = self
            .store
            .folder_by_id(principal.user_id, id)
            .await?
            .ok_or(Error::FolderNotFound)?;
        Ok(FolderInfo::from(&folder))
    }

    pub async fn create(&self, principal: &Principal, name: &str) -> Result<FolderInfo> {
        let name = validate_name(name)?;
        if self
            .store
            .folder_by_name(principal.user_id, name)
            .await?
            .is_some()
        {
            return Err(Error::FolderNameTaken);
        }

        let folder = match self.store.create_folder(principal.user_id, name, false).await {
            Ok(folder) => folder,
            Err(StoreError::FolderNameTaken) => return Err(Error::FolderNameTaken),
            Err(e) => return Err(e.into()),
        };
        info!(user = %principal.user_id, folder = %folder.id, "created folder");
        Ok(FolderInfo::from(&folder))
    }

    pub async fn rename(&self, principal: &Principal, id: Uuid, name: &str) -> Result<FolderInfo> {
        let name = validate_name(name)?;
        let existing = self
            .store
            .folder_by_id(principal.user_id, id)
            .await?
            .ok_or(Error::FolderNotFound)?;
        if existing.is_default {
            return Err(Error::DefaultFolderProtected);
        }
        if let Some(other) = self.store.folder_by_name(principal.user_id, name).await? {
            if other.id != id {
                return Err(Error::FolderNameTaken);
            }
        }

        let folder = match self.store.rename_folder(principal.user_id, id, name).await {
            Ok(Some(folder)) => folder,
            Ok(None) => return Err(Error::FolderNotFound),
            Err(StoreError::FolderNameTaken) => return Err(Error::FolderNameTaken),
            Err(e) => return Err(e.into()),
        };
        Ok(FolderInfo::from(&folder))
    }

    /// Delete a folder. Its notes are moved into the default folder and the
    /// row removed in one store transaction; if the default folder cannot be
    /// located the delete is aborted with nothing mutated. Returns the number
    /// of notes moved.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<u64> {
        let folder = self
            .store
            .folder_by_id(principal.user_id, id)
            .await?
            .ok_or(Error::FolderNotFound)?;
        if folder.is_default {
            return Err(Error::DefaultFolderProtected);
        }
        let default = self
            .store
            .default_folder(principal.user_id)
            .await?
            .ok_or(Error::DefaultFolderMissing)?;

        let moved = self
            .store
            .delete_folder_reassign_notes(principal.user_id, id, default.id)
            .await?
            .ok_or(Error::FolderNotFound)?;
        info!(user = %principal.user_id, folder = %id, moved, "deleted folder");
        Ok(moved)
    }

    /// Idempotent: return the account's default folder, creating it when
    /// absent. Invoked once at registration; safe to call repeatedly.
    pub async fn ensure_default_folder(&self, owner: Uuid) -> Result<Folder> {
        if let Some(folder) = self.store.default_folder(owner).await? {
            return Ok(folder);
        }
        match self
            .store
            .create_folder(owner, DEFAULT_FOLDER_NAME, true)
            .await
        {
            Ok(folder) => {
                debug!(user = %owner, "created default folder");
                Ok(folder)
            }
            // Lost a creation race, or the name is squatted by a regular
            // folder; a default that appeared in the meantime wins.
            Err(StoreError::FolderNameTaken) => match self.store.default_folder(owner).await? {
                Some(folder) => Ok(folder),
                None => Err(Error::FolderNameTaken),
            },
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::FolderNameRequired);
    }
    if name.chars().count() > MAX_FOLDER_NAME_LEN {
        return Err(Error::FolderNameTooLong);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{MemoryStore, NewUser};

    async fn setup() -> (Arc<MemoryStore>, FolderService, Principal) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                name: "A".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let service = FolderService::new(store.clone());
        service.ensure_default_folder(user.id).await.unwrap();
        let principal = Principal {
            user_id: user.id,
            email: user.email,
            name: user.name,
        };
        (store, service, principal)
    }

    #[tokio::test]
    async fn test_ensure_default_folder_is_idempotent() {
        let (_, service, principal) = setup().await;
        let first = service.ensure_default_folder(principal.user_id).await.unwrap();
        let second = service.ensure_default_folder(principal.user_id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.name, DEFAULT_FOLDER_NAME);
        assert!(first.is_default);

        let defaults: Vec<_> = service
            .list(&principal)
            .await
            .unwrap()
            .into_iter()
            .filter(|f| f.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
    }

    #[tokio::test]
    async fn test_create_validations() {
        let (_, service, principal) = setup().await;

        assert!(matches!(
            service.create(&principal, "   ").await,
            Err(Error::FolderNameRequired)
        ));
        assert!(matches!(
            service.create(&principal, &"x".repeat(51)).await,
            Err(Error::FolderNameTooLong)
        ));

        service.create(&principal, "Work").await.unwrap();
        assert!(matches!(
            service.create(&principal, "Work").await,
            Err(Error::FolderNameTaken)
        ));
        // Case-sensitive match: a different casing is a different folder.
        service.create(&principal, "work").await.unwrap();
    }

    #[tokio::test]
    async fn test_default_folder_cannot_be_renamed_or_deleted() {
        let (_, service, principal) = setup().await;
        let default = service.ensure_default_folder(principal.user_id).await.unwrap();

        assert!(matches!(
            service.rename(&principal, default.id, "Everything").await,
            Err(Error::DefaultFolderProtected)
        ));
        assert!(matches!(
            service.delete(&principal, default.id).await,
            Err(Error::DefaultFolderProtected)
        ));
    }

    #[tokio::test]
    async fn test_rename_rejects_duplicate_but_allows_self() {
        let (_, service, principal) = setup().await;
        let work = service.create(&principal, "Work").await.unwrap();
        service.create(&principal, "Home").await.unwrap();

        let work_id = work.id.parse().unwrap();
        assert!(matches!(
            service.rename(&principal, work_id, "Home").await,
            Err(Error::FolderNameTaken)
        ));
        // Renaming to its own current name is not a conflict.
        let same = service.rename(&principal, work_id, "Work").await.unwrap();
        assert_eq!(same.name, "Work");
    }

    #[tokio::test]
    async fn test_delete_moves_notes_and_conserves_counts() {
        let (store, service, principal) = setup().await;
        let default = service.ensure_default_folder(principal.user_id).await.unwrap();
        let work = service.create(&principal, "Work").await.unwrap();
        let work_id: Uuid = work.id.parse().unwrap();

        for i in 0..3 {
            store
                .create_note(principal.user_id, work_id, &format!("n{i}"), "body")
                .await
                .unwrap();
        }
        store
            .create_note(principal.user_id, default.id, "existing", "body")
            .await
            .unwrap();

        let default_before = store
            .list_notes(principal.user_id, Some(default.id))
            .await
            .unwrap()
            .len();

        let moved = service.delete(&principal, work_id).await.unwrap();
        assert_eq!(moved, 3);

        let default_after = store
            .list_notes(principal.user_id, Some(default.id))
            .await
            .unwrap()
            .len();
        assert_eq!(default_after - default_before, 3);
        assert!(matches!(
            service.get(&principal, work_id).await,
            Err(Error::FolderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_aborts_when_default_folder_missing() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                email: "broken@x.com".to_string(),
                name: "B".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let service = FolderService::new(store.clone());
        let principal = Principal {
            user_id: user.id,
            email: user.email,
            name: user.name,
        };

        // Account in the degraded state: no default folder was ever created.
        let work = service.create(&principal, "Work").await.unwrap();
        let work_id: Uuid = work.id.parse().unwrap();
        store
            .create_note(principal.user_id, work_id, "n", "body")
            .await
            .unwrap();

        assert!(matches!(
            service.delete(&principal, work_id).await,
            Err(Error::DefaultFolderMissing)
        ));
        // Nothing was mutated.
        assert!(service.get(&principal, work_id).await.is_ok());
        assert_eq!(
            store
                .list_notes(principal.user_id, Some(work_id))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_foreign_folder_is_invisible() {
        let (store, service, principal) = setup().await;
        let work = service.create(&principal, "Work").await.unwrap();
        let work_id: Uuid = work.id.parse().unwrap();

        // A second account on the same store.
        let other_user = store
            .create_user(NewUser {
                email: "b@x.com".to_string(),
                name: "B".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        service.ensure_default_folder(other_user.id).await.unwrap();
        let other = Principal {
            user_id: other_user.id,
            email: other_user.email,
            name: other_user.name,
        };

        assert!(matches!(
            service.get(&other, work_id).await,
            Err(Error::FolderNotFound)
        ));
        assert!(matches!(
            service.rename(&other, work_id, "Mine").await,
            Err(Error::FolderNotFound)
        ));
        assert!(matches!(
            service.delete(&other, work_id).await,
            Err(Error::FolderNotFound)
        ));
        // The real owner still sees it.
        assert!(service.get(&principal, work_id).await.is_ok());
    }
}
