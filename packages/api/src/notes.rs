//! # Notes — content validation, title derivation, owner-scoped CRUD
//!
//! A note always lives in exactly one of its owner's folders. Content is
//! required (trimmed, at most 10 000 characters); the title is either supplied
//! explicitly (trimmed, at most 200 characters) or derived from the content:
//! the first five whitespace-separated words joined by single spaces, cut to
//! 47 characters plus an ellipsis when the join runs past 50.
//!
//! Moving a note to a different folder on update goes through the same
//! ownership check as every other folder reference; omitting the folder keeps
//! the current one.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use store::Store;

use crate::error::{Error, Result};
use crate::models::{NoteInfo, Principal};

const MAX_TITLE_LEN: usize = 200;
const MAX_NOTE_CONTENT_LEN: usize = 10_000;
/// How many leading words of the content seed a derived title.
const TITLE_WORD_COUNT: usize = 5;
const MAX_DERIVED_TITLE_LEN: usize = 50;
const TITLE_TRUNCATE_AT: usize = 47;

#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn Store>,
}

impl NoteService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The caller's notes, most recently updated first, optionally restricted
    /// to one folder.
    pub async fn list(&self, principal: &Principal, folder: Option<Uuid>) -> Result<Vec<NoteInfo>> {
        let notes = self.store.list_notes(principal.user_id, folder).await?;
        Ok(notes.iter().map(NoteInfo::from).collect())
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<NoteInfo> {
        let note = self
            .store
            .note_by_id(principal.user_id, id)
            .await?
            .ok_or(Error::NoteNotFound)?;
        Ok(NoteInfo::from(&note))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        folder_id: Uuid,
        title: Option<&str>,
        content: &str,
    ) -> Result<NoteInfo> {
        let content = validate_content(content)?;
        if self
            .store
            .folder_by_id(principal.user_id, folder_id)
            .await?
            .is_none()
        {
            return Err(Error::FolderNotFound);
        }

        let title = resolve_title(title, content)?;
        let note = self
            .store
            .create_note(principal.user_id, folder_id, &title, content)
            .await?;
        info!(user = %principal.user_id, note = %note.note.id, "created note");
        Ok(NoteInfo::from(&note))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        title: Option<&str>,
        content: &str,
        folder: Option<Uuid>,
    ) -> Result<NoteInfo> {
        let content = validate_content(content)?;
        let existing = self
            .store
            .note_by_id(principal.user_id, id)
            .await?
            .ok_or(Error::NoteNotFound)?;

        let target_folder = match folder {
            Some(folder_id) if folder_id != existing.note.folder_id => {
                if self
                    .store
                    .folder_by_id(principal.user_id, folder_id)
                    .await?
                    .is_none()
                {
                    return Err(Error::FolderNotFound);
                }
                folder_id
            }
            Some(folder_id) => folder_id,
            None => existing.note.folder_id,
        };

        let title = resolve_title(title, content)?;
        let note = self
            .store
            .update_note(principal.user_id, id, &title, content, target_folder)
            .await?
            .ok_or(Error::NoteNotFound)?;
        Ok(NoteInfo::from(&note))
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<()> {
        if !self.store.delete_note(principal.user_id, id).await? {
            return Err(Error::NoteNotFound);
        }
        Ok(())
    }
}

fn validate_content(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::NoteContentRequired);
    }
    if content.chars().count() > MAX_NOTE_CONTENT_LEN {
        return Err(Error::NoteContentTooLong);
    }
    Ok(content)
}

/// Explicit titles are trimmed and length-checked; blank ones are derived
/// from the content.
fn resolve_title(title: Option<&str>, content: &str) -> Result<String> {
    match title.map(str::trim) {
        Some(title) if !title.is_empty() => {
            if title.chars().count() > MAX_TITLE_LEN {
                return Err(Error::NoteTitleTooLong);
            }
            Ok(title.to_string())
        }
        _ => Ok(derive_title(content)),
    }
}

fn derive_title(content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        // Content is validated before this point; the fallback only guards
        // the function itself.
        return format!("Note from {}", Utc::now().format("%Y-%m-%d"));
    }

    let joined = content
        .split_whitespace()
        .take(TITLE_WORD_COUNT)
        .collect::<Vec<_>>()
        .join(" ");
    if joined.chars().count() > MAX_DERIVED_TITLE_LEN {
        let head: String = joined.chars().take(TITLE_TRUNCATE_AT).collect();
        format!("{head}...")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{MemoryStore, NewUser};

    async fn setup() -> (Arc<MemoryStore>, NoteService, Principal, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                name: "A".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let folder = store.create_folder(user.id, "All", true).await.unwrap();
        let service = NoteService::new(store.clone());
        let principal = Principal {
            user_id: user.id,
            email: user.email,
            name: user.name,
        };
        (store, service, principal, folder.id)
    }

    #[test]
    fn test_derive_title_takes_first_five_words() {
        assert_eq!(
            derive_title("Buy milk and eggs today please"),
            "Buy milk and eggs today"
        );
        assert_eq!(derive_title("  one   two  "), "one two");
    }

    #[test]
    fn test_derive_title_truncates_long_joins() {
        let content = "supercalifragilistic expialidocious pneumonoultramicroscopic silicovolcanoconiosis words";
        let title = derive_title(content);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_derive_title_blank_content_falls_back_to_date() {
        assert!(derive_title("   ").starts_with("Note from "));
    }

    #[tokio::test]
    async fn test_create_with_blank_title_derives_one() {
        let (_, service, principal, folder) = setup().await;
        let note = service
            .create(
                &principal,
                folder,
                Some(""),
                "Buy milk and eggs today please",
            )
            .await
            .unwrap();
        assert_eq!(note.title, "Buy milk and eggs today");
        assert_eq!(note.content, "Buy milk and eggs today please");
    }

    #[tokio::test]
    async fn test_content_validations() {
        let (_, service, principal, folder) = setup().await;

        assert!(matches!(
            service.create(&principal, folder, None, "   ").await,
            Err(Error::NoteContentRequired)
        ));
        assert!(matches!(
            service
                .create(&principal, folder, None, &"x".repeat(10_001))
                .await,
            Err(Error::NoteContentTooLong)
        ));
        assert!(matches!(
            service
                .create(&principal, folder, Some(&"t".repeat(201)), "content")
                .await,
            Err(Error::NoteTitleTooLong)
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_folder() {
        let (store, service, principal, _) = setup().await;
        let stranger = store
            .create_user(NewUser {
                email: "b@x.com".to_string(),
                name: "B".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let foreign = store
            .create_folder(stranger.id, "Theirs", true)
            .await
            .unwrap();

        assert!(matches!(
            service.create(&principal, foreign.id, None, "content").await,
            Err(Error::FolderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_moves_note_only_into_owned_folder() {
        let (store, service, principal, folder) = setup().await;
        let note = service
            .create(&principal, folder, Some("Title"), "content")
            .await
            .unwrap();
        let note_id: Uuid = note.id.parse().unwrap();

        let second = store
            .create_folder(principal.user_id, "Work", false)
            .await
            .unwrap();
        let moved = service
            .update(&principal, note_id, Some("Title"), "content", Some(second.id))
            .await
            .unwrap();
        assert_eq!(moved.folder.name, "Work");

        // Omitting the folder keeps the current one.
        let kept = service
            .update(&principal, note_id, Some("Title"), "new content", None)
            .await
            .unwrap();
        assert_eq!(kept.folder.name, "Work");
        assert_eq!(kept.content, "new content");

        let foreign = Uuid::new_v4();
        assert!(matches!(
            service
                .update(&principal, note_id, None, "content", Some(foreign))
                .await,
            Err(Error::FolderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_notes_are_owner_scoped() {
        let (store, service, principal, folder) = setup().await;
        let note = service
            .create(&principal, folder, Some("Mine"), "content")
            .await
            .unwrap();
        let note_id: Uuid = note.id.parse().unwrap();

        let stranger = store
            .create_user(NewUser {
                email: "b@x.com".to_string(),
                name: "B".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let other = Principal {
            user_id: stranger.id,
            email: stranger.email,
            name: stranger.name,
        };

        assert!(matches!(
            service.get(&other, note_id).await,
            Err(Error::NoteNotFound)
        ));
        assert!(matches!(
            service.delete(&other, note_id).await,
            Err(Error::NoteNotFound)
        ));
        assert!(service.get(&principal, note_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_orders_by_most_recent_update() {
        let (_, service, principal, folder) = setup().await;
        let first = service
            .create(&principal, folder, Some("first"), "content")
            .await
            .unwrap();
        let second = service
            .create(&principal, folder, Some("second"), "content")
            .await
            .unwrap();

        // Touch the older note; it moves to the front.
        let first_id: Uuid = first.id.parse().unwrap();
        service
            .update(&principal, first_id, Some("first"), "edited", None)
            .await
            .unwrap();

        let notes = service.list(&principal, None).await.unwrap();
        assert_eq!(notes[0].id, first.id);
        assert_eq!(notes[1].id, second.id);
    }
}
