use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Folder, FolderRef, FolderWithCount, NewUser, Note, NoteWithFolder, Provider, Task, User,
};
use crate::repo::Store;

/// In-memory [`Store`] for testing and embedded use.
///
/// All tables live behind a single mutex, so multi-row mutations (the folder
/// delete cascade) are atomic by construction: the lock is held for the whole
/// operation and no await point interleaves with it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    folders: HashMap<Uuid, Folder>,
    notes: HashMap<Uuid, Note>,
    tasks: HashMap<Uuid, Task>,
    oauth_states: HashMap<String, OAuthState>,
}

struct OAuthState {
    provider: Provider,
    pkce_verifier: String,
    expires_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn folder_ref(folder: &Folder) -> FolderRef {
    FolderRef {
        id: folder.id,
        name: folder.name.clone(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.lock().unwrap();

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken);
        }
        for (candidate, provider) in [
            (&user.google_id, Provider::Google),
            (&user.github_id, Provider::Github),
        ] {
            if let Some(id) = candidate {
                if inner
                    .users
                    .values()
                    .any(|u| u.provider_id(provider) == Some(id.as_str()))
                {
                    return Err(StoreError::ProviderIdTaken);
                }
            }
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            google_id: user.google_id,
            github_id: user.github_id,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn user_by_provider(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.provider_id(provider) == Some(external_id))
            .cloned())
    }

    async fn link_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
        external_id: &str,
    ) -> StoreResult<User> {
        let mut inner = self.inner.lock().unwrap();

        if inner
            .users
            .values()
            .any(|u| u.id != user_id && u.provider_id(provider) == Some(external_id))
        {
            return Err(StoreError::ProviderIdTaken);
        }

        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::Backend("link_provider: no such user".into()))?;
        match provider {
            Provider::Google => user.google_id = Some(external_id.to_string()),
            Provider::Github => user.github_id = Some(external_id.to_string()),
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn create_folder(
        &self,
        owner: Uuid,
        name: &str,
        is_default: bool,
    ) -> StoreResult<Folder> {
        let mut inner = self.inner.lock().unwrap();

        if inner
            .folders
            .values()
            .any(|f| f.user_id == owner && f.name == name)
        {
            return Err(StoreError::FolderNameTaken);
        }

        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            user_id: owner,
            name: name.to_string(),
            is_default,
            created_at: now,
            updated_at: now,
        };
        inner.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn folder_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Folder>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .folders
            .get(&id)
            .filter(|f| f.user_id == owner)
            .cloned())
    }

    async fn folder_by_name(&self, owner: Uuid, name: &str) -> StoreResult<Option<Folder>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .folders
            .values()
            .find(|f| f.user_id == owner && f.name == name)
            .cloned())
    }

    async fn default_folder(&self, owner: Uuid) -> StoreResult<Option<Folder>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .folders
            .values()
            .find(|f| f.user_id == owner && f.is_default)
            .cloned())
    }

    async fn list_folders(&self, owner: Uuid) -> StoreResult<Vec<FolderWithCount>> {
        let inner = self.inner.lock().unwrap();
        let mut folders: Vec<FolderWithCount> = inner
            .folders
            .values()
            .filter(|f| f.user_id == owner)
            .map(|f| FolderWithCount {
                note_count: inner.notes.values().filter(|n| n.folder_id == f.id).count() as i64,
                folder: f.clone(),
            })
            .collect();
        folders.sort_by_key(|f| f.folder.created_at);
        Ok(folders)
    }

    async fn rename_folder(
        &self,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Folder>> {
        let mut inner = self.inner.lock().unwrap();

        if inner
            .folders
            .values()
            .any(|f| f.user_id == owner && f.id != id && f.name == name)
        {
            return Err(StoreError::FolderNameTaken);
        }

        let Some(folder) = inner.folders.get_mut(&id).filter(|f| f.user_id == owner) else {
            return Ok(None);
        };
        folder.name = name.to_string();
        folder.updated_at = Utc::now();
        Ok(Some(folder.clone()))
    }

    async fn delete_folder_reassign_notes(
        &self,
        owner: Uuid,
        id: Uuid,
        default_id: Uuid,
    ) -> StoreResult<Option<u64>> {
        let mut inner = self.inner.lock().unwrap();

        if !inner
            .folders
            .get(&id)
            .is_some_and(|f| f.user_id == owner)
        {
            return Ok(None);
        }

        let now = Utc::now();
        let mut moved = 0u64;
        for note in inner.notes.values_mut() {
            if note.folder_id == id {
                note.folder_id = default_id;
                note.updated_at = now;
                moved += 1;
            }
        }
        inner.folders.remove(&id);
        Ok(Some(moved))
    }

    async fn create_note(
        &self,
        owner: Uuid,
        folder_id: Uuid,
        title: &str,
        content: &str,
    ) -> StoreResult<NoteWithFolder> {
        let mut inner = self.inner.lock().unwrap();

        let folder = inner
            .folders
            .get(&folder_id)
            .filter(|f| f.user_id == owner)
            .map(folder_ref)
            .ok_or_else(|| StoreError::Backend("create_note: no such folder".into()))?;

        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: owner,
            folder_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.notes.insert(note.id, note.clone());
        Ok(NoteWithFolder { note, folder })
    }

    async fn note_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<NoteWithFolder>> {
        let inner = self.inner.lock().unwrap();
        let Some(note) = inner.notes.get(&id).filter(|n| n.user_id == owner) else {
            return Ok(None);
        };
        let folder = inner
            .folders
            .get(&note.folder_id)
            .map(folder_ref)
            .ok_or_else(|| StoreError::Backend("note_by_id: dangling folder".into()))?;
        Ok(Some(NoteWithFolder {
            note: note.clone(),
            folder,
        }))
    }

    async fn list_notes(
        &self,
        owner: Uuid,
        folder: Option<Uuid>,
    ) -> StoreResult<Vec<NoteWithFolder>> {
        let inner = self.inner.lock().unwrap();
        let mut notes: Vec<&Note> = inner
            .notes
            .values()
            .filter(|n| n.user_id == owner && folder.is_none_or(|f| n.folder_id == f))
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        notes
            .into_iter()
            .map(|n| {
                let folder = inner
                    .folders
                    .get(&n.folder_id)
                    .map(folder_ref)
                    .ok_or_else(|| StoreError::Backend("list_notes: dangling folder".into()))?;
                Ok(NoteWithFolder {
                    note: n.clone(),
                    folder,
                })
            })
            .collect()
    }

    async fn update_note(
        &self,
        owner: Uuid,
        id: Uuid,
        title: &str,
        content: &str,
        folder_id: Uuid,
    ) -> StoreResult<Option<NoteWithFolder>> {
        let mut inner = self.inner.lock().unwrap();

        let folder = match inner
            .folders
            .get(&folder_id)
            .filter(|f| f.user_id == owner)
            .map(folder_ref)
        {
            Some(f) => f,
            None => return Err(StoreError::Backend("update_note: no such folder".into())),
        };

        let Some(note) = inner.notes.get_mut(&id).filter(|n| n.user_id == owner) else {
            return Ok(None);
        };
        note.title = title.to_string();
        note.content = content.to_string();
        note.folder_id = folder_id;
        note.updated_at = Utc::now();
        Ok(Some(NoteWithFolder {
            note: note.clone(),
            folder,
        }))
    }

    async fn delete_note(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.notes.get(&id).is_some_and(|n| n.user_id == owner) {
            inner.notes.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn create_task(
        &self,
        owner: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> StoreResult<Task> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: owner,
            title: title.to_string(),
            description: description.map(str::to_string),
            completed: false,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn task_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .tasks
            .get(&id)
            .filter(|t| t.user_id == owner)
            .cloned())
    }

    async fn list_tasks(&self, owner: Uuid, completed: Option<bool>) -> StoreResult<Vec<Task>> {
        let inner = self.inner.lock().unwrap();
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.user_id == owner && completed.is_none_or(|c| t.completed == c))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(tasks)
    }

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(task) = inner.tasks.get_mut(&id).filter(|t| t.user_id == owner) else {
            return Ok(None);
        };
        task.title = title.to_string();
        task.description = description.map(str::to_string);
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn toggle_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(task) = inner.tasks.get_mut(&id).filter(|t| t.user_id == owner) else {
            return Ok(None);
        };
        task.completed = !task.completed;
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.tasks.get(&id).is_some_and(|t| t.user_id == owner) {
            inner.tasks.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn save_oauth_state(
        &self,
        state: &str,
        provider: Provider,
        pkce_verifier: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.lock().unwrap().oauth_states.insert(
            state.to_string(),
            OAuthState {
                provider,
                pkce_verifier: pkce_verifier.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn consume_oauth_state(
        &self,
        state: &str,
        provider: Provider,
    ) -> StoreResult<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        let matches = inner
            .oauth_states
            .get(state)
            .is_some_and(|entry| entry.provider == provider);
        if !matches {
            return Ok(None);
        }
        let entry = inner.oauth_states.remove(state).unwrap();
        if entry.expires_at > Utc::now() {
            Ok(Some(entry.pkce_verifier))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                email: email.to_string(),
                name: "Test".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        seed_user(&store, "a@x.com").await;

        let err = store
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                name: "Other".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn test_folder_lookups_are_owner_scoped() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice@x.com").await;
        let bob = seed_user(&store, "bob@x.com").await;

        let folder = store.create_folder(alice.id, "Work", false).await.unwrap();

        assert!(store
            .folder_by_id(alice.id, folder.id)
            .await
            .unwrap()
            .is_some());
        // Same id, wrong owner: indistinguishable from a missing row.
        assert!(store
            .folder_by_id(bob.id, folder.id)
            .await
            .unwrap()
            .is_none());
        assert!(store.rename_folder(bob.id, folder.id, "Stolen").await.unwrap().is_none());
        assert!(store.list_folders(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_folder_moves_notes_to_default() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "a@x.com").await;
        let default = store.create_folder(user.id, "All", true).await.unwrap();
        let work = store.create_folder(user.id, "Work", false).await.unwrap();

        for i in 0..3 {
            store
                .create_note(user.id, work.id, &format!("n{i}"), "body")
                .await
                .unwrap();
        }
        store
            .create_note(user.id, default.id, "keep", "body")
            .await
            .unwrap();

        let moved = store
            .delete_folder_reassign_notes(user.id, work.id, default.id)
            .await
            .unwrap();
        assert_eq!(moved, Some(3));
        assert!(store.folder_by_id(user.id, work.id).await.unwrap().is_none());
        assert_eq!(store.list_notes(user.id, Some(default.id)).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_toggle_task_round_trips() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "a@x.com").await;
        let task = store.create_task(user.id, "Ship it", None).await.unwrap();
        assert!(!task.completed);

        let flipped = store.toggle_task(user.id, task.id).await.unwrap().unwrap();
        assert!(flipped.completed);
        let back = store.toggle_task(user.id, task.id).await.unwrap().unwrap();
        assert!(!back.completed);
    }

    #[tokio::test]
    async fn test_list_tasks_incomplete_first_newest_first() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "a@x.com").await;

        let first = store.create_task(user.id, "first", None).await.unwrap();
        let second = store.create_task(user.id, "second", None).await.unwrap();
        let done = store.create_task(user.id, "done", None).await.unwrap();
        store.toggle_task(user.id, done.id).await.unwrap();

        let tasks = store.list_tasks(user.id, None).await.unwrap();
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id, done.id]);

        let active = store.list_tasks(user.id, Some(false)).await.unwrap();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn test_oauth_state_consumed_once() {
        let store = MemoryStore::new();
        let expires = Utc::now() + Duration::minutes(10);
        store
            .save_oauth_state("abc", Provider::Google, "verifier", expires)
            .await
            .unwrap();

        // Wrong provider does not consume the row.
        assert!(store
            .consume_oauth_state("abc", Provider::Github)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            store
                .consume_oauth_state("abc", Provider::Google)
                .await
                .unwrap()
                .as_deref(),
            Some("verifier")
        );
        assert!(store
            .consume_oauth_state("abc", Provider::Google)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_expired_oauth_state_rejected() {
        let store = MemoryStore::new();
        let expires = Utc::now() - Duration::minutes(1);
        store
            .save_oauth_state("old", Provider::Github, "verifier", expires)
            .await
            .unwrap();
        assert!(store
            .consume_oauth_state("old", Provider::Github)
            .await
            .unwrap()
            .is_none());
    }
}
