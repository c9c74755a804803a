//! # `Store` — the repository contract every backend implements
//!
//! This trait is the single seam between the business layer and persistence. All
//! reads and writes go through it, so the same service logic works against the
//! in-memory backend ([`crate::MemoryStore`], used by tests) or the PostgreSQL
//! adapter in the `api` crate.
//!
//! ## Ownership scoping
//!
//! Every folder/note/task accessor takes the owning user's id and matches it in
//! the same query as the record id. There is deliberately no way to fetch a
//! record by id alone: a lookup that races with a concurrent mutation can never
//! observe another tenant's row, and a caller cannot distinguish "absent" from
//! "owned by someone else" — both are `Ok(None)`.
//!
//! ## Atomicity
//!
//! [`delete_folder_reassign_notes`](Store::delete_folder_reassign_notes) is the
//! one multi-row mutation: backends must reassign the folder's notes and remove
//! the folder row in a single all-or-nothing step. Single-row mutations
//! ([`toggle_task`](Store::toggle_task), [`rename_folder`](Store::rename_folder))
//! must be one atomic update, never a read-then-write round trip.
//!
//! ## Conflicts
//!
//! Uniqueness is enforced here, not only in the service layer: duplicate emails
//! and provider ids surface as [`crate::StoreError::EmailTaken`] /
//! [`crate::StoreError::ProviderIdTaken`], which the identity layer uses to
//! detect lost first-login races.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{Folder, FolderWithCount, NewUser, NoteWithFolder, Provider, Task, User};

#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---

    /// Create a user. Fails with `EmailTaken` / `ProviderIdTaken` on conflicts.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Look up a user by the stable external id a provider assigned them.
    async fn user_by_provider(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> StoreResult<Option<User>>;

    /// Attach `external_id` for `provider` to an existing user, in place.
    async fn link_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
        external_id: &str,
    ) -> StoreResult<User>;

    // --- folders ---

    async fn create_folder(&self, owner: Uuid, name: &str, is_default: bool)
        -> StoreResult<Folder>;

    async fn folder_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Folder>>;

    /// Exact, case-sensitive name match within the owner's folder set.
    async fn folder_by_name(&self, owner: Uuid, name: &str) -> StoreResult<Option<Folder>>;

    /// The owner's protected default folder, if present.
    async fn default_folder(&self, owner: Uuid) -> StoreResult<Option<Folder>>;

    /// All folders for the owner in creation order, each with its note count.
    async fn list_folders(&self, owner: Uuid) -> StoreResult<Vec<FolderWithCount>>;

    /// Atomic rename; `None` when the folder is absent or not owned.
    async fn rename_folder(&self, owner: Uuid, id: Uuid, name: &str)
        -> StoreResult<Option<Folder>>;

    /// Reassign every note in the folder to `default_id`, then delete the
    /// folder row, all in one transaction. Returns the number of notes moved,
    /// or `None` (with nothing mutated) when the folder is absent or not owned.
    async fn delete_folder_reassign_notes(
        &self,
        owner: Uuid,
        id: Uuid,
        default_id: Uuid,
    ) -> StoreResult<Option<u64>>;

    // --- notes ---

    async fn create_note(
        &self,
        owner: Uuid,
        folder_id: Uuid,
        title: &str,
        content: &str,
    ) -> StoreResult<NoteWithFolder>;

    async fn note_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<NoteWithFolder>>;

    /// The owner's notes, most recently updated first, optionally restricted
    /// to one folder.
    async fn list_notes(
        &self,
        owner: Uuid,
        folder: Option<Uuid>,
    ) -> StoreResult<Vec<NoteWithFolder>>;

    async fn update_note(
        &self,
        owner: Uuid,
        id: Uuid,
        title: &str,
        content: &str,
        folder_id: Uuid,
    ) -> StoreResult<Option<NoteWithFolder>>;

    /// Returns whether a row was removed.
    async fn delete_note(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;

    // --- tasks ---

    async fn create_task(
        &self,
        owner: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> StoreResult<Task>;

    async fn task_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    /// The owner's tasks: incomplete first, newest-created first within each
    /// group, optionally filtered by completion state.
    async fn list_tasks(&self, owner: Uuid, completed: Option<bool>) -> StoreResult<Vec<Task>>;

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> StoreResult<Option<Task>>;

    /// Flip `completed` in a single atomic update and return the post-flip row.
    async fn toggle_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;

    // --- oauth handshake state ---

    /// Persist the CSRF state + PKCE verifier for an in-flight authorization.
    async fn save_oauth_state(
        &self,
        state: &str,
        provider: Provider,
        pkce_verifier: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Atomically delete and return the verifier for `state`, iff unexpired.
    async fn consume_oauth_state(
        &self,
        state: &str,
        provider: Provider,
    ) -> StoreResult<Option<String>>;
}
