//! # Domain records for users, folders, notes, and tasks
//!
//! Defines the data structures exchanged with [`crate::Store`] backends. These are
//! the full persistence-side records; client-safe projections (without password
//! hashes and with stringified ids) live in the `api` crate.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`User`] | An account row. Carries the unique email, optional Argon2 password hash (absent for OAuth-only accounts), and the optional per-provider external ids (`google_id`, `github_id`, each unique when present). |
//! | [`NewUser`] | The fields a caller supplies when creating a user; ids and timestamps are assigned by the backend. |
//! | [`Folder`] | A per-user folder. `is_default` marks the single protected folder every account owns; it is a stored flag, not derived from the name. |
//! | [`FolderWithCount`] | A folder annotated with the number of notes it currently contains, as returned by folder listings. |
//! | [`Note`] / [`NoteWithFolder`] | A note row, and the read-path shape that joins in the owning folder's `{id, name}`. |
//! | [`Task`] | A todo item with an optional description and a `completed` flag. |

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Third-party identity providers supported for federated login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full user record.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The external id this user carries for `provider`, if linked.
    pub fn provider_id(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google_id.as_deref(),
            Provider::Github => self.github_id.as_deref(),
        }
    }
}

/// Fields supplied when creating a user.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
}

/// A per-user folder.
#[derive(Clone, Debug, PartialEq)]
pub struct Folder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A folder together with the number of notes it contains.
#[derive(Clone, Debug, PartialEq)]
pub struct FolderWithCount {
    pub folder: Folder,
    pub note_count: i64,
}

/// The `{id, name}` of a note's owning folder, as embedded in note reads.
#[derive(Clone, Debug, PartialEq)]
pub struct FolderRef {
    pub id: Uuid,
    pub name: String,
}

/// A note row.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folder_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A note joined with its owning folder.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteWithFolder {
    pub note: Note,
    pub folder: FolderRef,
}

/// A todo item.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
