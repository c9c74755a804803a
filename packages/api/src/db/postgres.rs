//! # `PgStore` — the PostgreSQL implementation of the repository contract
//!
//! Every accessor keeps the owner check inside the SQL itself (`WHERE id = $2
//! AND user_id = $1`), so an id owned by another account is indistinguishable
//! from a missing row, and a concurrent mutation can never be observed between
//! a fetch and a check. The folder delete cascade runs inside one transaction;
//! the task toggle is a single `completed = NOT completed` update.
//!
//! Uniqueness conflicts are translated from constraint names into the typed
//! `StoreError` variants the identity and folder layers act on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use store::{
    Folder, FolderRef, FolderWithCount, NewUser, Note, NoteWithFolder, Provider, Store,
    StoreError, StoreResult, Task, User,
};

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn folder_ref(&self, folder_id: Uuid) -> StoreResult<FolderRef> {
        let row: (Uuid, String) = sqlx::query_as("SELECT id, name FROM folders WHERE id = $1")
            .bind(folder_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(FolderRef {
            id: row.0,
            name: row.1,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: Option<String>,
    google_id: Option<String>,
    github_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            google_id: row.google_id,
            github_id: row.github_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct FolderRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FolderRow> for Folder {
    fn from(row: FolderRow) -> Self {
        Folder {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct FolderCountRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    note_count: i64,
}

impl From<FolderCountRow> for FolderWithCount {
    fn from(row: FolderCountRow) -> Self {
        FolderWithCount {
            folder: Folder {
                id: row.id,
                user_id: row.user_id,
                name: row.name,
                is_default: row.is_default,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            note_count: row.note_count,
        }
    }
}

#[derive(FromRow)]
struct NoteRow {
    id: Uuid,
    user_id: Uuid,
    folder_id: Uuid,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    folder_name: String,
}

impl From<NoteRow> for NoteWithFolder {
    fn from(row: NoteRow) -> Self {
        NoteWithFolder {
            folder: FolderRef {
                id: row.folder_id,
                name: row.folder_name,
            },
            note: Note {
                id: row.id,
                user_id: row.user_id,
                folder_id: row.folder_id,
                title: row.title,
                content: row.content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(dbe) = &e {
        if dbe.is_unique_violation() {
            return match dbe.constraint() {
                Some("users_email_key") => StoreError::EmailTaken,
                Some("users_google_id_key") | Some("users_github_id_key") => {
                    StoreError::ProviderIdTaken
                }
                Some("folders_user_id_name_key") | Some("folders_one_default_per_user") => {
                    StoreError::FolderNameTaken
                }
                _ => StoreError::Backend(e.to_string()),
            };
        }
    }
    StoreError::Backend(e.to_string())
}

const NOTE_COLUMNS: &str =
    "n.id, n.user_id, n.folder_id, n.title, n.content, n.created_at, n.updated_at, \
     f.name AS folder_name";

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (email, name, password_hash, google_id, github_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.github_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.into())
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn user_by_provider(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> StoreResult<Option<User>> {
        let sql = match provider {
            Provider::Google => "SELECT * FROM users WHERE google_id = $1",
            Provider::Github => "SELECT * FROM users WHERE github_id = $1",
        };
        let row: Option<UserRow> = sqlx::query_as(sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn link_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
        external_id: &str,
    ) -> StoreResult<User> {
        let sql = match provider {
            Provider::Google => {
                "UPDATE users SET google_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
            Provider::Github => {
                "UPDATE users SET github_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
        };
        let row: UserRow = sqlx::query_as(sql)
            .bind(user_id)
            .bind(external_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.into())
    }

    async fn create_folder(
        &self,
        owner: Uuid,
        name: &str,
        is_default: bool,
    ) -> StoreResult<Folder> {
        let row: FolderRow = sqlx::query_as(
            r#"
            INSERT INTO folders (user_id, name, is_default)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(name)
        .bind(is_default)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.into())
    }

    async fn folder_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Folder>> {
        let row: Option<FolderRow> =
            sqlx::query_as("SELECT * FROM folders WHERE id = $2 AND user_id = $1")
                .bind(owner)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn folder_by_name(&self, owner: Uuid, name: &str) -> StoreResult<Option<Folder>> {
        let row: Option<FolderRow> =
            sqlx::query_as("SELECT * FROM folders WHERE user_id = $1 AND name = $2")
                .bind(owner)
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn default_folder(&self, owner: Uuid) -> StoreResult<Option<Folder>> {
        let row: Option<FolderRow> =
            sqlx::query_as("SELECT * FROM folders WHERE user_id = $1 AND is_default")
                .bind(owner)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_folders(&self, owner: Uuid) -> StoreResult<Vec<FolderWithCount>> {
        let rows: Vec<FolderCountRow> = sqlx::query_as(
            r#"
            SELECT f.*, COUNT(n.id) AS note_count
            FROM folders f
            LEFT JOIN notes n ON n.folder_id = f.id
            WHERE f.user_id = $1
            GROUP BY f.id
            ORDER BY f.created_at ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn rename_folder(
        &self,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Folder>> {
        let row: Option<FolderRow> = sqlx::query_as(
            r#"
            UPDATE folders SET name = $3, updated_at = NOW()
            WHERE id = $2 AND user_id = $1
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn delete_folder_reassign_notes(
        &self,
        owner: Uuid,
        id: Uuid,
        default_id: Uuid,
    ) -> StoreResult<Option<u64>> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let moved = sqlx::query(
            r#"
            UPDATE notes SET folder_id = $3, updated_at = NOW()
            WHERE folder_id = $2 AND user_id = $1
            "#,
        )
        .bind(owner)
        .bind(id)
        .bind(default_id)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM folders WHERE id = $2 AND user_id = $1")
            .bind(owner)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await.map_err(map_err)?;
            return Ok(None);
        }
        tx.commit().await.map_err(map_err)?;
        Ok(Some(moved))
    }

    async fn create_note(
        &self,
        owner: Uuid,
        folder_id: Uuid,
        title: &str,
        content: &str,
    ) -> StoreResult<NoteWithFolder> {
        let row: Note = sqlx::query_as::<_, BareNoteRow>(
            r#"
            INSERT INTO notes (user_id, folder_id, title, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(folder_id)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?
        .into();
        let folder = self.folder_ref(row.folder_id).await?;
        Ok(NoteWithFolder { note: row, folder })
    }

    async fn note_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<NoteWithFolder>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes n JOIN folders f ON f.id = n.folder_id \
             WHERE n.id = $2 AND n.user_id = $1"
        );
        let row: Option<NoteRow> = sqlx::query_as(&sql)
            .bind(owner)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_notes(
        &self,
        owner: Uuid,
        folder: Option<Uuid>,
    ) -> StoreResult<Vec<NoteWithFolder>> {
        let rows: Vec<NoteRow> = match folder {
            Some(folder_id) => {
                let sql = format!(
                    "SELECT {NOTE_COLUMNS} FROM notes n JOIN folders f ON f.id = n.folder_id \
                     WHERE n.user_id = $1 AND n.folder_id = $2 ORDER BY n.updated_at DESC"
                );
                sqlx::query_as(&sql)
                    .bind(owner)
                    .bind(folder_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_err)?
            }
            None => {
                let sql = format!(
                    "SELECT {NOTE_COLUMNS} FROM notes n JOIN folders f ON f.id = n.folder_id \
                     WHERE n.user_id = $1 ORDER BY n.updated_at DESC"
                );
                sqlx::query_as(&sql)
                    .bind(owner)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_err)?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_note(
        &self,
        owner: Uuid,
        id: Uuid,
        title: &str,
        content: &str,
        folder_id: Uuid,
    ) -> StoreResult<Option<NoteWithFolder>> {
        let row: Option<Note> = sqlx::query_as::<_, BareNoteRow>(
            r#"
            UPDATE notes SET title = $3, content = $4, folder_id = $5, updated_at = NOW()
            WHERE id = $2 AND user_id = $1
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .map(Into::into);

        match row {
            Some(note) => {
                let folder = self.folder_ref(note.folder_id).await?;
                Ok(Some(NoteWithFolder { note, folder }))
            }
            None => Ok(None),
        }
    }

    async fn delete_note(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM notes WHERE id = $2 AND user_id = $1")
            .bind(owner)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn create_task(
        &self,
        owner: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> StoreResult<Task> {
        let row: TaskRow = sqlx::query_as(
            r#"
            INSERT INTO tasks (user_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.into())
    }

    async fn task_by_id(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let row: Option<TaskRow> =
            sqlx::query_as("SELECT * FROM tasks WHERE id = $2 AND user_id = $1")
                .bind(owner)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_tasks(&self, owner: Uuid, completed: Option<bool>) -> StoreResult<Vec<Task>> {
        let rows: Vec<TaskRow> = match completed {
            Some(completed) => sqlx::query_as(
                "SELECT * FROM tasks WHERE user_id = $1 AND completed = $2 \
                 ORDER BY completed ASC, created_at DESC",
            )
            .bind(owner)
            .bind(completed)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?,
            None => sqlx::query_as(
                "SELECT * FROM tasks WHERE user_id = $1 \
                 ORDER BY completed ASC, created_at DESC",
            )
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?,
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> StoreResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            UPDATE tasks SET title = $3, description = $4, updated_at = NOW()
            WHERE id = $2 AND user_id = $1
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn toggle_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            UPDATE tasks SET completed = NOT completed, updated_at = NOW()
            WHERE id = $2 AND user_id = $1
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(Into::into))
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM tasks WHERE id = $2 AND user_id = $1")
            .bind(owner)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn save_oauth_state(
        &self,
        state: &str,
        provider: Provider,
        pkce_verifier: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_states (state, provider, pkce_verifier, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(state)
        .bind(provider.as_str())
        .bind(pkce_verifier)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn consume_oauth_state(
        &self,
        state: &str,
        provider: Provider,
    ) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM oauth_states
            WHERE state = $1 AND provider = $2 AND expires_at > NOW()
            RETURNING pkce_verifier
            "#,
        )
        .bind(state)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(|(verifier,)| verifier))
    }
}

/// A note row without the joined folder name (insert/update paths).
#[derive(FromRow)]
struct BareNoteRow {
    id: Uuid,
    user_id: Uuid,
    folder_id: Uuid,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BareNoteRow> for Note {
    fn from(row: BareNoteRow) -> Self {
        Note {
            id: row.id,
            user_id: row.user_id,
            folder_id: row.folder_id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
