//! # API crate — the backend core
//!
//! Owner-scoped resource management and identity handling for a multi-tenant
//! personal productivity backend: folders, notes, and tasks behind
//! password-based and federated (Google/GitHub) authentication. The HTTP
//! transport is not here — every operation takes a verified [`Principal`] (or
//! raw credentials, for the auth entry points) and returns a typed
//! [`Result`]; the transport layer maps [`ErrorKind`]s to status codes.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`accounts`] | Registration, password login, federated login, the token gate |
//! | [`auth`] | Argon2 password hashing, JWT session tokens, OAuth provider clients, identity reconciliation |
//! | [`config`] | Environment-backed process configuration |
//! | [`db`] | PostgreSQL connection pool, migrations, and the `store::Store` implementation |
//! | [`folders`] | Folder lifecycle: default-folder invariant, rename/delete protection, cascade delete |
//! | [`models`] | Client-safe projections (`UserInfo`, `FolderInfo`, ...) |
//! | [`notes`] | Note validation, title derivation, owner-scoped CRUD |
//! | [`tasks`] | Task validation, status filtering, atomic completion toggle |
//!
//! Persistence is injected: services hold an `Arc<dyn store::Store>`, which is
//! [`db::PgStore`] in production and `store::MemoryStore` in tests.

use std::sync::Arc;

use chrono::Duration;

use store::Store;

pub mod accounts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod folders;
pub mod models;
pub mod notes;
pub mod tasks;

pub use accounts::{AuthOutcome, AuthService, Warning};
pub use auth::{GitHubOAuth, GoogleOAuth, OAuthProfile, TokenCodec};
pub use config::{Config, OAuthCredentials};
pub use error::{Error, ErrorKind, Result};
pub use folders::FolderService;
pub use models::{FolderInfo, FolderSummary, NoteInfo, Principal, TaskInfo, UserInfo};
pub use notes::NoteService;
pub use tasks::{TaskService, TaskStatus, TaskToggle};

/// Every service wired to one dependency-injected store handle.
pub struct App {
    pub auth: AuthService,
    pub folders: FolderService,
    pub notes: NoteService,
    pub tasks: TaskService,
}

impl App {
    /// Wire the services to an existing store. Tests pass a
    /// `store::MemoryStore`; [`App::connect`] passes a [`db::PgStore`].
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        let tokens = TokenCodec::new(
            &config.token_secret,
            Duration::hours(config.token_ttl_hours),
        );
        Self {
            auth: AuthService::new(store.clone(), tokens),
            folders: FolderService::new(store.clone()),
            notes: NoteService::new(store.clone()),
            tasks: TaskService::new(store),
        }
    }

    /// Connect to PostgreSQL, apply migrations, and wire the services.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.database_url)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        db::migrate(&pool)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        Ok(Self::new(Arc::new(db::PgStore::new(pool)), config))
    }
}
