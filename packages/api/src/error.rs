//! # Error taxonomy for core operations
//!
//! Every operation in this crate returns [`Result<T>`]: a success payload or one
//! of the named failures below. The transport layer is solely responsible for
//! mapping these onto protocol status codes; [`Error::kind`] gives it the
//! coarse class to map on without matching every variant.
//!
//! Two policies are encoded here rather than left to callers:
//!
//! - Absent and not-owned records produce the same `*NotFound` variant, so a
//!   caller can never learn whether an id exists under another account.
//! - Store failures that are not a recognised conflict stay opaque: they pass
//!   through as [`Error::Store`] and must never be shown verbatim to clients.

use thiserror::Error;

use store::StoreError;

/// Coarse classification used by the transport layer for status mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape or length; user-correctable.
    Validation,
    /// Record absent or owned by another account; deliberately merged.
    NotFound,
    /// Duplicate name or identity.
    Conflict,
    /// Default-folder protection or inconsistent account state.
    Invariant,
    /// Bad credentials or an invalid/expired token.
    Auth,
    /// The OAuth provider delivered an unusable profile or exchange.
    UpstreamIdentity,
    /// Store or other internal failure; opaque to clients.
    Persistence,
}

#[derive(Debug, Error)]
pub enum Error {
    // validation
    #[error("invalid email format")]
    InvalidEmail,
    #[error("password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("name is required")]
    NameRequired,
    #[error("folder name is required")]
    FolderNameRequired,
    #[error("folder name must be at most 50 characters")]
    FolderNameTooLong,
    #[error("note content is required")]
    NoteContentRequired,
    #[error("note content must be at most 10000 characters")]
    NoteContentTooLong,
    #[error("note title must be at most 200 characters")]
    NoteTitleTooLong,
    #[error("task title is required")]
    TaskTitleRequired,
    #[error("task title must be at most 200 characters")]
    TaskTitleTooLong,
    #[error("task description must be at most 1000 characters")]
    TaskDescriptionTooLong,
    #[error(r#"invalid status filter: must be "active" or "completed""#)]
    InvalidStatusFilter,

    // not found / forbidden, merged
    #[error("user not found")]
    UserNotFound,
    #[error("folder not found")]
    FolderNotFound,
    #[error("note not found")]
    NoteNotFound,
    #[error("task not found")]
    TaskNotFound,

    // conflict
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("a folder with this name already exists")]
    FolderNameTaken,

    // invariant
    #[error("the default folder cannot be renamed or deleted")]
    DefaultFolderProtected,
    #[error("default folder is missing for this account")]
    DefaultFolderMissing,

    // auth
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,

    // upstream identity
    #[error("unusable OAuth profile: {0}")]
    MalformedProfile(&'static str),
    #[error("invalid or expired OAuth state")]
    InvalidOAuthState,
    #[error("OAuth exchange failed: {0}")]
    OAuthExchange(String),

    // persistence / internal
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidEmail
            | Error::PasswordTooShort
            | Error::NameRequired
            | Error::FolderNameRequired
            | Error::FolderNameTooLong
            | Error::NoteContentRequired
            | Error::NoteContentTooLong
            | Error::NoteTitleTooLong
            | Error::TaskTitleRequired
            | Error::TaskTitleTooLong
            | Error::TaskDescriptionTooLong
            | Error::InvalidStatusFilter => ErrorKind::Validation,

            Error::UserNotFound
            | Error::FolderNotFound
            | Error::NoteNotFound
            | Error::TaskNotFound => ErrorKind::NotFound,

            Error::EmailTaken | Error::FolderNameTaken => ErrorKind::Conflict,

            Error::DefaultFolderProtected | Error::DefaultFolderMissing => ErrorKind::Invariant,

            Error::InvalidCredentials | Error::InvalidToken => ErrorKind::Auth,

            Error::MalformedProfile(_) | Error::InvalidOAuthState | Error::OAuthExchange(_) => {
                ErrorKind::UpstreamIdentity
            }

            Error::Store(StoreError::EmailTaken) => ErrorKind::Conflict,
            Error::Store(StoreError::ProviderIdTaken) => ErrorKind::Conflict,
            Error::Store(StoreError::FolderNameTaken) => ErrorKind::Conflict,
            Error::Store(StoreError::Backend(_)) | Error::Internal(_) => ErrorKind::Persistence,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
