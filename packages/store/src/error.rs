//! `StoreError` taxonomy and the `StoreResult` alias returned by every
//! [`crate::Store`] accessor.

use thiserror::Error;

/// Errors a [`crate::Store`] backend can surface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with the given email already exists.
    #[error("email already taken")]
    EmailTaken,
    /// A user is already linked to the given provider identity.
    #[error("provider id already taken")]
    ProviderIdTaken,
    /// A folder with the given name already exists for the owner.
    #[error("folder name already taken")]
    FolderNameTaken,
    /// An opaque backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result alias for [`crate::Store`] operations.
pub type StoreResult<T> = Result<T, StoreError>;
