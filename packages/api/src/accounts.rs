//! # Accounts — registration, password login, federated login, token gate
//!
//! [`AuthService`] owns every operation that turns credentials into a session:
//!
//! - [`register`](AuthService::register) validates the input, hashes the
//!   password, creates the user, and best-effort creates the default folder.
//!   A failed folder creation is logged and reported through the outcome's
//!   `warnings` — never fatal to the registration itself.
//! - [`login`](AuthService::login) collapses unknown email, OAuth-only
//!   account, and wrong password into one `invalid credentials` failure.
//! - [`login_oauth`](AuthService::login_oauth) runs the reconciliation engine
//!   over a provider profile, then behaves like a login (including the
//!   default-folder backstop for accounts created via OAuth).
//! - [`authenticate`](AuthService::authenticate) is the gate every protected
//!   operation passes through: token in, verified [`Principal`] out.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use store::{NewUser, Provider, Store, StoreError};

use crate::auth::{self, OAuthProfile, TokenCodec};
use crate::error::{Error, Result};
use crate::folders::FolderService;
use crate::models::{Principal, UserInfo};

const MIN_PASSWORD_LEN: usize = 6;

/// Non-fatal degradations reported alongside a successful auth operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// The account exists but its default folder could not be created.
    DefaultFolderUnavailable,
}

/// A successful registration or login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub user: UserInfo,
    pub token: String,
    pub warnings: Vec<Warning>,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: TokenCodec,
    folders: FolderService,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenCodec) -> Self {
        Self {
            folders: FolderService::new(store.clone()),
            store,
            tokens,
        }
    }

    /// Register a password account and issue its first session token.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthOutcome> {
        let email = email.trim().to_lowercase();
        let name = name.trim();

        if !email_is_valid(&email) {
            return Err(Error::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::PasswordTooShort);
        }
        if name.is_empty() {
            return Err(Error::NameRequired);
        }

        if self.store.user_by_email(&email).await?.is_some() {
            return Err(Error::EmailTaken);
        }

        let password_hash =
            auth::hash_password(password).map_err(|e| Error::Internal(e.to_string()))?;
        let user = match self
            .store
            .create_user(NewUser {
                email,
                name: name.to_string(),
                password_hash: Some(password_hash),
                ..NewUser::default()
            })
            .await
        {
            Ok(user) => user,
            Err(StoreError::EmailTaken) => return Err(Error::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        let warnings = self.backstop_default_folder(user.id).await;
        let token = self.tokens.issue(&user)?;
        Ok(AuthOutcome {
            user: UserInfo::from(&user),
            token,
            warnings,
        })
    }

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.store.user_by_email(&email).await? else {
            return Err(Error::InvalidCredentials);
        };
        // An OAuth-only account fails exactly like a wrong password.
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(Error::InvalidCredentials);
        };
        let valid =
            auth::verify_password(password, hash).map_err(|e| Error::Internal(e.to_string()))?;
        if !valid {
            return Err(Error::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        Ok(AuthOutcome {
            user: UserInfo::from(&user),
            token,
            warnings: Vec::new(),
        })
    }

    /// Complete a federated login: reconcile the profile onto a local
    /// account, then mint a session token for it.
    pub async fn login_oauth(
        &self,
        provider: Provider,
        profile: &OAuthProfile,
    ) -> Result<AuthOutcome> {
        let user = auth::resolve(self.store.as_ref(), provider, profile).await?;

        let warnings = self.backstop_default_folder(user.id).await;
        let token = self.tokens.issue(&user)?;
        Ok(AuthOutcome {
            user: UserInfo::from(&user),
            token,
            warnings,
        })
    }

    /// Verify a bearer token. Every protected operation must pass through
    /// here before touching any owner-scoped store call.
    pub fn authenticate(&self, token: &str) -> Result<Principal> {
        self.tokens.verify(token)
    }

    /// The authenticated user's own record.
    pub async fn current_user(&self, principal: &Principal) -> Result<UserInfo> {
        let user = self
            .store
            .user_by_id(principal.user_id)
            .await?
            .ok_or(Error::UserNotFound)?;
        Ok(UserInfo::from(&user))
    }

    /// Availability over strict consistency: a missing default folder is
    /// logged and reported, never fatal to the surrounding operation.
    async fn backstop_default_folder(&self, owner: uuid::Uuid) -> Vec<Warning> {
        match self.folders.ensure_default_folder(owner).await {
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(user = %owner, error = %e, "failed to create default folder");
                vec![Warning::DefaultFolderUnavailable]
            }
        }
    }
}

/// One `@`, non-empty local part, dotted domain, no whitespace.
fn email_is_valid(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
