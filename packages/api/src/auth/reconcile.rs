//! # Identity reconciliation — mapping OAuth profiles onto local accounts
//!
//! [`resolve`] turns the profile a provider delivers after a successful
//! federated login into exactly one local user, idempotently, in strict order:
//!
//! 1. Look up by the provider's stable external id — the fast path for
//!    returning users.
//! 2. Look up by the effective email (the claimed address, or the placeholder
//!    `"{username}@{provider}.local"` when the provider discloses none) and
//!    link the external id onto that account in place. This is how a
//!    password-registered account and a later OAuth login with the same email
//!    end up as one user.
//! 3. Create a fresh account with no password hash.
//!
//! The order matters: checking the provider id before the email prevents
//! duplicate links across repeated logins. The steps are not atomic as a
//! group, so a lost first-login race surfaces as a store uniqueness conflict
//! on step 3 — which is taken as a signal to retry the lookup-and-link path
//! against whoever won.

use tracing::info;

use store::{NewUser, Provider, Store, StoreError, User};

use crate::error::{Error, Result};

/// Normalized profile delivered by a provider after a successful login.
#[derive(Debug, Clone, Default)]
pub struct OAuthProfile {
    /// The provider's stable external id for this account.
    pub external_id: String,
    /// Email claimed by the provider, when disclosed.
    pub email: Option<String>,
    /// Provider-side handle (e.g. the GitHub login); feeds the placeholder
    /// email when no real address is disclosed.
    pub username: Option<String>,
    /// Human display name, when present.
    pub display_name: Option<String>,
}

/// Resolve `profile` to a local user, creating or linking as needed.
pub async fn resolve(
    store: &dyn Store,
    provider: Provider,
    profile: &OAuthProfile,
) -> Result<User> {
    if profile.external_id.trim().is_empty() {
        return Err(Error::MalformedProfile("missing provider id"));
    }
    let external_id = profile.external_id.as_str();

    if let Some(user) = store.user_by_provider(provider, external_id).await? {
        return Ok(user);
    }

    let email = match (&profile.email, &profile.username) {
        (Some(email), _) => email.trim().to_lowercase(),
        (None, Some(username)) => format!("{}@{}.local", username.trim(), provider),
        (None, None) => return Err(Error::MalformedProfile("no email or username")),
    };
    let name = profile
        .display_name
        .clone()
        .or_else(|| profile.username.clone())
        .ok_or(Error::MalformedProfile("no display name"))?;

    if let Some(user) = store.user_by_email(&email).await? {
        info!(user = %user.id, %provider, "linking provider to existing account");
        return Ok(store.link_provider(user.id, provider, external_id).await?);
    }

    let new_user = NewUser {
        email: email.clone(),
        name,
        password_hash: None,
        google_id: (provider == Provider::Google).then(|| external_id.to_string()),
        github_id: (provider == Provider::Github).then(|| external_id.to_string()),
    };
    match store.create_user(new_user).await {
        Ok(user) => {
            info!(user = %user.id, %provider, "created account from OAuth profile");
            Ok(user)
        }
        // Someone inserted this email between the lookup and the create:
        // retry the link path against the winner.
        Err(StoreError::EmailTaken) => match store.user_by_email(&email).await? {
            Some(user) => Ok(store.link_provider(user.id, provider, external_id).await?),
            None => Err(StoreError::EmailTaken.into()),
        },
        Err(StoreError::ProviderIdTaken) => store
            .user_by_provider(provider, external_id)
            .await?
            .ok_or_else(|| StoreError::ProviderIdTaken.into()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;

    fn profile(external_id: &str, email: Option<&str>) -> OAuthProfile {
        OAuthProfile {
            external_id: external_id.to_string(),
            email: email.map(str::to_string),
            username: None,
            display_name: Some("A".to_string()),
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_passwordless_user() {
        let store = MemoryStore::new();
        let user = resolve(&store, Provider::Google, &profile("g-1", Some("a@x.com")))
            .await
            .unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.google_id.as_deref(), Some("g-1"));
        assert!(user.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_returning_login_hits_provider_fast_path() {
        let store = MemoryStore::new();
        let first = resolve(&store, Provider::Google, &profile("g-1", Some("a@x.com")))
            .await
            .unwrap();
        // A changed email on the second login must not fork the account.
        let second = resolve(&store, Provider::Google, &profile("g-1", Some("new@x.com")))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_matching_email_links_instead_of_duplicating() {
        let store = MemoryStore::new();
        let existing = store
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                name: "A".to_string(),
                password_hash: Some("$argon2id$stub".to_string()),
                ..NewUser::default()
            })
            .await
            .unwrap();

        let linked = resolve(&store, Provider::Github, &profile("gh-7", Some("a@x.com")))
            .await
            .unwrap();
        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.github_id.as_deref(), Some("gh-7"));
        // Password auth survives the link.
        assert!(linked.password_hash.is_some());

        // Subsequent logins resolve through the provider id directly.
        let again = resolve(&store, Provider::Github, &profile("gh-7", Some("a@x.com")))
            .await
            .unwrap();
        assert_eq!(again.id, existing.id);
    }

    #[tokio::test]
    async fn test_placeholder_email_when_provider_discloses_none() {
        let store = MemoryStore::new();
        let profile = OAuthProfile {
            external_id: "gh-9".to_string(),
            email: None,
            username: Some("octocat".to_string()),
            display_name: None,
        };
        let user = resolve(&store, Provider::Github, &profile).await.unwrap();
        assert_eq!(user.email, "octocat@github.local");
        // Display name falls back to the provider handle.
        assert_eq!(user.name, "octocat");
    }

    #[tokio::test]
    async fn test_unusable_profile_rejected() {
        let store = MemoryStore::new();

        let no_id = OAuthProfile::default();
        assert!(matches!(
            resolve(&store, Provider::Google, &no_id).await,
            Err(Error::MalformedProfile(_))
        ));

        let no_identity = OAuthProfile {
            external_id: "g-1".to_string(),
            ..OAuthProfile::default()
        };
        assert!(matches!(
            resolve(&store, Provider::Google, &no_identity).await,
            Err(Error::MalformedProfile(_))
        ));
    }

    #[tokio::test]
    async fn test_same_email_different_providers_share_one_account() {
        let store = MemoryStore::new();
        let via_google = resolve(&store, Provider::Google, &profile("g-1", Some("a@x.com")))
            .await
            .unwrap();
        let via_github = resolve(&store, Provider::Github, &profile("gh-1", Some("a@x.com")))
            .await
            .unwrap();
        assert_eq!(via_google.id, via_github.id);
        assert_eq!(via_github.google_id.as_deref(), Some("g-1"));
        assert_eq!(via_github.github_id.as_deref(), Some("gh-1"));
    }
}
