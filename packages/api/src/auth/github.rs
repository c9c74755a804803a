//! # GitHub OAuth 2.0 provider client
//!
//! Implements the GitHub Authorization Code flow with PKCE.
//!
//! ## Flow
//!
//! 1. **[`generate_auth_url`](GitHubOAuth::generate_auth_url)** — builds an
//!    authorization URL requesting the `user:email` and `read:user` scopes,
//!    generates a random PKCE challenge, and persists the CSRF state +
//!    verifier through the store with a 10-minute expiry.
//! 2. **[`exchange_code`](GitHubOAuth::exchange_code)** — called by the
//!    callback route. Atomically consumes the matching state row, exchanges
//!    the authorization code + PKCE verifier for an access token, fetches the
//!    user's profile from `api.github.com/user` (falling back to
//!    `/user/emails` for the primary verified address), and normalizes it
//!    into an [`OAuthProfile`]. GitHub may legitimately disclose no email at
//!    all; the profile then carries only the login handle and the
//!    reconciliation engine substitutes its placeholder address.

use std::sync::Arc;

use chrono::{Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthorizationCode, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
    PkceCodeVerifier, Scope, TokenResponse,
};
use reqwest::Client;
use serde::Deserialize;

use store::{Provider, Store};

use super::config::OAuthConfig;
use super::reconcile::OAuthProfile;
use crate::config::OAuthCredentials;
use crate::error::{Error, Result};

const STATE_TTL_MINUTES: i64 = 10;
const USER_AGENT: &str = "keeper-api";

/// GitHub user info from API.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    email: Option<String>,
    name: Option<String>,
}

/// GitHub email info from API.
#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// GitHub OAuth handler.
pub struct GitHubOAuth {
    config: OAuthConfig,
    store: Arc<dyn Store>,
}

impl GitHubOAuth {
    pub fn new(creds: &OAuthCredentials, store: Arc<dyn Store>) -> Result<Self> {
        Ok(Self {
            config: OAuthConfig::github(creds)?,
            store,
        })
    }

    fn create_client(&self) -> ConfiguredClient {
        BasicClient::new(self.config.client_id.clone())
            .set_client_secret(self.config.client_secret.clone())
            .set_auth_uri(self.config.auth_url.clone())
            .set_token_uri(self.config.token_url.clone())
            .set_redirect_uri(self.config.redirect_url.clone())
    }

    /// Generate an authorization URL with PKCE.
    pub async fn generate_auth_url(&self) -> Result<String> {
        let client = self.create_client();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("user:email".to_string()))
            .add_scope(Scope::new("read:user".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        self.store
            .save_oauth_state(
                csrf_state.secret(),
                Provider::Github,
                pkce_verifier.secret(),
                Utc::now() + Duration::minutes(STATE_TTL_MINUTES),
            )
            .await?;

        Ok(auth_url.to_string())
    }

    /// Exchange the callback code for tokens and fetch the user's profile.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<OAuthProfile> {
        let pkce_verifier = self
            .store
            .consume_oauth_state(state, Provider::Github)
            .await?
            .ok_or(Error::InvalidOAuthState)?;

        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::OAuthExchange(e.to_string()))?;

        let token_result = self
            .create_client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&http_client)
            .await
            .map_err(|e| Error::OAuthExchange(format!("token exchange failed: {e}")))?;

        let access_token = token_result.access_token().secret();
        let api_client = Client::new();

        let github_user: GitHubUser = api_client
            .get("https://api.github.com/user")
            .header("Authorization", format!("Bearer {}", access_token))
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::OAuthExchange(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::OAuthExchange(e.to_string()))?;

        // The profile email is often withheld; try the emails endpoint for
        // the primary verified address before giving up on one entirely.
        let email = match github_user.email {
            Some(email) => Some(email),
            None => {
                let emails: Vec<GitHubEmail> = api_client
                    .get("https://api.github.com/user/emails")
                    .header("Authorization", format!("Bearer {}", access_token))
                    .header("User-Agent", USER_AGENT)
                    .send()
                    .await
                    .map_err(|e| Error::OAuthExchange(e.to_string()))?
                    .json()
                    .await
                    .unwrap_or_default();

                emails
                    .into_iter()
                    .find(|e| e.primary && e.verified)
                    .map(|e| e.email)
            }
        };

        Ok(OAuthProfile {
            external_id: github_user.id.to_string(),
            email,
            username: Some(github_user.login),
            display_name: github_user.name,
        })
    }
}
