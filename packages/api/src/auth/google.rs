//! # Google OAuth 2.0 provider client
//!
//! Implements the Google Authorization Code flow with PKCE. The structure
//! mirrors [`super::github`] but targets Google's endpoints and scopes.
//!
//! ## Flow
//!
//! 1. **[`generate_auth_url`](GoogleOAuth::generate_auth_url)** — builds an
//!    authorization URL requesting `openid`, `email`, and `profile` scopes,
//!    generates a random PKCE challenge, and persists the CSRF state +
//!    verifier through the store with a 10-minute expiry.
//! 2. **[`exchange_code`](GoogleOAuth::exchange_code)** — called by the
//!    callback route. Atomically consumes the matching state row (validating
//!    CSRF state and expiry in one step), exchanges the authorization code +
//!    PKCE verifier for an access token, fetches the user's profile from the
//!    Google userinfo endpoint, and normalizes it into an [`OAuthProfile`]
//!    for the reconciliation engine.

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

/// Google user info from API.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: String,
    name: Option<String>,
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

/// Google OAuth handler.
pub struct GoogleOAuth {
    config: OAuthConfig,
    store: Arc<dyn Store>,
}

impl GoogleOAuth {
    pub fn new(creds: &OAuthCredentials, store: Arc<dyn Store>) -> Result<Self> {
        Ok(Self {
            config: OAuthConfig::google(creds)?,
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
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        self.store
            .save_oauth_state(
                csrf_state.secret(),
                Provider::Google,
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
            .consume_oauth_state(state, Provider::Google)
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

        let google_user: GoogleUser = Client::new()
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| Error::OAuthExchange(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::OAuthExchange(e.to_string()))?;

        Ok(OAuthProfile {
            external_id: google_user.id,
            email: Some(google_user.email),
            username: None,
            display_name: google_user.name,
        })
    }
}
