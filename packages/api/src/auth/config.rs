//! OAuth provider endpoint configuration.

use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};

use crate::config::OAuthCredentials;
use crate::error::{Error, Result};

/// Fully-resolved OAuth client configuration for one provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub redirect_url: RedirectUrl,
}

impl OAuthConfig {
    /// Google endpoints with the supplied credentials.
    pub fn google(creds: &OAuthCredentials) -> Result<Self> {
        Self::build(
            creds,
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        )
    }

    /// GitHub endpoints with the supplied credentials.
    pub fn github(creds: &OAuthCredentials) -> Result<Self> {
        Self::build(
            creds,
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
        )
    }

    fn build(creds: &OAuthCredentials, auth_url: &str, token_url: &str) -> Result<Self> {
        Ok(Self {
            client_id: ClientId::new(creds.client_id.clone()),
            client_secret: ClientSecret::new(creds.client_secret.clone()),
            auth_url: AuthUrl::new(auth_url.to_string())
                .map_err(|e| Error::Internal(e.to_string()))?,
            token_url: TokenUrl::new(token_url.to_string())
                .map_err(|e| Error::Internal(e.to_string()))?,
            redirect_url: RedirectUrl::new(creds.redirect_url.clone())
                .map_err(|e| Error::Internal(e.to_string()))?,
        })
    }
}
