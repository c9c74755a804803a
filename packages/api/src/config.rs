//! Process configuration from environment variables.
//!
//! Read once at startup via [`Config::from_env`] and passed down explicitly;
//! nothing in this crate reads the environment after construction.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// Credentials for one OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Secret the session token codec signs with.
    pub token_secret: String,
    /// Session token lifetime in hours.
    pub token_ttl_hours: i64,
    /// Present only when the provider's client id + secret are configured.
    pub google: Option<OAuthCredentials>,
    pub github: Option<OAuthCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            token_secret: require("JWT_SECRET")?,
            token_ttl_hours: std::env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            google: provider_credentials("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET", "google"),
            github: provider_credentials("GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET", "github"),
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::Missing(var))
}

fn provider_credentials(
    id_var: &str,
    secret_var: &str,
    provider: &str,
) -> Option<OAuthCredentials> {
    let client_id = std::env::var(id_var).ok()?;
    let client_secret = std::env::var(secret_var).ok()?;
    let redirect_url = std::env::var("AUTH_REDIRECT_URI")
        .map(|uri| uri.replace("/callback", &format!("/{provider}/callback")))
        .unwrap_or_else(|_| format!("http://localhost:8080/auth/{provider}/callback"));
    Some(OAuthCredentials {
        client_id,
        client_secret,
        redirect_url,
    })
}
