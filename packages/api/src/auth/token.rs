//! # Session tokens — signed, time-limited bearer credentials
//!
//! [`TokenCodec`] wraps HMAC-signed JWTs with a process-wide secret. Issuing
//! embeds the user's id, email, and name as claims with a configurable
//! lifetime (24 hours by default); verification recovers a [`Principal`] and
//! collapses every failure mode — bad signature, malformed input, expiry —
//! into [`Error::InvalidToken`], so callers cannot tell them apart.
//!
//! Every protected operation must go through
//! [`AuthService::authenticate`](crate::accounts::AuthService::authenticate)
//! (which delegates here) before touching any owner-scoped store call.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::User;

use crate::error::{Error, Result};
use crate::models::Principal;

/// Claims carried inside a session token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    name: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for `user`, valid for the configured lifetime.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("token signing failed: {e}")))
    }

    /// Verify a bearer token and recover the principal it was issued for.
    pub fn verify(&self, token: &str) -> Result<Principal> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| Error::InvalidToken)?;
        Ok(Principal {
            user_id: data.claims.sub,
            email: data.claims.email,
            name: data.claims.name,
        })
    }
}
