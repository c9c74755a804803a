//! # User projections
//!
//! Two representations of an authenticated user:
//!
//! - [`Principal`] — the verified identity attached to a request after token
//!   validation. Built by the token codec from claims, never from request
//!   input; every owner-scoped operation takes one.
//! - [`UserInfo`] — the client-safe subset of a user record. Omits the
//!   password hash and provider ids and converts the `Uuid` to a `String`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::User;

/// The verified identity attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

/// User information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at,
        }
    }
}
