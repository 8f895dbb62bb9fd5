//! Data models
//!
//! Rust structs representing database entities and queue items.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Users
// =============================================================================

/// Where a user lives
///
/// Local users belong to this instance; remote users were discovered
/// through federation and carry the originating host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScope {
    Local,
    Remote(String),
}

impl UserScope {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Remote(host) => Some(host.as_str()),
        }
    }
}

/// A user account, local or remote
///
/// `(username, host)` is unique. The local user has `host = None` and a
/// password hash; remote users have `host` set and no credentials.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Originating domain; None for the local user
    pub host: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Argon2 PHC string; local users only
    pub password_hash: Option<String>,
    /// Profile / actor URL
    pub url: String,
    /// Inbox URL for activity delivery
    pub inbox: String,
    /// Instance-wide shared inbox URL, if advertised
    pub shared_inbox: Option<String>,
}

impl User {
    pub fn scope(&self) -> UserScope {
        match &self.host {
            None => UserScope::Local,
            Some(host) => UserScope::Remote(host.clone()),
        }
    }
}

/// An RSA key pair bound to a user
///
/// Created atomically with the local user at setup time. The private key
/// is only populated on local-scope lookups; it is read-only after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KeyPair {
    /// Key identifier URI (e.g. "https://host/@user#main-key")
    pub id: String,
    pub user_id: String,
    /// SPKI/PEM encoded public key
    pub public_key_pem: String,
    /// PKCS8/PEM encoded private key, unencrypted
    pub private_key_pem: Option<String>,
    /// Algorithm tag (e.g. "RSA")
    pub key_type: String,
}

/// A user together with their key pair
///
/// Constructed at the store boundary so downstream components never
/// inspect raw rows.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub key: Option<KeyPair>,
}

// =============================================================================
// Posts
// =============================================================================

/// A post
///
/// Content is HTML-escaped exactly once, at creation. Immutable after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    /// HTML-escaped text
    pub content: String,
    /// Canonical URL, identical to the ActivityPub Note id
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A post joined with its author, as read for feeds and post pages
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostView {
    pub id: String,
    pub content: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub host: Option<String>,
}

// =============================================================================
// Delivery jobs
// =============================================================================

/// Unit of work for the delivery queue
///
/// Ephemeral; not persisted, lost on process crash.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    /// Local author username
    pub username: String,
    /// Post content as persisted (already escaped)
    pub content: String,
    pub post_id: String,
}
