//! Account service
//!
//! Handles the one-time local account setup (including RSA key
//! generation), password verification and remote user registration.

use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::data::{Database, EntityId, KeyPair, User, UserScope};
use crate::error::AppError;
use crate::federation::activity;

/// RSA modulus size for local account keys
const RSA_KEY_BITS: usize = 4096;

/// Freshly generated PEM-encoded key material
struct GeneratedKeyPair {
    public_key_pem: String,
    private_key_pem: String,
}

/// Generate an RSA key pair for a new local account
///
/// Public key as SPKI/PEM, private key as PKCS8/PEM without passphrase;
/// remote servers parse these bytes to verify signatures, so the
/// encodings are a wire contract.
fn generate_rsa_keypair() -> Result<GeneratedKeyPair, AppError> {
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};

    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|e| AppError::Signing(format!("Failed to generate RSA key: {}", e)))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AppError::Signing(format!("Failed to encode private key: {}", e)))?
        .to_string();
    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Signing(format!("Failed to encode public key: {}", e)))?;

    Ok(GeneratedKeyPair {
        public_key_pem,
        private_key_pem,
    })
}

/// Hash a password with Argon2id
fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored hash
///
/// Fails closed: malformed hashes verify as false.
fn password_matches(stored_hash: &str, password: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    base_url: String,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, base_url: String) -> Self {
        Self { db, base_url }
    }

    /// Complete the one-time instance setup
    ///
    /// Generates the account's RSA key pair and stores user and keys
    /// atomically. Key generation and password hashing run on the
    /// blocking pool so concurrent requests are not stalled.
    ///
    /// # Errors
    /// * [`AppError::Conflict`] - a local user already exists
    /// * [`AppError::Validation`] - empty or malformed credentials
    pub async fn setup(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = username.trim();
        if username.is_empty() || username.contains('@') || username.contains('/') {
            return Err(AppError::Validation(
                "username must be non-empty and contain no '@' or '/'".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }

        // Cheap pre-check; the insert below is the authoritative guard.
        if self.db.local_user_exists().await? {
            return Err(AppError::Conflict);
        }

        let password_owned = password.to_string();
        let (keys, password_hash) = tokio::task::spawn_blocking(move || {
            let keys = generate_rsa_keypair()?;
            let hash = hash_password(&password_owned)?;
            Ok::<_, AppError>((keys, hash))
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Key generation task failed: {}", e)))??;

        let actor_url = activity::actor_url(&self.base_url, username);
        let user = User {
            id: EntityId::new().0,
            username: username.to_string(),
            host: None,
            name: Some(username.to_string()),
            password_hash: Some(password_hash),
            url: actor_url.clone(),
            inbox: format!("{}/inbox", self.base_url.trim_end_matches('/')),
            shared_inbox: None,
        };
        let key = KeyPair {
            id: activity::key_id(&actor_url),
            user_id: user.id.clone(),
            public_key_pem: keys.public_key_pem,
            private_key_pem: Some(keys.private_key_pem),
            key_type: "RSA".to_string(),
        };

        if !self.db.create_local_user(&user, &key).await? {
            return Err(AppError::Conflict);
        }

        tracing::info!(username = %user.username, "Local account created");
        Ok(user)
    }

    /// Verify a login attempt
    ///
    /// Fails closed: unknown users and malformed hashes report `false`.
    pub async fn verify_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, AppError> {
        let Some(record) = self.db.find_user(username, &UserScope::Local).await? else {
            return Ok(false);
        };
        let Some(stored_hash) = record.user.password_hash else {
            return Ok(false);
        };

        let password = password.to_string();
        let matches =
            tokio::task::spawn_blocking(move || password_matches(&stored_hash, &password))
                .await
                .unwrap_or(false);

        Ok(matches)
    }

    /// Register a remote user discovered through federation
    ///
    /// Idempotent on `(username, host)`.
    pub async fn create_remote_user(
        &self,
        username: &str,
        host: &str,
        profile_url: &str,
        inbox: &str,
        shared_inbox: Option<&str>,
        name: Option<&str>,
    ) -> Result<String, AppError> {
        let parsed = url::Url::parse(profile_url)
            .map_err(|e| AppError::Validation(format!("Invalid profile URL: {}", e)))?;
        if parsed.host_str().is_none() {
            return Err(AppError::Validation(
                "Profile URL must have a host".to_string(),
            ));
        }

        self.db
            .create_remote_user(username, host, name, profile_url, inbox, shared_inbox)
            .await
    }
}
