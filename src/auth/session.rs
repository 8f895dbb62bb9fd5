//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// User session data
///
/// Stored in a signed cookie. Contains the logged-in local username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Local username
    pub username: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session valid for `max_age_seconds` from now
    pub fn new(username: String, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            username,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload =
        serde_json::to_string(session).map_err(|e| crate::error::AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Internal(anyhow::anyhow!("HMAC key error: {}", e)))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// Decoded session if valid
///
/// # Errors
/// Returns error if signature is invalid, token is malformed, or the
/// session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(crate::error::AppError::Unauthorized);
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    // 2. Verify HMAC signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Internal(anyhow::anyhow!("HMAC key error: {}", e)))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    let payload_str =
        String::from_utf8(payload_bytes).map_err(|_| crate::error::AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_str(&payload_str).map_err(|_| crate::error::AppError::Unauthorized)?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(crate::error::AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const SECRET: &str = "test-secret-key-32-bytes-long!!!";

    #[test]
    fn token_round_trips() {
        let session = Session::new("alice".to_string(), 3600);
        let token = create_session_token(&session, SECRET).expect("token");

        let decoded = verify_session_token(&token, SECRET).expect("verify");
        assert_eq!(decoded.username, "alice");
        assert!(!decoded.is_expired());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let session = Session::new("alice".to_string(), 3600);
        let token = create_session_token(&session, SECRET).expect("token");

        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);
        tampered.push_str("xx");

        assert!(matches!(
            verify_session_token(&tampered, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let session = Session::new("alice".to_string(), 3600);
        let token = create_session_token(&session, SECRET).expect("token");

        assert!(matches!(
            verify_session_token(&token, "another-secret-key-32-bytes-long"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn expired_session_is_rejected() {
        let session = Session::new("alice".to_string(), -1);
        let token = create_session_token(&session, SECRET).expect("token");

        assert!(matches!(
            verify_session_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            verify_session_token("not-a-token", SECRET),
            Err(AppError::Unauthorized)
        ));
    }
}
