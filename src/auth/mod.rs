//! Cookie-based authentication
//!
//! Handles:
//! - HMAC-signed session tokens
//! - Session cookie helpers for the HTTP surface

pub mod session;

pub use session::{SESSION_COOKIE, Session, create_session_token, verify_session_token};
