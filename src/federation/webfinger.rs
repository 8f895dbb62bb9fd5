//! WebFinger protocol support
//!
//! Serves JRD documents so remote servers can resolve
//! `acct:user@domain` identifiers to the local actor URL.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// WebFinger JRD response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerResponse {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    pub links: Vec<WebFingerLink>,
}

/// WebFinger link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerLink {
    pub rel: String,
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// A parsed `acct:` resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcctResource {
    pub username: String,
    pub host: String,
}

impl AcctResource {
    /// Parse a WebFinger resource parameter (`acct:user@domain`)
    pub fn parse(resource: &str) -> Result<Self, AppError> {
        let acct = resource
            .strip_prefix("acct:")
            .ok_or_else(|| AppError::Validation("Resource must start with 'acct:'".to_string()))?;

        let (username, host) = acct
            .split_once('@')
            .ok_or_else(|| AppError::Validation("Invalid acct format".to_string()))?;

        if username.is_empty() || host.is_empty() || host.contains('@') {
            return Err(AppError::Validation("Invalid acct format".to_string()));
        }

        Ok(Self {
            username: username.to_string(),
            host: host.to_string(),
        })
    }

    pub fn to_subject(&self) -> String {
        format!("acct:{}@{}", self.username, self.host)
    }
}

/// Generate WebFinger response for a local account.
///
/// # Arguments
/// * `resource` - The queried resource
/// * `actor_url` - The local actor URL the resource resolves to
///
/// # Returns
/// JRD response for the account
pub fn generate_webfinger_response(resource: &AcctResource, actor_url: &str) -> WebFingerResponse {
    WebFingerResponse {
        subject: resource.to_subject(),
        aliases: Some(vec![actor_url.to_string()]),
        links: vec![WebFingerLink {
            rel: "self".to_string(),
            link_type: Some("application/activity+json".to_string()),
            href: Some(actor_url.to_string()),
        }],
    }
}
