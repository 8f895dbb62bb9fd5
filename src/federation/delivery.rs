//! Outbound activity delivery
//!
//! Signs and POSTs activity documents to remote inbox endpoints.

use std::sync::Arc;

use crate::error::AppError;

/// Outbound delivery client
///
/// Wraps the shared HTTP client; the client carries the process-wide
/// request timeout so a hung remote server cannot occupy a worker
/// indefinitely.
#[derive(Clone)]
pub struct DeliveryClient {
    http_client: Arc<reqwest::Client>,
}

/// Successful delivery response
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// HTTP status code returned by the inbox
    pub status: u16,
    /// Response body text
    pub body: String,
}

/// Deduplicate identical inbox URLs while keeping distinct personal inboxes.
///
/// This preserves recipients on the same domain that use different inbox paths.
pub fn unique_inbox_targets(inbox_urls: Vec<String>) -> Vec<String> {
    use std::collections::HashSet;

    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for inbox_url in inbox_urls {
        if seen.contains(&inbox_url) {
            continue;
        }
        seen.insert(inbox_url.clone());
        targets.push(inbox_url);
    }

    targets
}

impl DeliveryClient {
    /// Create new delivery client
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }

    /// Deliver a signed activity document to a single inbox
    ///
    /// Serializes the document, signs `(request-target)`, `host`, `date`
    /// and the body digest with the given private key, and POSTs with
    /// content-type `application/activity+json`.
    ///
    /// # Errors
    /// * [`AppError::Signing`] - malformed key material or signing failure
    /// * [`AppError::Delivery`] - network failure or non-2xx response
    pub async fn signed_post(
        &self,
        inbox_url: &str,
        document: &serde_json::Value,
        key_id: &str,
        private_key_pem: &str,
    ) -> Result<DeliveryReceipt, AppError> {
        // 1. Serialize activity
        let body = serde_json::to_vec(document)
            .map_err(|e| AppError::Validation(format!("Failed to serialize activity: {}", e)))?;

        // 2. Sign request
        let sig_headers =
            crate::federation::sign_request("POST", inbox_url, Some(&body), private_key_pem, key_id)?;

        // 3. POST to inbox with signed headers
        let mut request = self
            .http_client
            .post(inbox_url)
            .header("Content-Type", "application/activity+json")
            .header("Date", sig_headers.date)
            .header("Signature", sig_headers.signature);

        if let Some(digest) = sig_headers.digest {
            request = request.header("Digest", digest);
        }

        let response = request.body(body).send().await.map_err(|e| {
            AppError::Delivery(format!("Failed to deliver to {}: {}", inbox_url, e))
        })?;

        // 4. Handle response
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AppError::Delivery(format!(
                "Inbox {} rejected activity: HTTP {}",
                inbox_url, status
            )));
        }

        tracing::info!(inbox = %inbox_url, status = %status, "Delivered activity");

        Ok(DeliveryReceipt {
            status: status.as_u16(),
            body,
        })
    }
}
