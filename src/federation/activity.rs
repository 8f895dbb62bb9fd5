//! ActivityPub document construction
//!
//! Pure, deterministic builders mapping stored records to Actor, Note
//! and Create documents. The ids produced here are the same strings the
//! HTTP surface serves the resources under; federated consumers compare
//! and dereference them byte-for-byte.

use serde_json::Value;

use crate::data::{KeyPair, User};

/// The ActivityStreams public collection
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

const ACTIVITYSTREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
const SECURITY_CONTEXT: &str = "https://w3id.org/security/v1";

/// Actor URL for a local username
pub fn actor_url(base_url: &str, username: &str) -> String {
    format!("{}/@{}", base_url.trim_end_matches('/'), username)
}

/// Canonical post URL, identical to the Note id
pub fn post_url(base_url: &str, post_id: &str) -> String {
    format!("{}/posts/{}", base_url.trim_end_matches('/'), post_id)
}

/// Create-activity URL for a post
pub fn activity_url(base_url: &str, post_id: &str) -> String {
    format!("{}/activity", post_url(base_url, post_id))
}

/// Key id URI for an actor
pub fn key_id(actor_url: &str) -> String {
    format!("{}#main-key", actor_url)
}

/// Build an Actor (Person) document
///
/// # Arguments
/// * `user` - Local user record
/// * `key` - The user's key pair (public half is embedded)
pub fn actor(user: &User, key: &KeyPair) -> Value {
    let mut doc = serde_json::json!({
        "@context": [ACTIVITYSTREAMS_CONTEXT, SECURITY_CONTEXT],
        "type": "Person",
        "id": user.url,
        "preferredUsername": user.username,
        "name": user.name.as_deref().unwrap_or(&user.username),
        "inbox": user.inbox,
        "url": user.url,
        "publicKey": {
            "id": key.id,
            "owner": user.url,
            "publicKeyPem": key.public_key_pem,
        }
    });

    if let Some(shared_inbox) = &user.shared_inbox {
        doc["sharedInbox"] = Value::String(shared_inbox.clone());
    }

    doc
}

/// Build a Note object
///
/// # Arguments
/// * `id` - Note id (the canonical post URL)
/// * `attributed_to` - Actor URL of the author
/// * `content` - HTML-escaped content, exactly as persisted
pub fn note(id: &str, attributed_to: &str, content: &str) -> Value {
    serde_json::json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "type": "Note",
        "id": id,
        "attributedTo": attributed_to,
        "content": content,
        "to": [PUBLIC_AUDIENCE],
    })
}

/// Build a Create activity wrapping a Note
///
/// # Arguments
/// * `id` - Activity id (unique URI)
/// * `actor` - Actor URL of the author
/// * `object` - The Note being created
pub fn create(id: &str, actor: &str, object: Value) -> Value {
    serde_json::json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "type": "Create",
        "id": id,
        "actor": actor,
        "object": object,
        "to": [PUBLIC_AUDIENCE],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> (User, KeyPair) {
        let url = "https://local.example/@alice".to_string();
        let user = User {
            id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            username: "alice".to_string(),
            host: None,
            name: Some("Alice".to_string()),
            password_hash: Some("hash".to_string()),
            url: url.clone(),
            inbox: "https://local.example/inbox".to_string(),
            shared_inbox: None,
        };
        let key = KeyPair {
            id: key_id(&url),
            user_id: user.id.clone(),
            public_key_pem: "-----BEGIN PUBLIC KEY-----\nfake\n-----END PUBLIC KEY-----\n"
                .to_string(),
            private_key_pem: None,
            key_type: "RSA".to_string(),
        };
        (user, key)
    }

    #[test]
    fn url_helpers_match_http_surface_routes() {
        assert_eq!(
            actor_url("https://local.example", "alice"),
            "https://local.example/@alice"
        );
        assert_eq!(
            post_url("https://local.example/", "abc"),
            "https://local.example/posts/abc"
        );
        assert_eq!(
            activity_url("https://local.example", "abc"),
            "https://local.example/posts/abc/activity"
        );
        assert_eq!(
            key_id("https://local.example/@alice"),
            "https://local.example/@alice#main-key"
        );
    }

    #[test]
    fn actor_document_embeds_public_key() {
        let (user, key) = test_user();
        let doc = actor(&user, &key);

        assert_eq!(doc["type"], "Person");
        assert_eq!(doc["id"], "https://local.example/@alice");
        assert_eq!(doc["preferredUsername"], "alice");
        assert_eq!(doc["name"], "Alice");
        assert_eq!(doc["inbox"], "https://local.example/inbox");
        assert_eq!(doc["publicKey"]["id"], "https://local.example/@alice#main-key");
        assert_eq!(doc["publicKey"]["owner"], "https://local.example/@alice");
        assert_eq!(doc["publicKey"]["publicKeyPem"], key.public_key_pem);
        assert!(doc.get("sharedInbox").is_none());
    }

    #[test]
    fn actor_document_falls_back_to_username_for_name() {
        let (mut user, key) = test_user();
        user.name = None;
        let doc = actor(&user, &key);
        assert_eq!(doc["name"], "alice");
    }

    #[test]
    fn actor_document_includes_shared_inbox_when_present() {
        let (mut user, key) = test_user();
        user.shared_inbox = Some("https://local.example/inbox".to_string());
        let doc = actor(&user, &key);
        assert_eq!(doc["sharedInbox"], "https://local.example/inbox");
    }

    #[test]
    fn note_addresses_public_audience() {
        let doc = note(
            "https://local.example/posts/abc",
            "https://local.example/@alice",
            "hello world",
        );

        assert_eq!(doc["type"], "Note");
        assert_eq!(doc["id"], "https://local.example/posts/abc");
        assert_eq!(doc["attributedTo"], "https://local.example/@alice");
        assert_eq!(doc["content"], "hello world");
        assert_eq!(doc["to"][0], PUBLIC_AUDIENCE);
    }

    #[test]
    fn note_round_trips_content_exactly() {
        let content = "&lt;script&gt;alert(1)&lt;/script&gt;";
        let doc = note(
            "https://local.example/posts/abc",
            "https://local.example/@alice",
            content,
        );

        // The builder never escapes again; content passes through verbatim.
        assert_eq!(doc["content"].as_str().unwrap(), content);
    }

    #[test]
    fn create_wraps_note_object() {
        let object = note(
            "https://local.example/posts/abc",
            "https://local.example/@alice",
            "hello",
        );
        let doc = create(
            "https://local.example/posts/abc/activity",
            "https://local.example/@alice",
            object,
        );

        assert_eq!(doc["type"], "Create");
        assert_eq!(doc["id"], "https://local.example/posts/abc/activity");
        assert_eq!(doc["actor"], "https://local.example/@alice");
        assert_eq!(doc["object"]["type"], "Note");
        assert_eq!(doc["object"]["id"], "https://local.example/posts/abc");
        assert_eq!(doc["to"][0], PUBLIC_AUDIENCE);
    }
}
