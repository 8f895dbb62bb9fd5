//! Post service
//!
//! Handles post creation and reads. Creating a post persists it, then
//! enqueues a delivery job; the request never waits on federation.

use std::sync::Arc;

use crate::data::{Database, DeliveryJob, EntityId, Post, PostView, UserScope};
use crate::error::AppError;
use crate::federation::{DeliveryQueue, activity};

/// Post service
pub struct PostService {
    db: Arc<Database>,
    queue: Arc<DeliveryQueue>,
    base_url: String,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>, queue: Arc<DeliveryQueue>, base_url: String) -> Self {
        Self {
            db,
            queue,
            base_url,
        }
    }

    /// Create a new post for a local user
    ///
    /// Content is HTML-escaped exactly once, here. The post is persisted
    /// before the delivery job is enqueued, so a worker can never see a
    /// post id that is not yet in storage. Enqueue failures are logged
    /// and do not fail the request; federation is fire-and-forget.
    pub async fn create(&self, username: &str, content: &str) -> Result<Post, AppError> {
        let record = self
            .db
            .find_user(username, &UserScope::Local)
            .await?
            .ok_or(AppError::NotFound)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("post content is required".to_string()));
        }

        let escaped = html_escape::encode_text(content).to_string();

        let post_id = EntityId::new().0;
        let post = Post {
            id: post_id.clone(),
            user_id: record.user.id.clone(),
            content: escaped.clone(),
            url: activity::post_url(&self.base_url, &post_id),
            created_at: chrono::Utc::now(),
        };

        self.db.insert_post(&post).await?;

        if let Err(error) = self.queue.enqueue(DeliveryJob {
            username: record.user.username,
            content: escaped,
            post_id: post.id.clone(),
        }) {
            tracing::warn!(%error, post_id = %post.id, "Failed to enqueue delivery job");
        }

        Ok(post)
    }

    /// Try to get a post with its author
    pub async fn find(&self, id: &str) -> Result<Option<PostView>, AppError> {
        self.db.get_post(id).await
    }

    /// Get the most recent posts, newest first
    pub async fn recent(&self, limit: i64) -> Result<Vec<PostView>, AppError> {
        self.db.recent_posts(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{KeyPair, User};
    use crate::federation::DeliveryClient;
    use tempfile::TempDir;

    async fn post_service_fixture() -> (PostService, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir");
        let db = Arc::new(
            Database::connect(&temp_dir.path().join("test.db"))
                .await
                .expect("connect"),
        );

        let user_id = EntityId::new().0;
        let url = "https://local.example/@alice".to_string();
        db.create_local_user(
            &User {
                id: user_id.clone(),
                username: "alice".to_string(),
                host: None,
                name: None,
                password_hash: Some("hash".to_string()),
                url: url.clone(),
                inbox: "https://local.example/inbox".to_string(),
                shared_inbox: None,
            },
            &KeyPair {
                id: format!("{url}#main-key"),
                user_id,
                public_key_pem: "unused".to_string(),
                private_key_pem: Some("unused".to_string()),
                key_type: "RSA".to_string(),
            },
        )
        .await
        .expect("seed user");

        let http_client = Arc::new(reqwest::Client::new());
        let queue = Arc::new(DeliveryQueue::start(
            1,
            db.clone(),
            DeliveryClient::new(http_client),
            "https://local.example".to_string(),
        ));

        (
            PostService::new(db, queue, "https://local.example".to_string()),
            temp_dir,
        )
    }

    #[tokio::test]
    async fn create_escapes_content_exactly_once() {
        let (service, _dir) = post_service_fixture().await;

        let post = service
            .create("alice", "<script>alert(1)</script>")
            .await
            .expect("create");

        assert_eq!(post.content, "&lt;script&gt;alert(1)&lt;/script&gt;");

        // The stored row carries the same single escaping.
        let view = service.find(&post.id).await.expect("find").expect("post");
        assert_eq!(view.content, "&lt;script&gt;alert(1)&lt;/script&gt;");
    }

    #[tokio::test]
    async fn create_builds_canonical_url() {
        let (service, _dir) = post_service_fixture().await;
        let post = service.create("alice", "hello world").await.expect("create");
        assert_eq!(
            post.url,
            format!("https://local.example/posts/{}", post.id)
        );
    }

    #[tokio::test]
    async fn create_rejects_empty_content() {
        let (service, _dir) = post_service_fixture().await;
        assert!(matches!(
            service.create("alice", "   ").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_rejects_unknown_author() {
        let (service, _dir) = post_service_fixture().await;
        assert!(matches!(
            service.create("nobody", "hi").await,
            Err(AppError::NotFound)
        ));
    }
}
