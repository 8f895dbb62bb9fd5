//! SQLite database operations
//!
//! All database access goes through this module. Each public method is a
//! single statement or a single transaction; there are no long-lived
//! cross-request transactions.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Find a user by username and scope
    ///
    /// The key pair is returned alongside the user; the private key is
    /// only populated for local-scope lookups (the signer is the only
    /// consumer of private key material).
    ///
    /// # Returns
    /// The user record or None; absence is a normal outcome, not an error.
    pub async fn find_user(
        &self,
        username: &str,
        scope: &UserScope,
    ) -> Result<Option<UserRecord>, AppError> {
        let user = match scope {
            UserScope::Local => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, username, host, name, password_hash, url, inbox, shared_inbox
                    FROM users
                    WHERE username = ? AND host IS NULL
                    "#,
                )
                .bind(username)
                .fetch_optional(&self.pool)
                .await?
            }
            UserScope::Remote(host) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, username, host, name, password_hash, url, inbox, shared_inbox
                    FROM users
                    WHERE username = ? AND host = ?
                    "#,
                )
                .bind(username)
                .bind(host)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        let Some(user) = user else {
            return Ok(None);
        };

        let key_query = if scope.is_local() {
            r#"
            SELECT id, user_id, public_key_pem, private_key_pem, key_type
            FROM keys
            WHERE user_id = ?
            "#
        } else {
            r#"
            SELECT id, user_id, public_key_pem, NULL AS private_key_pem, key_type
            FROM keys
            WHERE user_id = ?
            "#
        };

        let key = sqlx::query_as::<_, KeyPair>(key_query)
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(Some(UserRecord { user, key }))
    }

    /// Return whether the one-time setup has been completed
    ///
    /// The instance is single-tenant: a single local user with a password
    /// hash marks setup as done.
    pub async fn local_user_exists(&self) -> Result<bool, AppError> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM users WHERE password_hash IS NOT NULL LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Insert the local user and their key pair atomically, only when no
    /// local user exists yet.
    ///
    /// The insert is guarded at the SQL level so concurrent setup requests
    /// cannot both succeed.
    ///
    /// # Returns
    /// `true` if inserted, `false` if a local user already existed.
    pub async fn create_local_user(&self, user: &User, key: &KeyPair) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, host, name, password_hash, url, inbox, shared_inbox)
            SELECT ?, ?, NULL, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM users WHERE host IS NULL)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.url)
        .bind(&user.inbox)
        .bind(&user.shared_inbox)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO keys (id, user_id, public_key_pem, private_key_pem, key_type)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&key.id)
        .bind(&user.id)
        .bind(&key.public_key_pem)
        .bind(&key.private_key_pem)
        .bind(&key.key_type)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Register a remote user discovered through federation
    ///
    /// Idempotent: when the `(username, host)` pair already exists the
    /// existing id is returned and no duplicate row is created.
    pub async fn create_remote_user(
        &self,
        username: &str,
        host: &str,
        name: Option<&str>,
        url: &str,
        inbox: &str,
        shared_inbox: Option<&str>,
    ) -> Result<String, AppError> {
        let id = EntityId::new().0;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (id, username, host, name, password_hash, url, inbox, shared_inbox)
            VALUES (?, ?, ?, ?, NULL, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(username)
        .bind(host)
        .bind(name)
        .bind(url)
        .bind(inbox)
        .bind(shared_inbox)
        .execute(&self.pool)
        .await?;

        let existing =
            sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE username = ? AND host = ?")
                .bind(username)
                .bind(host)
                .fetch_one(&self.pool)
                .await?;

        Ok(existing)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, content, url, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.content)
        .bind(&post.url)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a post joined with its author
    pub async fn get_post(&self, id: &str) -> Result<Option<PostView>, AppError> {
        let post = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.content, p.url, p.created_at, u.username, u.host
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Get the most recent posts, newest first
    pub async fn recent_posts(&self, limit: i64) -> Result<Vec<PostView>, AppError> {
        let posts = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.content, p.url, p.created_at, u.username, u.host
            FROM posts p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    // =========================================================================
    // Followers
    // =========================================================================

    /// Record that `follower_id` follows the named user
    ///
    /// # Returns
    /// `true` if the followed user exists and the edge was recorded (or
    /// already existed), `false` if the followed user is unknown.
    pub async fn follow_user(
        &self,
        follower_id: &str,
        followed_username: &str,
        followed_host: Option<&str>,
    ) -> Result<bool, AppError> {
        let scope = match followed_host {
            None => UserScope::Local,
            Some(host) => UserScope::Remote(host.to_string()),
        };

        let Some(followed) = self.find_user(followed_username, &scope).await? else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO followers (follower_id, followed_id)
            VALUES (?, ?)
            "#,
        )
        .bind(follower_id)
        .bind(&followed.user.id)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    /// Inbox URLs for everyone following the given user
    ///
    /// Shared inboxes are preferred when advertised. The list may contain
    /// duplicates (several followers behind one shared inbox); callers
    /// deduplicate before delivering.
    pub async fn follower_inboxes(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let inboxes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT COALESCE(u.shared_inbox, u.inbox)
            FROM followers f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followed_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(inboxes)
    }
}
