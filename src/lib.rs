//! Perch - A minimal, single-user federated microblogging server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - ActivityPub endpoints (actor, notes, activities)         │
//! │  - WebFinger discovery                                      │
//! │  - Minimal HTML surface (setup, login, feed)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Account setup and key generation                         │
//! │  - Post creation and delivery enqueueing                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Data Layer / Delivery Queue                     │
//! │  - SQLite (sqlx)                                            │
//! │  - Background workers for signed outbound delivery          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for ActivityPub, WebFinger and HTML pages
//! - `service`: Business logic layer
//! - `federation`: Activity construction, signing, delivery, queue
//! - `data`: Database layer
//! - `auth`: Cookie session handling
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains shared resources
/// like the database pool, HTTP client and delivery queue.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// HTTP client for federation
    pub http_client: Arc<reqwest::Client>,

    /// Background delivery queue
    pub delivery: Arc<federation::DeliveryQueue>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Initialize HTTP client
    /// 3. Start the delivery queue workers
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Initialize HTTP client
        //
        // The timeout bounds every outbound inbox call so a hung remote
        // server cannot occupy a delivery worker indefinitely.
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent(concat!("Perch/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(config.delivery.timeout_seconds))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );

        // 3. Start the delivery queue
        let delivery = Arc::new(federation::DeliveryQueue::start(
            config.delivery.workers,
            db.clone(),
            federation::DeliveryClient::new(http_client.clone()),
            config.server.base_url(),
        ));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            http_client,
            delivery,
        })
    }

    /// Account service bound to this state
    pub fn account_service(&self) -> service::AccountService {
        service::AccountService::new(self.db.clone(), self.config.server.base_url())
    }

    /// Post service bound to this state
    pub fn post_service(&self) -> service::PostService {
        service::PostService::new(
            self.db.clone(),
            self.delivery.clone(),
            self.config.server.base_url(),
        )
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::wellknown_router())
        .merge(api::pages_router())
        .merge(api::activitypub_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
