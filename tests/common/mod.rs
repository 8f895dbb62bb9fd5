//! Common test utilities for E2E tests

use perch::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_domain("test.example.com").await
    }

    /// Create a new test server with a specific public domain
    pub async fn with_domain(domain: &str) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: domain.to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            delivery: config::DeliveryConfig {
                workers: 2,
                timeout_seconds: 5,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client; redirects are not followed so tests can
        // inspect 303 responses and their cookies directly.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = perch::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Run the one-time setup flow over HTTP
    pub async fn setup_account(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/setup/complete"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .unwrap()
    }

    /// Log in over HTTP and return the session cookie pair, if granted
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        let response = self
            .client
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .unwrap();

        if response.status() != reqwest::StatusCode::SEE_OTHER {
            return None;
        }

        response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|pair| pair.to_string())
    }

    /// Create a post over HTTP with the given session cookie
    pub async fn create_post(&self, session_cookie: &str, content: &str) -> reqwest::Response {
        self.client
            .post(self.url("/post/create"))
            .header(reqwest::header::COOKIE, session_cookie)
            .form(&[("content", content)])
            .send()
            .await
            .unwrap()
    }
}
