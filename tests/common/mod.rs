#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use time::Duration;
use tower::ServiceExt;

use likes::app::auth::Registry;
use likes::app::posts::MemoryCatalog;
use likes::app::tokens::TokenIssuer;
use likes::app::users::{MemoryUserStore, UserStorePtr};
use likes::config::decode_key_32;
use likes::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// "0123456789abcdef0123456789abcdef" (32 bytes, test-only)
pub const TEST_TOKEN_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
pub const DEFAULT_PASSWORD: &str = "testpassword123";
pub const TOKEN_LIFETIME_SECONDS: i64 = 120;

pub fn test_key() -> [u8; 32] {
    decode_key_32(TEST_TOKEN_KEY).expect("test key must decode")
}

pub fn test_tokens() -> TokenIssuer {
    TokenIssuer::new(test_key(), Duration::seconds(TOKEN_LIFETIME_SECONDS))
}

// ---------------------------------------------------------------------------
// TestApp — router over fresh in-memory stores, one per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub catalog: Arc<MemoryCatalog>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

pub struct TestUser {
    pub username: String,
    pub access_token: String,
}

pub enum TestBody {
    Json(Value),
    Form(String),
}

pub fn app() -> TestApp {
    TestApp::setup()
}

/// App whose registry runs on `store` instead of the in-memory user store.
/// `TestApp::users` is then left unwired.
pub fn app_with_user_store(store: UserStorePtr) -> TestApp {
    TestApp::build(Arc::new(MemoryUserStore::new()), store)
}

impl TestApp {
    fn setup() -> Self {
        let users = Arc::new(MemoryUserStore::new());
        Self::build(users.clone(), users)
    }

    fn build(users: Arc<MemoryUserStore>, store: UserStorePtr) -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        let registry = Registry::new(store, test_tokens());
        let state = AppState::new(registry, catalog.clone());
        let router = likes::http::router(state.clone());

        TestApp {
            router,
            state,
            users,
            catalog,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<TestBody>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {}", t));
        }

        let request = match body {
            Some(TestBody::Json(body)) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            Some(TestBody::Form(body)) => builder
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(TestBody::Json(body)), token)
            .await
    }

    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        self.request(Method::POST, path, Some(TestBody::Form(body)), None)
            .await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, None, token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Sign a user up through the registry and issue them a token.
    pub async fn create_user(&self, username: &str) -> TestUser {
        self.registry()
            .signup(username, DEFAULT_PASSWORD)
            .await
            .expect("signup failed");
        let token = self
            .registry()
            .tokens()
            .issue(username)
            .expect("issue failed");

        TestUser {
            username: username.to_string(),
            access_token: token.token,
        }
    }

    /// Create a post for `author` directly in the catalog. Returns its id.
    pub async fn create_post(&self, author: &TestUser) -> i64 {
        use likes::app::posts::Catalog;
        use likes::domain::post::NewPost;

        self.catalog
            .make_post(
                &author.username,
                NewPost {
                    title: "hi".to_string(),
                    description: "world".to_string(),
                },
            )
            .await
            .expect("make_post failed")
    }
}
