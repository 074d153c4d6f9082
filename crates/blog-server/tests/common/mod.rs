#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use blog_server::{
    auth::create_access_token,
    content::MemoryBlobStore,
    create_router,
    store::MemoryPostStore,
    AppState, Config,
};
use blog_shared::Role;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "memory".to_string(),
        jwt_secret: SECRET.to_string(),
        port: 0,
        asset_dir: std::env::temp_dir().join("blog-server-tests"),
        asset_url_prefix: "/blogImages".to_string(),
        max_thread_depth: 3,
        mutation_max_retries: 32,
        seed_default_thread: true,
        fetch_remote_assets: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub blobs: Arc<MemoryBlobStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = AppState::new(Arc::new(MemoryPostStore::new()), blobs.clone(), config);
        Self {
            router: create_router(state),
            blobs,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        send(self.router.clone(), request).await
    }

    pub async fn create_post(&self, user: &TestUser, title: &str, content: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/ped/blogs",
                Some(user),
                Some(serde_json::json!({ "title": title, "content": content, "category": "Tech" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn new(username: &str, role: Role) -> Self {
        let id = Uuid::new_v4();
        let token = create_access_token(id, username, &role, SECRET, 3600).unwrap();
        Self {
            id,
            username: username.to_string(),
            token,
        }
    }

    pub fn user(username: &str) -> Self {
        Self::new(username, Role::User)
    }

    pub fn admin(username: &str) -> Self {
        Self::new(username, Role::Admin)
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}
