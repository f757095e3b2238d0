// Shared harness: an in-process router over a temp-dir database.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use waypost::config::{Config, ServiceRole};
use waypost::db;
use waypost::profiles::DynProfileProvisioner;
use waypost::routes;
use waypost::state::AppState;

pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub tmp: TempDir,
}

pub fn test_config(tmp: &TempDir, role: ServiceRole) -> Config {
    let mut config = Config::default();
    config.server.role = role;
    config.database.path = Some(tmp.path().join("waypost.db"));
    config.storage.path = Some(tmp.path().join("uploads"));
    config.auth.jwt_secret = SECRET.to_string();
    config.auth.bcrypt_cost = 4;
    config.profile_service.timeout_ms = 300;
    config
}

pub fn spawn_app(role: ServiceRole) -> TestApp {
    build(role, None)
}

pub fn spawn_app_with_provisioner(
    role: ServiceRole,
    provisioner: DynProfileProvisioner,
) -> TestApp {
    build(role, Some(provisioner))
}

fn build(role: ServiceRole, provisioner: Option<DynProfileProvisioner>) -> TestApp {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, role);
    let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let mut state = AppState::new(config, pool).unwrap();
    if let Some(provisioner) = provisioner {
        state = state.with_provisioner(provisioner);
    }
    TestApp {
        router: routes::router(state.clone()),
        state,
        tmp,
    }
}

/// One part of a multipart/form-data body.
pub enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

const BOUNDARY: &str = "waypost-test-boundary";

pub fn multipart_request(uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                    )
                    .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).unwrap())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body))
            .await
    }

    pub async fn register(&self, username: &str, full_name: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "username": username,
                "password": "hunter22",
                "fullName": full_name,
            })),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Register and log in; returns (account id, bearer token).
    pub async fn sign_up(&self, username: &str, full_name: &str) -> (i64, String) {
        let (status, body) = self.register(username, full_name).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let account_id = body["accountId"].as_i64().unwrap();

        let (status, body) = self.login(username, "hunter22").await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (account_id, body["token"].as_str().unwrap().to_string())
    }

    /// Text-only community post.
    pub async fn create_post(&self, token: &str, content: &str) -> (StatusCode, Value) {
        self.send(multipart_request(
            "/community/posts",
            token,
            &[Part::Text {
                name: "content",
                value: content,
            }],
        ))
        .await
    }

    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.state.db.get().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }
}
