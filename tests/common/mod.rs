#![allow(dead_code)]

use chrono::Utc;
use reqwest::{header, multipart, Client, Response};
use rita_aloe::build_app;
use rita_aloe::config::{Config, SeedAdmin};
use rita_aloe::entities::{admin, hash_password};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@rita-aloe.com";
pub const ADMIN_PASSWORD: &str = "aloe-vera-2024";
pub const FILE_SIZE_LIMIT: usize = 64 * 1024;
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n-fake-image-bytes";

/// Router served on an ephemeral port, backed by its own database file and
/// upload directory.
pub struct TestApp {
    pub base: String,
    pub client: Client,
    pub database_url: String,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let upload_dir = dir.path().join("uploads");

    let config = Config {
        database_url: database_url.clone(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "test-secret".to_string(),
        upload_dir: upload_dir.clone(),
        file_size_limit: FILE_SIZE_LIMIT,
        admin: SeedAdmin {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Rita".to_string(),
        },
    };

    let app = build_app(config).await.expect("Failed to build app");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        base: format!("http://{addr}"),
        client: Client::new(),
        database_url,
        upload_dir,
        _dir: dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn db(&self) -> DatabaseConnection {
        Database::connect(&self.database_url)
            .await
            .expect("Failed to connect to test database")
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/api/admin/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn token_for(&self, email: &str, password: &str) -> String {
        let body = self
            .login(email, password)
            .await
            .json::<Value>()
            .await
            .expect("Failed to parse response JSON");
        body["data"]["token"]
            .as_str()
            .expect("No token in login response")
            .to_string()
    }

    /// Inserts an extra admin account straight into the database.
    pub async fn add_admin(&self, email: &str, password: &str, role: admin::Role, is_active: bool) {
        let db = self.db().await;
        admin::ActiveModel {
            email: Set(email.to_string()),
            name: Set("Staff".to_string()),
            password: Set(hash_password(password).expect("Failed to hash")),
            role: Set(role),
            is_active: Set(is_active),
            last_login: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to insert admin");
    }

    pub async fn create_category(&self, token: &str, form: multipart::Form) -> Response {
        self.client
            .post(self.url("/api/admin/categories"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn update_category(&self, token: &str, id: i64, form: multipart::Form) -> Response {
        self.client
            .put(self.url(&format!("/api/admin/categories/{id}")))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn delete_category(&self, token: &str, id: i64) -> Response {
        self.client
            .delete(self.url(&format!("/api/admin/categories/{id}")))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Creates a category from name and optional parent, returning its JSON.
    pub async fn category(&self, token: &str, name: &str, parent: Option<i64>) -> Value {
        let mut form = multipart::Form::new().text("name", name.to_string());
        if let Some(parent) = parent {
            form = form.text("parent_category", parent.to_string());
        }
        let response = self.create_category(token, form).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json::<Value>().await.expect("Failed to parse response JSON")["data"].clone()
    }

    pub async fn create_product(&self, token: &str, data: Value) -> Response {
        let form = multipart::Form::new().text("data", data.to_string());
        self.client
            .post(self.url("/api/admin/products"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get_json(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request");
        let status = response.status();
        let body = response.json::<Value>().await.expect("Failed to parse response JSON");
        (status, body)
    }
}

pub fn png_part(file_name: &str) -> multipart::Part {
    multipart::Part::bytes(PNG_BYTES.to_vec())
        .file_name(file_name.to_string())
        .mime_str("image/png")
        .expect("Invalid mime")
}
