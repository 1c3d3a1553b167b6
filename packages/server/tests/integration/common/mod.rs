use std::net::SocketAddr;
use std::sync::Arc;

use ::common::storage::filesystem::FilesystemBlobStore;
use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tempfile::TempDir;

use server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig, StorageConfig,
};
use server::state::AppState;

pub const MAX_BLOB_SIZE: u64 = 10 * 1024 * 1024;

pub mod routes {
    pub const REGISTER: &str = "/api/users/register";
    pub const LOGIN: &str = "/api/users/login";
    pub const PROFILE: &str = "/api/users/profile";
    pub const IMAGES: &str = "/api/images";
    pub const UPLOAD: &str = "/api/images/upload";

    pub fn image(id: &str) -> String {
        format!("/api/images/{id}")
    }

    pub fn search(q: &str) -> String {
        format!("/api/images/search?q={q}")
    }
}

/// Status code plus parsed JSON body.
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// A served application instance backed by a temp SQLite database and a
/// temp blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let database = DatabaseConfig {
            url: db_url,
            max_connections: 5,
            min_connections: 1,
        };
        let db = server::database::init_db(&database)
            .await
            .expect("Failed to initialize test database");

        let blob_store = FilesystemBlobStore::new(dir.path().join("blobs"), MAX_BLOB_SIZE)
            .await
            .expect("Failed to create blob store");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: Vec::new(),
                    max_age: 3600,
                },
            },
            database: database.clone(),
            auth: AuthConfig {
                jwt_secret: "integration_test_secret".into(),
            },
            storage: StorageConfig {
                root_dir: dir.path().join("blobs").display().to_string(),
                max_blob_size: MAX_BLOB_SIZE,
            },
        };

        let state = AppState::new(db.clone(), Arc::new(blob_store), Arc::new(config));
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server crashed");
        });

        Self {
            addr,
            client: Client::new(),
            db,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn api(res: reqwest::Response) -> ApiResponse {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        ApiResponse { status, body }
    }

    pub async fn post_json(&self, path: &str, body: Value) -> ApiResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed");
        Self::api(res).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> ApiResponse {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Self::api(req.send().await.expect("Request failed")).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> ApiResponse {
        let mut req = self.client.delete(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Self::api(req.send().await.expect("Request failed")).await
    }

    /// Raw GET for streaming endpoints: status, headers, and body bytes.
    pub async fn get_raw(
        &self,
        path: &str,
        if_none_match: Option<&str>,
    ) -> (u16, reqwest::header::HeaderMap, Vec<u8>) {
        let mut req = self.client.get(self.url(path));
        if let Some(etag) = if_none_match {
            req = req.header("If-None-Match", etag);
        }
        let res = req.send().await.expect("Request failed");
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.expect("Failed to read body").to_vec();
        (status, headers, bytes)
    }

    pub async fn register(&self, username: &str, password: &str) -> ApiResponse {
        self.post_json(
            routes::REGISTER,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Register a fresh user and return a bearer token for it.
    pub async fn register_and_login(&self, username: &str) -> String {
        let res = self.register(username, "password123").await;
        assert_eq!(res.status, 201, "registration failed: {}", res.body);

        let res = self
            .post_json(
                routes::LOGIN,
                json!({ "username": username, "password": "password123" }),
            )
            .await;
        assert_eq!(res.status, 200, "login failed: {}", res.body);
        res.body["token"].as_str().expect("token missing").to_string()
    }

    /// Upload an image via multipart. `tags` is the raw comma-separated
    /// form value.
    pub async fn upload_image(
        &self,
        token: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
        description: Option<&str>,
        tags: Option<&str>,
    ) -> ApiResponse {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .expect("Invalid test content type");

        let mut form = reqwest::multipart::Form::new().part("image", part);
        if let Some(description) = description {
            form = form.text("description", description.to_string());
        }
        if let Some(tags) = tags {
            form = form.text("tags", tags.to_string());
        }

        let res = self
            .client
            .post(self.url(routes::UPLOAD))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed");
        Self::api(res).await
    }
}
