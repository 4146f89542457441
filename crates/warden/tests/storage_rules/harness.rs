// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Storage Rules Test Harness
//!
//! Provides `TestEnv` for spinning up an in-process Warden server and
//! driving it over HTTP as an anonymous, authenticated or admin client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warden_api::{create_router, AppState};
use warden_core::Config;
use warden_storage::{MemoryStore, ObjectStore};

/// Content type every well-formed upload declares.
pub const CONTENT_TYPE: &str = "image/png";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn fake_png(len: usize) -> Vec<u8> {
    let mut data = PNG_SIGNATURE.to_vec();
    data.extend((0..len.saturating_sub(PNG_SIGNATURE.len())).map(|i| (i % 251) as u8));
    data
}

/// A small icon, well under the upload ceiling.
pub fn load_icon_image() -> Vec<u8> {
    fake_png(2 * 1024)
}

/// An icon above the 100 KiB ceiling.
pub fn load_big_icon_image() -> Vec<u8> {
    fake_png(150 * 1024)
}

/// Declared length of the 500 MB upload.
pub const FIVE_HUNDRED_MB: u64 = 500 * 1024 * 1024;

/// Anything that can be judged as a success or failure.
pub trait Outcome {
    /// Whether the operation succeeded.
    fn succeeded(&self) -> bool;
    /// Short description for assertion messages.
    fn describe(&self) -> String;
}

impl Outcome for reqwest::Result<Response> {
    fn succeeded(&self) -> bool {
        matches!(self, Ok(r) if r.status().is_success())
    }

    fn describe(&self) -> String {
        match self {
            Ok(r) => format!("status {}", r.status()),
            Err(e) => format!("error {e}"),
        }
    }
}

impl Outcome for std::io::Result<StatusCode> {
    fn succeeded(&self) -> bool {
        matches!(self, Ok(s) if s.is_success())
    }

    fn describe(&self) -> String {
        match self {
            Ok(s) => format!("status {s}"),
            Err(e) => format!("error {e}"),
        }
    }
}

/// Panics unless the operation succeeded.
pub fn assert_succeeds<T: Outcome>(outcome: T) {
    assert!(outcome.succeeded(), "expected success, got {}", outcome.describe());
}

/// Panics unless the operation failed.
pub fn assert_fails<T: Outcome>(outcome: T) {
    assert!(!outcome.succeeded(), "expected failure, got {}", outcome.describe());
}

/// Like [`assert_succeeds`], handing the outcome back for inspection.
#[must_use]
pub fn expect_success<T: Outcome>(outcome: T) -> T {
    assert!(outcome.succeeded(), "expected success, got {}", outcome.describe());
    outcome
}

/// Like [`assert_fails`], handing the outcome back for inspection.
#[must_use]
pub fn expect_failure<T: Outcome>(outcome: T) -> T {
    assert!(!outcome.succeeded(), "expected failure, got {}", outcome.describe());
    outcome
}

/// A running server plus the means to talk to it.
pub struct TestEnv {
    /// The endpoint URL of the test server.
    pub endpoint: String,
    /// The server address.
    pub addr: SocketAddr,
    /// The admin token the server accepts.
    pub admin_token: String,
    client: Client,
    _server_handle: JoinHandle<()>,
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Start a server with the default configuration and an in-memory store.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Start a server with `config` and an in-memory store.
    pub async fn with_config(config: Config) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new())).await
    }

    /// Start a server with `config` backed by `store`.
    pub async fn with_store(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let rules = config.load_rules().expect("Failed to load rules");
        let state = AppState::new(store, Arc::new(rules), config.server.max_body_size);
        let app = create_router(state, false, &config.auth);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to build client");

        Self {
            endpoint: format!("http://{addr}"),
            addr,
            admin_token: config.auth.admin_token.clone(),
            client,
            _server_handle: handle,
            _shutdown_tx: shutdown_tx,
        }
    }

    fn context(&self, token: Option<String>) -> StorageContext {
        StorageContext {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            addr: self.addr,
            token,
        }
    }

    /// A client with no credentials.
    pub fn unauthenticated(&self) -> StorageContext {
        self.context(None)
    }

    /// A client signed in as `user_id`.
    pub fn authenticated(&self, user_id: &str) -> StorageContext {
        self.context(Some(user_id.to_string()))
    }

    /// A client whose requests skip the rules.
    pub fn rules_disabled(&self) -> StorageContext {
        self.context(Some(self.admin_token.clone()))
    }

    /// Remove every object.
    pub async fn clear_storage(&self) {
        let response =
            self.rules_disabled().request(reqwest::Method::DELETE, "/admin/objects").send().await;
        assert_succeeds(response);
    }

    /// Upload the small icon to `users/{user_id}/{name}` with rules disabled.
    pub async fn seed_icon(&self, user_id: &str, name: &str) {
        let image = self.rules_disabled().user_image(user_id, name);
        assert_succeeds(image.put(load_icon_image(), Some(CONTENT_TYPE)).await);
    }
}

/// A client identity bound to a running server.
#[derive(Clone)]
pub struct StorageContext {
    client: Client,
    endpoint: String,
    addr: SocketAddr,
    token: Option<String>,
}

impl StorageContext {
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.endpoint));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Reference to any object path.
    pub fn object(&self, path: &str) -> ObjectRef {
        ObjectRef { ctx: self.clone(), path: path.to_string() }
    }

    /// Reference to `users/{user_id}/{name}`.
    pub fn user_image(&self, user_id: &str, name: &str) -> ObjectRef {
        self.object(&format!("users/{user_id}/{name}"))
    }

    /// List `users/{user_id}`.
    pub async fn list_user_images(&self, user_id: &str) -> reqwest::Result<Response> {
        self.list(&format!("users/{user_id}")).await
    }

    /// List a directory.
    pub async fn list(&self, prefix: &str) -> reqwest::Result<Response> {
        self.request(reqwest::Method::GET, "/o").query(&[("prefix", prefix)]).send().await
    }

    /// Fetch bytes from a download URL returned by the server.
    pub async fn download(&self, url: &str) -> reqwest::Result<Response> {
        self.request(reqwest::Method::GET, url).send().await
    }
}

/// An object path as seen by one client.
pub struct ObjectRef {
    ctx: StorageContext,
    path: String,
}

impl ObjectRef {
    fn url(&self) -> String {
        format!("/o/{}", self.path)
    }

    /// Upload `data`, declaring `content_type` when given.
    pub async fn put(
        &self,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> reqwest::Result<Response> {
        let mut builder = self.ctx.request(reqwest::Method::PUT, &self.url()).body(data);
        if let Some(ct) = content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, ct);
        }
        builder.send().await
    }

    /// Start an upload declaring `len` bytes and return the status the
    /// server answers with before any body byte is sent.
    pub async fn put_declared(&self, len: u64, content_type: &str) -> std::io::Result<StatusCode> {
        self.put_raw(&format!("Content-Length: {len}"), content_type, &[]).await
    }

    /// Upload `data` with chunked transfer encoding, so no length is declared.
    pub async fn put_chunked(
        &self,
        data: &[u8],
        content_type: &str,
    ) -> std::io::Result<StatusCode> {
        let mut body = format!("{:x}\r\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n0\r\n\r\n");
        self.put_raw("Transfer-Encoding: chunked", content_type, &body).await
    }

    async fn put_raw(
        &self,
        framing: &str,
        content_type: &str,
        body: &[u8],
    ) -> std::io::Result<StatusCode> {
        let mut stream = TcpStream::connect(self.ctx.addr).await?;
        let auth = self
            .ctx
            .token
            .as_ref()
            .map(|t| format!("Authorization: Bearer {t}\r\n"))
            .unwrap_or_default();
        let mut head = format!("PUT {} HTTP/1.1\r\nHost: {}\r\n{auth}", self.url(), self.ctx.addr);
        head.push_str(&format!("Content-Type: {content_type}\r\n{framing}\r\n\r\n"));
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(body).await?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 512];
        while !buf.windows(2).any(|w| w == b"\r\n") {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "no status line",
                ));
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let line = String::from_utf8_lossy(&buf);
        line.split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "bad status line"))
    }

    /// Fetch metadata; succeeds only when a download URL is granted.
    pub async fn get_download_url(&self) -> reqwest::Result<Response> {
        self.ctx.request(reqwest::Method::GET, &self.url()).send().await
    }

    /// Fetch metadata and return the download URL.
    pub async fn download_url(&self) -> String {
        let response = expect_success(self.get_download_url().await).expect("checked above");
        let body: Value = response.json().await.expect("metadata JSON");
        body["downloadUrl"].as_str().expect("downloadUrl present").to_string()
    }

    /// Patch metadata with `update`.
    pub async fn update_metadata(&self, update: Value) -> reqwest::Result<Response> {
        self.ctx.request(reqwest::Method::PATCH, &self.url()).json(&update).send().await
    }

    /// Delete the object.
    pub async fn delete(&self) -> reqwest::Result<Response> {
        self.ctx.request(reqwest::Method::DELETE, &self.url()).send().await
    }
}
