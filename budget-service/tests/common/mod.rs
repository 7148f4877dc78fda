#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use budget_service::config::{
    BudgetConfig, CorsConfig, GenaiConfig, StorageMode, UploadConfig, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_MAX_FILE_BYTES,
};
use budget_service::services::providers::mock::MockTextProvider;
use budget_service::{build_router, AppState};
use service_core::config::Config as CoreConfig;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const ALLOWED_ORIGIN: &str = "https://budgeted.ruhangupta.com";
pub const LOCAL_ORIGIN: &str = "http://localhost:5173";
pub const BOUNDARY: &str = "----budget-test-boundary";

pub fn test_config(scratch_root: &Path, storage: StorageMode) -> BudgetConfig {
    BudgetConfig {
        common: CoreConfig {
            port: 0,
            log_level: "error".to_string(),
        },
        genai: GenaiConfig {
            api_key: "test-api-key".to_string(),
            text_model: "gemini-2.0-flash".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 5,
        },
        cors: CorsConfig {
            allowed_origins: vec![ALLOWED_ORIGIN.to_string(), LOCAL_ORIGIN.to_string()],
        },
        upload: UploadConfig {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            storage,
            scratch_root: scratch_root.to_path_buf(),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockTextProvider>,
    pub scratch_root: TempDir,
}

impl TestApp {
    pub fn spawn(provider: MockTextProvider) -> Self {
        Self::spawn_with(provider, StorageMode::Memory, |_| {})
    }

    pub fn spawn_with(
        provider: MockTextProvider,
        storage: StorageMode,
        customize: impl FnOnce(&mut BudgetConfig),
    ) -> Self {
        let scratch_root = tempfile::tempdir().expect("Failed to create scratch root");
        let mut config = test_config(scratch_root.path(), storage);
        customize(&mut config);

        let provider = Arc::new(provider);
        let router = build_router(AppState::new(config, provider.clone()));

        TestApp {
            router,
            provider,
            scratch_root,
        }
    }

    /// Number of per-request scratch directories still on disk.
    pub fn leftover_scratch_dirs(&self) -> usize {
        std::fs::read_dir(self.scratch_root.path())
            .expect("Failed to list scratch root")
            .count()
    }
}

/// Minimal `multipart/form-data` encoder for driving the router directly.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, mime_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {mime_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

pub fn multipart_request(origin: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Fake PDF of exactly `len` bytes.
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.resize(len, b'x');
    data
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
