//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use lodge_core::config::AppConfig;
use lodge_metadata::{MetadataStore, SqliteStore};
use lodge_render::PdfRenderer;
use lodge_server::{AppState, create_router};
use lodge_storage::{FilesystemBackend, ImageAreas, ObjectStore};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

/// The real backends a test server was built on, for wrapping.
#[allow(dead_code)]
pub struct Backends {
    pub temp: Arc<dyn ObjectStore>,
    pub permanent: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary image areas and database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::with_backends(modifier, |backends| backends).await
    }

    /// Create a test server whose backends are replaced by `wrap`.
    pub async fn with_backends<F, W>(modifier: F, wrap: W) -> Self
    where
        F: FnOnce(&mut AppConfig),
        W: FnOnce(Backends) -> Backends,
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing(temp_dir.path());
        modifier(&mut config);

        let temp: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&config.images.temp_dir)
                .await
                .expect("Failed to create temp area"),
        );
        let permanent: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&config.images.permanent_dir)
                .await
                .expect("Failed to create permanent area"),
        );
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&config.metadata.path, config.metadata.busy_timeout_secs)
                .await
                .expect("Failed to create metadata store"),
        );

        let backends = wrap(Backends {
            temp,
            permanent,
            metadata,
        });

        let areas = ImageAreas {
            temp: backends.temp,
            permanent: backends.permanent,
        };
        let state = AppState::new(
            config,
            areas,
            backends.metadata,
            Arc::new(PdfRenderer::default()),
        );
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// The temp image area.
    pub fn temp_area(&self) -> Arc<dyn ObjectStore> {
        self.state.images.temp_area().clone()
    }

    /// The permanent image area.
    pub fn permanent_area(&self) -> Arc<dyn ObjectStore> {
        self.state.images.permanent_area().clone()
    }

    /// Send a JSON request and decode the JSON response.
    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let (status, _, bytes) = self.raw_request(builder.body(body).unwrap()).await;
        let json: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Send a request and return status, headers and the raw body.
    pub async fn raw_request(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    /// Upload an image through the multipart endpoint.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let (boundary, body) = super::fixtures::multipart_body("image", file_name, content_type, data);
        let request = Request::builder()
            .method("POST")
            .uri("/upload/temp-room-image")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, _, bytes) = self.raw_request(request).await;
        (
            status,
            serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        )
    }

    /// Create a room and return its JSON representation.
    pub async fn create_room(&self, name: &str, capacity: i64) -> Value {
        let (status, room) = self
            .json_request(
                "POST",
                "/rooms",
                Some(serde_json::json!({
                    "name": name,
                    "description": format!("{name} description"),
                    "capacity": capacity,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create room failed: {room}");
        room
    }

    /// Upload an image and finalize it for `room_id`, returning the response.
    pub async fn upload_and_finalize(&self, room_id: i64, file_name: &str) -> (StatusCode, Value) {
        let (status, upload) = self.upload(file_name, "image/jpeg", b"\xFF\xD8\xFFjpeg").await;
        assert_eq!(status, StatusCode::OK, "upload failed: {upload}");
        self.json_request(
            "POST",
            "/upload/finalize-room-image",
            Some(serde_json::json!({
                "roomId": room_id,
                "tempImageUrl": upload["tempImageUrl"],
            })),
        )
        .await
    }
}
