//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Origins allowed by CORS. An empty list allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Serve the temp and permanent image areas under their public URL prefixes.
    #[serde(default = "default_true")]
    pub serve_uploads: bool,
    /// Create the sample rooms on startup when the room table is empty.
    #[serde(default)]
    pub seed_sample_data: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
            metrics_enabled: true,
            serve_uploads: true,
            seed_sample_data: false,
        }
    }
}

/// Image area configuration.
///
/// The temp and permanent areas are separate directories. Public URLs are the
/// stored file name appended to the matching URL prefix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Directory holding uploads that have not been finalized yet.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Directory holding images attached to rooms.
    #[serde(default = "default_permanent_dir")]
    pub permanent_dir: PathBuf,
    /// Public URL prefix for the temp area.
    #[serde(default = "default_temp_url_prefix")]
    pub temp_url_prefix: String,
    /// Public URL prefix for the permanent area.
    #[serde(default = "default_permanent_url_prefix")]
    pub permanent_url_prefix: String,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Sniff the payload and reject it when it is recognisably not an image.
    /// Only the declared content type is checked when false.
    #[serde(default)]
    pub verify_magic_bytes: bool,
    /// Serialize finalize calls targeting the same room.
    /// When false, concurrent finalizes race and the last database write wins.
    #[serde(default = "default_true")]
    pub serialize_finalize: bool,
    /// Delete the previous permanent image of a room after a successful finalize.
    #[serde(default)]
    pub prune_replaced_images: bool,
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./uploads/rooms/temp")
}

fn default_permanent_dir() -> PathBuf {
    PathBuf::from("./uploads/rooms/permanent")
}

fn default_temp_url_prefix() -> String {
    "/uploads/rooms/temp".to_string()
}

fn default_permanent_url_prefix() -> String {
    "/uploads/rooms/permanent".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            permanent_dir: default_permanent_dir(),
            temp_url_prefix: default_temp_url_prefix(),
            permanent_url_prefix: default_permanent_url_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
            verify_magic_bytes: false,
            serialize_finalize: true,
            prune_replaced_images: false,
        }
    }
}

impl ImagesConfig {
    /// Validate image area invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.temp_dir == self.permanent_dir {
            return Err("images.temp_dir and images.permanent_dir must differ".to_string());
        }
        for (name, prefix) in [
            ("temp_url_prefix", &self.temp_url_prefix),
            ("permanent_url_prefix", &self.permanent_url_prefix),
        ] {
            if !prefix.starts_with('/') || prefix.ends_with('/') {
                return Err(format!(
                    "images.{name} must start with '/' and have no trailing slash: {prefix}"
                ));
            }
        }
        if self.temp_url_prefix == self.permanent_url_prefix {
            return Err(
                "images.temp_url_prefix and images.permanent_url_prefix must differ".to_string(),
            );
        }
        if self.max_upload_bytes == 0 {
            return Err("images.max_upload_bytes must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// SQLite database file path.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    /// Busy timeout in seconds while waiting on SQLite locks.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/lodge.db")
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// Full application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Image area configuration.
    #[serde(default)]
    pub images: ImagesConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Create a test configuration rooted in `root`.
    ///
    /// **For testing only.** Places both image areas and the database under
    /// the given directory, and disables seeding.
    pub fn for_testing(root: &std::path::Path) -> Self {
        Self {
            server: ServerConfig {
                allowed_origins: Vec::new(),
                ..ServerConfig::default()
            },
            images: ImagesConfig {
                temp_dir: root.join("uploads/rooms/temp"),
                permanent_dir: root.join("uploads/rooms/permanent"),
                ..ImagesConfig::default()
            },
            metadata: MetadataConfig {
                path: root.join("lodge.db"),
                ..MetadataConfig::default()
            },
        }
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.images.validate()
    }
}
