use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the provisioning and launch pipeline.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Network/timeout failure on one artifact. Non-fatal to its category.
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    // ── Manifest ────────────────────────────────────────
    /// Version manifest or asset index could not be fetched or parsed.
    #[error("Manifest error: {0}")]
    Manifest(String),

    // ── Integrity ───────────────────────────────────────
    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    Integrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Java ────────────────────────────────────────────
    /// No valid runtime on the host. Triggers provisioning.
    #[error("No compatible Java runtime found: {0}")]
    Discovery(String),

    /// Runtime fetch/extract failure. Fatal to the launch attempt.
    #[error("Java provisioning failed: {0}")]
    Provision(String),

    // ── Launch ──────────────────────────────────────────
    #[error("Launch failed: {0}")]
    Launch(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable kind, used as the error tag in worker envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            LauncherError::Io { .. } => "io",
            LauncherError::Http(_) | LauncherError::Fetch { .. } => "fetch",
            LauncherError::Manifest(_) => "manifest",
            LauncherError::Integrity { .. } => "integrity",
            LauncherError::Discovery(_) => "discovery",
            LauncherError::Provision(_) => "provision",
            LauncherError::Launch(_) => "launch",
            LauncherError::Json(_) => "json",
            LauncherError::Zip(_) => "zip",
            LauncherError::Other(_) => "other",
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for worker envelopes ─────────────────
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
