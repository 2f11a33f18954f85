//! Ephemeral types flowing through the upload pipeline.
//!
//! None of these are persisted; they exist for the duration of one
//! `process_upload` call. The durable state is the site directory tree.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The caller-asserted upload kind, validated against the actual file
/// extension before any processing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Html,
    Zip,
}

/// One upload call's worth of input, already spooled to a temp file by the
/// HTTP layer. The pipeline deletes `source_path` on every exit path.
#[derive(Debug)]
pub struct UploadRequest {
    /// Temp file holding the uploaded bytes.
    pub source_path: PathBuf,

    /// Declared upload kind.
    pub kind: UploadKind,

    /// Owner of the target site.
    pub owner_id: String,

    /// Target site identifier.
    pub site_id: String,

    /// Original file name as sent by the client, used only for validation.
    pub original_file_name: String,

    /// Size of the spooled upload in bytes.
    pub size_bytes: u64,
}

/// What came out of a ZIP archive, in archive order.
#[derive(Debug)]
pub struct ExtractionResult {
    /// Archive-relative paths of every extracted file, `/`-separated.
    pub files: Vec<String>,

    /// Whether any entry's basename was `index.html` (case-insensitive),
    /// at any depth. A bundle without one is rejected.
    pub has_index_html: bool,
}

/// The result surfaced to the caller after a successful deployment.
#[derive(Serialize, Debug)]
pub struct DeploymentSummary {
    /// Which pipeline branch ran.
    pub kind: UploadKind,

    /// Relative names of every file written into the site directory.
    pub files: Vec<String>,

    /// Aggregate byte size of all written files.
    pub total_size_bytes: u64,

    /// True for HTML uploads by construction, and for ZIP uploads once the
    /// extractor found an index page.
    pub has_index_html: bool,
}
