//! UploadService — the upload ingestion and deployment pipeline.
//!
//! One call to [`UploadService::process_upload`] takes a spooled upload
//! through validate → (sanitize | extract + sanitize-per-file) → deploy,
//! then unconditionally removes the temp inputs. The durable output is the
//! site directory at `sites_dir/{owner_id}/{site_id}`; everything else is
//! ephemeral. No database access happens here.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::{fs, task};
use tracing::{debug, warn};
use uuid::Uuid;

use super::extractor;
use super::sanitizer::HtmlSanitizer;
use crate::models::upload::{DeploymentSummary, UploadKind, UploadRequest};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file was uploaded")]
    MissingFile,
    #[error("invalid file type: expected {expected}")]
    WrongExtension { expected: &'static str },
    #[error("file too large: limit is {limit} bytes")]
    SizeExceeded { limit: u64 },
    #[error("invalid owner or site identifier")]
    InvalidIdentifier,
    #[error("{0}")]
    Extraction(String),
    #[error("failed to sanitize html: {0}")]
    Sanitization(String),
    #[error("destination path escapes the site directory")]
    PathEscape,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Per-kind upload size ceilings, supplied from configuration.
#[derive(Clone, Copy, Debug)]
pub struct UploadLimits {
    pub max_html_bytes: u64,
    pub max_zip_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_html_bytes: 5_000_000,
            max_zip_bytes: 25_000_000,
        }
    }
}

const MAX_ID_LEN: usize = 128;

/// Sequences one upload end to end. Holds no per-call state; constructed
/// once at startup and cloned into handlers.
#[derive(Clone)]
pub struct UploadService {
    /// Root directory all site directories live under.
    pub sites_dir: PathBuf,

    limits: UploadLimits,
    sanitizer: HtmlSanitizer,
}

impl UploadService {
    pub fn new(sites_dir: impl Into<PathBuf>, limits: UploadLimits) -> Self {
        Self {
            sites_dir: sites_dir.into(),
            limits,
            sanitizer: HtmlSanitizer::default(),
        }
    }

    /// Check the declared kind against the upload's name and size.
    ///
    /// Pure; performs no I/O. Exactly-at-ceiling sizes pass.
    pub fn validate(&self, req: &UploadRequest) -> UploadResult<()> {
        if req.original_file_name.trim().is_empty() {
            return Err(UploadError::MissingFile);
        }
        let extension = extension_of(&req.original_file_name);
        match req.kind {
            UploadKind::Html => {
                if !matches!(extension.as_deref(), Some("html") | Some("htm")) {
                    return Err(UploadError::WrongExtension {
                        expected: ".html or .htm",
                    });
                }
                if req.size_bytes > self.limits.max_html_bytes {
                    return Err(UploadError::SizeExceeded {
                        limit: self.limits.max_html_bytes,
                    });
                }
            }
            UploadKind::Zip => {
                if extension.as_deref() != Some("zip") {
                    return Err(UploadError::WrongExtension { expected: ".zip" });
                }
                if req.size_bytes > self.limits.max_zip_bytes {
                    return Err(UploadError::SizeExceeded {
                        limit: self.limits.max_zip_bytes,
                    });
                }
            }
        }
        Ok(())
    }

    /// Compute the site directory root for `(owner_id, site_id)`.
    ///
    /// Both identifiers are vetted against traversal characters before any
    /// path is built from them.
    pub fn site_root(&self, owner_id: &str, site_id: &str) -> UploadResult<PathBuf> {
        ensure_id_safe(owner_id)?;
        ensure_id_safe(site_id)?;
        Ok(self.sites_dir.join(owner_id).join(site_id))
    }

    /// Run the whole pipeline for one upload.
    ///
    /// The staging directory (ZIP path only) and the spooled source file are
    /// removed on every exit path; a failed removal is logged and never
    /// changes the outcome.
    pub async fn process_upload(&self, req: UploadRequest) -> UploadResult<DeploymentSummary> {
        let staging = self
            .sites_dir
            .join(format!(".staging-{}", Uuid::new_v4()));
        let result = self.run_upload(&req, &staging).await;
        self.cleanup(&req.source_path, &staging).await;
        result
    }

    async fn run_upload(
        &self,
        req: &UploadRequest,
        staging: &Path,
    ) -> UploadResult<DeploymentSummary> {
        self.validate(req)?;

        match req.kind {
            UploadKind::Html => {
                let raw = fs::read(&req.source_path).await?;
                let sanitized = self
                    .sanitizer
                    .sanitize(&String::from_utf8_lossy(&raw))?;
                let total_size_bytes = sanitized.len() as u64;
                self.write_html(&req.owner_id, &req.site_id, &sanitized)
                    .await?;
                Ok(DeploymentSummary {
                    kind: UploadKind::Html,
                    files: vec!["index.html".into()],
                    total_size_bytes,
                    has_index_html: true,
                })
            }
            UploadKind::Zip => {
                fs::create_dir_all(staging).await?;
                let zip_path = req.source_path.clone();
                let staging_dir = staging.to_path_buf();
                let extraction =
                    task::spawn_blocking(move || extractor::extract_archive(&zip_path, &staging_dir))
                        .await
                        .map_err(|err| {
                            UploadError::Extraction(format!("extraction task failed: {err}"))
                        })??;

                let (files, total_size_bytes) = self
                    .write_tree(&req.owner_id, &req.site_id, &extraction.files, staging)
                    .await?;
                Ok(DeploymentSummary {
                    kind: UploadKind::Zip,
                    files,
                    total_size_bytes,
                    has_index_html: extraction.has_index_html,
                })
            }
        }
    }

    /// Write sanitized content as the site's `index.html`, creating the site
    /// directory lazily.
    pub async fn write_html(
        &self,
        owner_id: &str,
        site_id: &str,
        sanitized: &str,
    ) -> UploadResult<PathBuf> {
        let root = self.site_root(owner_id, site_id)?;
        fs::create_dir_all(&root).await?;
        let path = root.join("index.html");
        fs::write(&path, sanitized).await?;
        debug!("wrote {}", path.display());
        Ok(path)
    }

    /// Deploy an extracted tree into the site directory.
    ///
    /// HTML files are sanitized on the way through; everything else is
    /// copied byte-for-byte. The containment check runs before every write;
    /// a violation aborts the remaining writes. Files already written by
    /// this call are not rolled back — a mid-tree failure can leave a
    /// partially updated site directory.
    pub async fn write_tree(
        &self,
        owner_id: &str,
        site_id: &str,
        files: &[String],
        staging: &Path,
    ) -> UploadResult<(Vec<String>, u64)> {
        let root = self.site_root(owner_id, site_id)?;
        fs::create_dir_all(&root).await?;

        let mut written = Vec::with_capacity(files.len());
        let mut total_size_bytes = 0u64;
        for relative in files {
            let dest = resolve_within(&root, relative)?;
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            let src = staging.join(relative);
            if matches!(
                extension_of(relative).as_deref(),
                Some("html") | Some("htm")
            ) {
                let raw = fs::read(&src).await?;
                let sanitized = self
                    .sanitizer
                    .sanitize(&String::from_utf8_lossy(&raw))?;
                total_size_bytes += sanitized.len() as u64;
                fs::write(&dest, sanitized).await?;
            } else {
                total_size_bytes += fs::copy(&src, &dest).await?;
            }
            written.push(relative.clone());
        }
        Ok((written, total_size_bytes))
    }

    /// Unconditional removal of the temp inputs. Failures here are
    /// CleanupWarnings: logged, never surfaced as the call's result.
    async fn cleanup(&self, source: &Path, staging: &Path) {
        match fs::remove_file(source).await {
            Ok(()) => debug!("removed upload source {}", source.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove upload source {}: {}", source.display(), err),
        }
        match fs::remove_dir_all(staging).await {
            Ok(()) => debug!("removed staging dir {}", staging.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove staging dir {}: {}", staging.display(), err),
        }
    }
}

/// Lowercased extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Join `relative` beneath `root`, refusing anything that would resolve
/// outside it. Checked before every deployment write.
pub fn resolve_within(root: &Path, relative: &str) -> UploadResult<PathBuf> {
    let rel = Path::new(relative);
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(UploadError::PathEscape),
        }
    }
    let dest = root.join(rel);
    if !dest.starts_with(root) {
        return Err(UploadError::PathEscape);
    }
    Ok(dest)
}

/// Identifier guard in the spirit of an object-key check: identifiers become
/// path segments, so anything path-like is refused outright.
fn ensure_id_safe(id: &str) -> UploadResult<()> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(UploadError::InvalidIdentifier);
    }
    if id.starts_with('.') || id.contains("..") {
        return Err(UploadError::InvalidIdentifier);
    }
    if id
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\' || b == b'\0')
    {
        return Err(UploadError::InvalidIdentifier);
    }
    Ok(())
}
