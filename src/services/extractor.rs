//! ZIP extraction with whole-unit trust semantics.
//!
//! A bundle is one deployable unit: any unsafe path, any disallowed file
//! type, or any I/O fault aborts the entire extraction rather than skipping
//! the offending entry. Partial trust is not offered. The caller runs this
//! synchronous code under `spawn_blocking` and discards the staging
//! directory on failure.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

use super::upload_service::UploadError;
use crate::models::upload::ExtractionResult;

/// File types a bundle may contain. One entry outside this set rejects the
/// whole archive.
pub const BUNDLE_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "json", "png", "jpg", "jpeg", "gif", "svg", "webp", "woff",
    "woff2", "ttf", "otf", "txt", "md",
];

/// Extract `zip_path` into `dest_dir`, entry by entry in archive order.
///
/// Directory entries are skipped. For each file entry, the path is checked
/// for traversal, the extension against [`BUNDLE_EXTENSIONS`], and only then
/// are parent directories created and bytes streamed to disk. After the last
/// entry the archive must have produced an `index.html` somewhere, or the
/// whole result is a failure.
pub fn extract_archive(zip_path: &Path, dest_dir: &Path) -> Result<ExtractionResult, UploadError> {
    let file = File::open(zip_path)
        .map_err(|err| UploadError::Extraction(format!("cannot open archive: {err}")))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|err| UploadError::Extraction(format!("unreadable archive: {err}")))?;

    let mut files = Vec::new();
    let mut has_index_html = false;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| UploadError::Extraction(format!("corrupt archive entry: {err}")))?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let relative = safe_entry_path(entry.enclosed_name(), &name)?;

        let extension = relative
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !BUNDLE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(UploadError::Extraction(format!(
                "archive entry `{name}` has a disallowed file type"
            )));
        }

        if relative
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case("index.html"))
        {
            has_index_html = true;
        }

        let out_path = dest_dir.join(&relative);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                UploadError::Extraction(format!("cannot create directory for `{name}`: {err}"))
            })?;
        }
        let mut out_file = File::create(&out_path)
            .map_err(|err| UploadError::Extraction(format!("cannot create `{name}`: {err}")))?;
        io::copy(&mut entry, &mut out_file)
            .map_err(|err| UploadError::Extraction(format!("failed extracting `{name}`: {err}")))?;

        files.push(relative.to_string_lossy().into_owned());
    }

    if !has_index_html {
        return Err(UploadError::Extraction(
            "archive must contain an index.html".into(),
        ));
    }

    Ok(ExtractionResult {
        files,
        has_index_html,
    })
}

/// Normalize and vet one entry path before any filesystem write.
///
/// `enclosed_name` already refuses traversal and absolute paths; the
/// component walk keeps that guarantee explicit and local.
fn safe_entry_path(enclosed: Option<PathBuf>, name: &str) -> Result<PathBuf, UploadError> {
    // A backslash is a path separator on Windows but an ordinary name byte
    // on Unix, so an entry containing one lands at a different path than
    // its name suggests. Ambiguity here is refused outright.
    if name.contains('\\') {
        return Err(UploadError::Extraction(format!(
            "unsafe path in archive: `{name}`"
        )));
    }
    let path = enclosed
        .ok_or_else(|| UploadError::Extraction(format!("unsafe path in archive: `{name}`")))?;
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            _ => {
                return Err(UploadError::Extraction(format!(
                    "unsafe path in archive: `{name}`"
                )));
            }
        }
    }
    Ok(path)
}
