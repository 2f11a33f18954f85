//! End-to-end tests of the upload pipeline: spooled source file in,
//! deployed site directory out, temp state gone afterwards regardless of
//! outcome.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use site_host::models::upload::{UploadKind, UploadRequest};
use site_host::services::upload_service::{UploadError, UploadLimits, UploadService};
use tempfile::TempDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

fn service(sites_dir: &Path) -> UploadService {
    UploadService::new(sites_dir, UploadLimits::default())
}

fn spool(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn build_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join("upload.zip");
    let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, body) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap();
    path
}

fn request(source: PathBuf, kind: UploadKind, name: &str) -> UploadRequest {
    let size_bytes = fs::metadata(&source).map(|m| m.len()).unwrap_or(0);
    UploadRequest {
        source_path: source,
        kind,
        owner_id: "u1".into(),
        site_id: "s1".into(),
        original_file_name: name.into(),
        size_bytes,
    }
}

/// No `.staging-*` directory may survive a call, success or failure.
fn assert_no_staging_left(sites_dir: &Path) {
    for entry in fs::read_dir(sites_dir).unwrap() {
        let name = entry.unwrap().file_name();
        assert!(
            !name.to_string_lossy().starts_with(".staging-"),
            "staging dir leaked: {name:?}"
        );
    }
}

#[tokio::test]
async fn html_upload_deploys_sanitized_index() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = service(sites_dir.path());

    let source = spool(spool_dir.path(), "page.html", b"<h1>hi</h1>");
    let summary = svc
        .process_upload(request(source.clone(), UploadKind::Html, "page.html"))
        .await
        .unwrap();

    assert_eq!(summary.kind, UploadKind::Html);
    assert_eq!(summary.files, vec!["index.html".to_string()]);
    assert!(summary.total_size_bytes > 0);
    assert!(summary.has_index_html);

    let deployed = sites_dir.path().join("u1/s1/index.html");
    let content = fs::read_to_string(deployed).unwrap();
    assert!(content.contains("<h1>hi</h1>"));

    assert!(!source.exists(), "source temp file leaked");
}

#[tokio::test]
async fn html_upload_neutralizes_scripts_on_disk() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = service(sites_dir.path());

    let source = spool(
        spool_dir.path(),
        "page.html",
        b"<h1>ok</h1><script>alert(1)</script>",
    );
    svc.process_upload(request(source, UploadKind::Html, "page.html"))
        .await
        .unwrap();

    let content = fs::read_to_string(sites_dir.path().join("u1/s1/index.html")).unwrap();
    assert!(!content.contains("<script"));
    assert!(content.contains("<h1>ok</h1>"));
}

#[tokio::test]
async fn zip_upload_deploys_whole_bundle() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = service(sites_dir.path());

    let source = build_zip(
        spool_dir.path(),
        &[
            ("index.html", b"<h1>site</h1><script>alert(1)</script>" as &[u8]),
            ("assets/style.css", b"body { color: red }"),
        ],
    );
    let summary = svc
        .process_upload(request(source.clone(), UploadKind::Zip, "upload.zip"))
        .await
        .unwrap();

    assert_eq!(summary.kind, UploadKind::Zip);
    assert!(summary.has_index_html);
    assert_eq!(
        summary.files,
        vec!["index.html".to_string(), "assets/style.css".to_string()]
    );

    let index = fs::read_to_string(sites_dir.path().join("u1/s1/index.html")).unwrap();
    assert!(!index.contains("<script"));
    assert!(index.contains("<h1>site</h1>"));

    let css = fs::read(sites_dir.path().join("u1/s1/assets/style.css")).unwrap();
    assert_eq!(css, b"body { color: red }");

    assert!(!source.exists(), "source temp file leaked");
    assert_no_staging_left(sites_dir.path());
}

#[tokio::test]
async fn validation_failure_still_removes_the_source() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = service(sites_dir.path());

    let source = spool(spool_dir.path(), "notes.txt", b"hello");
    let err = svc
        .process_upload(request(source.clone(), UploadKind::Html, "notes.txt"))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::WrongExtension { .. }));
    assert!(!source.exists(), "source temp file leaked");
    assert!(!sites_dir.path().join("u1").exists(), "site dir was created");
}

#[tokio::test]
async fn traversal_zip_is_rejected_and_cleaned_up() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = service(sites_dir.path());

    let source = build_zip(
        spool_dir.path(),
        &[
            ("index.html", b"<h1>ok</h1>" as &[u8]),
            ("../../etc/passwd.txt", b"root"),
        ],
    );
    let err = svc
        .process_upload(request(source.clone(), UploadKind::Zip, "upload.zip"))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Extraction(_)));
    assert!(!source.exists(), "source temp file leaked");
    assert_no_staging_left(sites_dir.path());
    assert!(!sites_dir.path().join("u1").exists(), "site dir was created");
}

#[tokio::test]
async fn zip_without_index_is_rejected_and_cleaned_up() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = service(sites_dir.path());

    let source = build_zip(
        spool_dir.path(),
        &[("style.css", b"body{}" as &[u8]), ("app.js", b"1;")],
    );
    let err = svc
        .process_upload(request(source.clone(), UploadKind::Zip, "upload.zip"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("index.html"));
    assert!(!source.exists(), "source temp file leaked");
    assert_no_staging_left(sites_dir.path());
}

#[tokio::test]
async fn oversize_upload_is_rejected_before_any_write() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = UploadService::new(
        sites_dir.path(),
        UploadLimits {
            max_html_bytes: 8,
            max_zip_bytes: 8,
        },
    );

    let source = spool(spool_dir.path(), "page.html", b"<h1>too big</h1>");
    let err = svc
        .process_upload(request(source.clone(), UploadKind::Html, "page.html"))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::SizeExceeded { limit: 8 }));
    assert!(!source.exists(), "source temp file leaked");
    assert!(!sites_dir.path().join("u1").exists(), "site dir was created");
}

#[tokio::test]
async fn second_upload_overwrites_file_by_file() {
    let spool_dir = TempDir::new().unwrap();
    let sites_dir = TempDir::new().unwrap();
    let svc = service(sites_dir.path());

    let first = build_zip(
        spool_dir.path(),
        &[
            ("index.html", b"<h1>v1</h1>" as &[u8]),
            ("old.css", b"body{}"),
        ],
    );
    svc.process_upload(request(first, UploadKind::Zip, "upload.zip"))
        .await
        .unwrap();

    let second = build_zip(spool_dir.path(), &[("index.html", b"<h1>v2</h1>" as &[u8])]);
    svc.process_upload(request(second, UploadKind::Zip, "upload.zip"))
        .await
        .unwrap();

    let index = fs::read_to_string(sites_dir.path().join("u1/s1/index.html")).unwrap();
    assert!(index.contains("<h1>v2</h1>"));
    // Deployment is file-by-file, not atomic tree replacement: files from
    // the first upload that the second one does not mention stay in place.
    assert!(sites_dir.path().join("u1/s1/old.css").exists());
}
