//! HTTP handlers for site records and uploads.
//!
//! Uploads are spooled to a temp file before the pipeline runs, so the
//! multipart body is never held in memory; deployed files are streamed back
//! out with `ReaderStream`. Everything interesting happens in the services —
//! these handlers only translate between HTTP and the pipeline's types.

use crate::{
    errors::AppError,
    models::upload::{DeploymentSummary, UploadKind, UploadRequest},
    services::{AppState, upload_service},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Request body for `POST /sites`.
///
/// `owner_id` is caller-supplied: authentication happens upstream of this
/// service, which trusts its caller's identity claims.
#[derive(Debug, Deserialize)]
pub struct CreateSiteReq {
    pub owner_id: String,
    pub subdomain: String,
}

/// Query params accepted by the upload endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Declared upload kind, `html` or `zip`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// POST `/sites` — create a site record.
pub async fn create_site(
    State(state): State<AppState>,
    Json(req): Json<CreateSiteReq>,
) -> Result<impl IntoResponse, AppError> {
    let site = state.sites.create_site(&req.owner_id, &req.subdomain).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

/// DELETE `/sites/{site_id}` — drop the record and the deployed tree.
pub async fn delete_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.sites.delete_site(site_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/sites/{site_id}/upload?type=html|zip` — deploy an upload.
///
/// Expects a multipart body with a `file` field. The field is spooled to a
/// temp file whose lifecycle the pipeline owns from there on: it is removed
/// on every outcome, success or failure.
pub async fn upload_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<DeploymentSummary>, AppError> {
    let kind = match query.kind.as_str() {
        "html" => UploadKind::Html,
        "zip" => UploadKind::Zip,
        other => {
            return Err(AppError::new(
                StatusCode::BAD_REQUEST,
                format!("unknown upload type `{}`: expected `html` or `zip`", other),
            ));
        }
    };

    let site = state.sites.fetch_site(site_id).await?;

    let mut spooled: Option<(String, PathBuf, u64)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::new(StatusCode::BAD_REQUEST, "malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let (path, size) = spool_field(field).await?;
        spooled = Some((original, path, size));
        break;
    }
    let Some((original_file_name, source_path, size_bytes)) = spooled else {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "missing `file` field in multipart body",
        ));
    };

    let summary = state
        .uploads
        .process_upload(UploadRequest {
            source_path,
            kind,
            owner_id: site.owner_id.clone(),
            site_id: site.id.to_string(),
            original_file_name,
            size_bytes,
        })
        .await?;

    Ok(Json(summary))
}

/// GET `/sites/{site_id}/files/{*path}` — stream one deployed file.
///
/// Minimal stand-in for the subdomain router: no hostname resolution, no
/// passcode gating, just the path containment check and a content type
/// derived from the extension.
pub async fn serve_site_file(
    State(state): State<AppState>,
    Path((site_id, path)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let site = state.sites.fetch_site(site_id).await?;
    let root = state
        .uploads
        .site_root(&site.owner_id, &site.id.to_string())?;
    let full = upload_service::resolve_within(&root, &path)
        .map_err(|_| AppError::not_found("file not found"))?;

    let file = File::open(&full).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            AppError::not_found("file not found")
        } else {
            tracing::error!("failed to open {}: {}", full.display(), err);
            AppError::internal("internal storage error")
        }
    })?;

    // Directories open fine but error once the body starts streaming,
    // which would have sent a 200 already. Reject them up front.
    let is_file = file
        .metadata()
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(AppError::not_found("file not found"));
    }

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&path)),
    );
    Ok(response)
}

/// Stream one multipart field into a fresh temp file, counting bytes.
///
/// If the body errors out part-way through (client disconnect, truncated
/// multipart framing), the partially spooled file is removed before the
/// error propagates, so aborted uploads leave nothing behind.
async fn spool_field(mut field: Field<'_>) -> Result<(PathBuf, u64), AppError> {
    let path = std::env::temp_dir().join(format!(".upload-{}", Uuid::new_v4()));
    let mut file = File::create(&path)
        .await
        .map_err(|_| AppError::internal("could not buffer upload"))?;

    match spool_chunks(&mut field, &mut file).await {
        Ok(size) => Ok((path, size)),
        Err(err) => {
            let _ = fs::remove_file(&path).await;
            Err(err)
        }
    }
}

async fn spool_chunks(field: &mut Field<'_>, file: &mut File) -> Result<u64, AppError> {
    let mut size = 0u64;
    loop {
        let chunk: Option<Bytes> = field.chunk().await.map_err(|_| {
            AppError::new(StatusCode::BAD_REQUEST, "malformed multipart body")
        })?;
        let Some(chunk) = chunk else { break };
        size += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(|err| {
            tracing::error!("failed to spool upload: {}", err);
            AppError::internal("could not buffer upload")
        })?;
    }
    file.flush().await.map_err(|err| {
        tracing::error!("failed to spool upload: {}", err);
        AppError::internal("could not buffer upload")
    })?;
    Ok(size)
}

/// Map a served file's extension to a content type.
fn content_type_for(path: &str) -> &'static str {
    match upload_service::extension_of(path).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_follow_extensions() {
        assert_eq!(content_type_for("a/index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("style.CSS"), "text/css");
        assert_eq!(content_type_for("logo.png"), "image/png");
        assert_eq!(content_type_for("mystery.bin"), "application/octet-stream");
    }
}
