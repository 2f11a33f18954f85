//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks DB connectivity and sites-dir I/O

use crate::services::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Runs a lightweight query against SQLite (`SELECT 1`).
/// 2. Performs a write/read/delete round trip under the sites directory,
///    since every upload ends in exactly that kind of I/O.
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let sqlite = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.sites.db)
        .await
    {
        Ok(1) => CheckStatus { ok: true, error: None },
        Ok(v) => CheckStatus {
            ok: false,
            error: Some(format!("unexpected result: {}", v)),
        },
        Err(e) => CheckStatus {
            ok: false,
            error: Some(format!("error: {}", e)),
        },
    };
    let disk = disk_roundtrip(&state.uploads.sites_dir).await;

    let overall_ok = sqlite.ok && disk.ok;
    let mut checks = HashMap::new();
    checks.insert("sqlite", sqlite);
    checks.insert("disk", disk);

    let body = ReadyResponse {
        status: if overall_ok { "ok".into() } else { "error".into() },
        checks,
    };
    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Best-effort write/read/delete of a scratch file under `dir`.
async fn disk_roundtrip(dir: &Path) -> CheckStatus {
    let tmp_path = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    let outcome = async {
        fs::write(&tmp_path, b"readyz")
            .await
            .map_err(|e| format!("could not write tmp file: {}", e))?;
        let bytes = fs::read(&tmp_path)
            .await
            .map_err(|e| format!("could not read tmp file: {}", e))?;
        if bytes != b"readyz" {
            return Err("file content mismatch".to_string());
        }
        Ok(())
    }
    .await;
    let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup

    match outcome {
        Ok(()) => CheckStatus { ok: true, error: None },
        Err(e) => CheckStatus {
            ok: false,
            error: Some(e),
        },
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
