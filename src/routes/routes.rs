//! Defines routes for site records, uploads, and file serving.
//!
//! ## Structure
//! - **Site-level endpoints**
//!   - `POST   /sites` — create a site record
//!   - `DELETE /sites/{site_id}` — delete a site and its deployed files
//!
//! - **Deployment endpoints**
//!   - `POST /sites/{site_id}/upload?type=html|zip` — run the upload pipeline
//!   - `GET  /sites/{site_id}/files/{*path}` — stream a deployed file
//!
//! The wildcard `*path` allows nested files like `assets/css/main.css`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        site_handlers::{create_site, delete_site, serve_site_file, upload_site},
    },
    services::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Multipart framing overhead on top of the 25 MB zip ceiling; the real
/// per-kind limits are enforced by the validator.
const MAX_UPLOAD_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build and return the router for all site-host routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // site records
        .route("/sites", post(create_site))
        .route("/sites/{site_id}", axum::routing::delete(delete_site))
        // deployment
        .route(
            "/sites/{site_id}/upload",
            post(upload_site).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/sites/{site_id}/files/{*path}", get(serve_site_file))
}
