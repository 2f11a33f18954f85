//! Service layer: durable site records and the upload/deployment pipeline.

pub mod extractor;
pub mod sanitizer;
pub mod site_service;
pub mod upload_service;

use site_service::SiteService;
use upload_service::UploadService;

/// Shared application state handed to every handler.
///
/// Both services are constructed once at startup; cloning is cheap
/// (`Arc`-backed pool, path buffers, static policy).
#[derive(Clone)]
pub struct AppState {
    pub sites: SiteService,
    pub uploads: UploadService,
}
