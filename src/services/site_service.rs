//! SiteService — durable site records backed by SQLite.
//!
//! This is the boundary glue around the upload pipeline: allocate a site id,
//! reserve a subdomain, look a site up before serving or uploading, and tear
//! the whole thing down on delete. The deployed files themselves are owned
//! by `UploadService`.

use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io,
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::models::site::Site;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("site `{0}` not found")]
    SiteNotFound(Uuid),
    #[error("subdomain `{0}` is already taken")]
    SubdomainTaken(String),
    #[error("subdomain `{name}` invalid: {reason}")]
    InvalidSubdomain { name: String, reason: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type SiteResult<T> = Result<T, SiteError>;

const SUBDOMAIN_MIN_LEN: usize = 3;
const SUBDOMAIN_MAX_LEN: usize = 63;

#[derive(Clone)]
pub struct SiteService {
    /// Shared SQLite connection pool for site records.
    pub db: Arc<SqlitePool>,

    /// Root directory all site directories live under (for delete).
    pub sites_dir: PathBuf,
}

impl SiteService {
    pub fn new(db: Arc<SqlitePool>, sites_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            sites_dir: sites_dir.into(),
        }
    }

    /// Validate a subdomain label.
    ///
    /// DNS label rules: 3–63 characters, lowercase letters, digits, and
    /// hyphens only, no leading or trailing hyphen. Keeps the serving layer's
    /// hostname matching trivial.
    fn ensure_subdomain_safe(&self, name: &str) -> SiteResult<()> {
        let len = name.len();
        if len < SUBDOMAIN_MIN_LEN || len > SUBDOMAIN_MAX_LEN {
            return Err(SiteError::InvalidSubdomain {
                name: name.to_string(),
                reason: "must be between 3 and 63 characters".into(),
            });
        }

        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
        {
            return Err(SiteError::InvalidSubdomain {
                name: name.to_string(),
                reason: "allowed characters are lowercase letters, digits, and hyphens".into(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') {
            return Err(SiteError::InvalidSubdomain {
                name: name.to_string(),
                reason: "must start and end with a lowercase letter or digit".into(),
            });
        }

        Ok(())
    }

    /// Create a site record with a freshly allocated id.
    ///
    /// Returns SubdomainTaken on a unique-constraint conflict.
    pub async fn create_site(&self, owner_id: &str, subdomain: &str) -> SiteResult<Site> {
        self.ensure_subdomain_safe(subdomain)?;

        let site = Site {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            subdomain: subdomain.to_string(),
            created_at: Utc::now(),
        };

        match sqlx::query(
            "INSERT INTO sites (id, owner_id, subdomain, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(site.id)
        .bind(&site.owner_id)
        .bind(&site.subdomain)
        .bind(site.created_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(site),
            Err(err) if is_unique_violation(&err) => {
                Err(SiteError::SubdomainTaken(subdomain.to_string()))
            }
            Err(err) => Err(SiteError::Sqlx(err)),
        }
    }

    /// Fetch a site record by id. Returns SiteNotFound if missing.
    pub async fn fetch_site(&self, id: Uuid) -> SiteResult<Site> {
        sqlx::query_as::<_, Site>(
            "SELECT id, owner_id, subdomain, created_at FROM sites WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => SiteError::SiteNotFound(id),
            other => SiteError::Sqlx(other),
        })
    }

    /// Delete a site record and its directory wholesale.
    ///
    /// The directory removal is best-effort; a missing directory (site
    /// created but never deployed) is not an error.
    pub async fn delete_site(&self, id: Uuid) -> SiteResult<()> {
        let site = self.fetch_site(id).await?;

        let result = sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(SiteError::SiteNotFound(id));
        }

        let site_path = self
            .sites_dir
            .join(&site.owner_id)
            .join(site.id.to_string());
        if let Err(err) = fs::remove_dir_all(&site_path).await {
            if err.kind() != io::ErrorKind::NotFound {
                debug!(
                    "failed to remove site directory {} after delete: {}",
                    site_path.display(),
                    err
                );
            }
        }

        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
