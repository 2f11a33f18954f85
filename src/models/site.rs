//! Represents a hosted site — one deployed static site on its own subdomain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A site record in the multi-tenant host.
///
/// The record is pure metadata; the deployed files live on disk under
/// `sites_dir/{owner_id}/{site_id}`. The subdomain is what an external
/// request router resolves to this record.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Site {
    /// Unique identifier for this site (UUID, doubles as the directory name).
    pub id: Uuid,

    /// Identifier of the user that owns this site.
    pub owner_id: String,

    /// Globally unique subdomain label (must conform to DNS label rules).
    pub subdomain: String,

    /// When this site was created.
    pub created_at: DateTime<Utc>,
}
