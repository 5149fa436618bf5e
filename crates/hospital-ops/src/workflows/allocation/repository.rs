use serde::{Deserialize, Serialize};

use super::domain::{SiteId, SiteStatus, UnitId};
use super::normalize::RawUnit;
use super::upsert::{CreateAllocation, DeleteAllocation, UpdateAllocation};

/// Read side of the external unit/site data API.
pub trait UnitDirectory: Send + Sync {
    fn fetch_unit(&self, unit_id: &UnitId) -> Result<RawUnit, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("unit {0} not found")]
    UnitNotFound(String),
    #[error("unit directory unavailable: {0}")]
    Unavailable(String),
}

/// Combined "site with embedded cargos" request shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePayload {
    /// `None` creates a new site; `Some` replaces the existing one.
    pub site_id: Option<SiteId>,
    pub name: String,
    pub status: SiteStatus,
    /// `Some` replaces the site's allocations with exactly this list (empty
    /// list clears them); `None` leaves allocations untouched, the stripped
    /// shape used by the item-level fallback path.
    pub allocations: Option<Vec<CreateAllocation>>,
}

/// Write side of the external allocation mutation API.
///
/// `upsert_site` is the preferred path; backend versions that reject
/// embedded allocation payloads signal [`MutationError::EmbeddedUnsupported`]
/// and the caller falls back to the item-level calls.
pub trait AllocationMutator: Send + Sync {
    fn upsert_site(&self, unit_id: &UnitId, payload: &SitePayload) -> Result<SiteId, MutationError>;
    fn create_allocation(
        &self,
        site_id: &SiteId,
        item: &CreateAllocation,
    ) -> Result<(), MutationError>;
    fn update_allocation(&self, item: &UpdateAllocation) -> Result<(), MutationError>;
    fn delete_allocation(&self, item: &DeleteAllocation) -> Result<(), MutationError>;
    fn delete_site(&self, site_id: &SiteId) -> Result<(), MutationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("backend rejects embedded allocation payloads")]
    EmbeddedUnsupported,
    #[error("mutation rejected: {0}")]
    Rejected(String),
    #[error("mutation api unavailable: {0}")]
    Unavailable(String),
}
