//! Capacity-allocation reconciliation for non-admission units.
//!
//! Reconciles a unit's per-role staffing budgets against the headcount
//! already committed to its functional sites: remaining availability,
//! validation of proposed edits, and the create/update/delete plan that maps
//! an edited form onto the mutation API.

pub mod availability;
pub mod domain;
pub mod normalize;
pub mod repository;
pub mod router;
pub mod service;
pub mod upsert;
pub mod validate;

#[cfg(test)]
mod tests;

pub use availability::{compute_availability, AvailabilitySnapshot, RoleAvailability};
pub use domain::{
    FunctionalSite, RoleAllocation, RoleBudget, SiteId, SiteStatus, UnitId, UnitSnapshot,
};
pub use normalize::{normalize_unit, RawUnit};
pub use repository::{
    AllocationMutator, DirectoryError, MutationError, SitePayload, UnitDirectory,
};
pub use router::allocation_router;
pub use service::{
    AllocationServiceError, PlanItemFailure, SiteAllocationService, SiteEditForm,
    SubmissionOutcome, SubmissionReport,
};
pub use upsert::{
    merge_allocation_upsert, CreateAllocation, DeleteAllocation, ExistingAllocation, UpdateAllocation,
    UpsertPlan,
};
pub use validate::{validate_allocation_edit, AllocationValidation, ProposedAllocation};
