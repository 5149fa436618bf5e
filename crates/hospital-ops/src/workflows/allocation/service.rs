use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::availability::{compute_availability, AvailabilitySnapshot};
use super::domain::{SiteId, SiteStatus, UnitId, UnitSnapshot};
use super::normalize::normalize_unit;
use super::repository::{
    AllocationMutator, DirectoryError, MutationError, SitePayload, UnitDirectory,
};
use super::upsert::{merge_allocation_upsert, CreateAllocation, ExistingAllocation, UpsertPlan};
use super::validate::{validate_allocation_edit, AllocationValidation, ProposedAllocation};

/// Service composing the directory, normalizer, reconciliation math, and the
/// mutation API for the site dialogs.
///
/// Every operation starts from a freshly fetched snapshot; nothing is cached
/// between calls, which is what keeps the math honest when several operators
/// edit the same unit.
pub struct SiteAllocationService<D, M> {
    directory: Arc<D>,
    mutator: Arc<M>,
}

/// Form submitted from the create/edit site dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteEditForm {
    /// `None` when creating a new site.
    pub site_id: Option<SiteId>,
    pub name: String,
    pub status: SiteStatus,
    pub allocations: Vec<ProposedAllocation>,
}

/// Result of a submit: either the edit was refused by validation, or it was
/// sent to the backend and this is what happened to each plan item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Rejected {
        role_label: String,
        requested: u32,
        available: u32,
    },
    Applied(SubmissionReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub site_id: SiteId,
    /// Items acknowledged by the backend.
    pub applied: usize,
    /// Items the backend refused; the batch keeps going past each one.
    pub failures: Vec<PlanItemFailure>,
    /// True when the combined embedded-cargos request was accepted; false
    /// when the service had to fall back to item-level calls.
    pub embedded_payload: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanItemFailure {
    pub operation: &'static str,
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationServiceError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

impl<D, M> SiteAllocationService<D, M>
where
    D: UnitDirectory + 'static,
    M: AllocationMutator + 'static,
{
    pub fn new(directory: Arc<D>, mutator: Arc<M>) -> Self {
        Self { directory, mutator }
    }

    /// Fetch and normalize the authoritative unit snapshot.
    pub fn snapshot(&self, unit_id: &UnitId) -> Result<UnitSnapshot, AllocationServiceError> {
        let raw = self.directory.fetch_unit(unit_id)?;
        Ok(normalize_unit(&raw))
    }

    /// Remaining availability per role, with the site under edit excluded.
    pub fn availability(
        &self,
        unit_id: &UnitId,
        exclude_site: Option<&SiteId>,
    ) -> Result<AvailabilitySnapshot, AllocationServiceError> {
        let snapshot = self.snapshot(unit_id)?;
        Ok(compute_availability(
            &snapshot.role_budgets,
            &snapshot.sites,
            exclude_site,
        ))
    }

    /// Validate and submit a site create/edit form.
    ///
    /// Validation failures come back as `Ok(SubmissionOutcome::Rejected {..})`;
    /// an `Err` here means a collaborator failed, not that the operator asked
    /// for too much.
    pub fn submit_site_edit(
        &self,
        unit_id: &UnitId,
        form: &SiteEditForm,
    ) -> Result<SubmissionOutcome, AllocationServiceError> {
        let snapshot = self.snapshot(unit_id)?;
        let availability = compute_availability(
            &snapshot.role_budgets,
            &snapshot.sites,
            form.site_id.as_ref(),
        );

        if let AllocationValidation::Rejected {
            role_label,
            requested,
            available,
        } = validate_allocation_edit(&form.allocations, &availability)
        {
            return Ok(SubmissionOutcome::Rejected {
                role_label,
                requested,
                available,
            });
        }

        let desired: Vec<CreateAllocation> = form
            .allocations
            .iter()
            .filter(|entry| entry.quantity > 0)
            .map(|entry| CreateAllocation {
                role_record_id: entry.role_record_id.clone(),
                quantity: entry.quantity,
            })
            .collect();
        let payload = SitePayload {
            site_id: form.site_id.clone(),
            name: form.name.clone(),
            status: form.status,
            allocations: Some(desired),
        };

        match self.mutator.upsert_site(unit_id, &payload) {
            Ok(site_id) => {
                let applied = payload
                    .allocations
                    .as_ref()
                    .map(Vec::len)
                    .unwrap_or_default();
                Ok(SubmissionOutcome::Applied(SubmissionReport {
                    site_id,
                    applied,
                    failures: Vec::new(),
                    embedded_payload: true,
                }))
            }
            Err(MutationError::EmbeddedUnsupported) => {
                self.submit_item_level(unit_id, &snapshot, form, payload)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Fallback path for backends that refuse embedded cargos: upsert the
    /// bare site, then drive the derived plan one item at a time.
    fn submit_item_level(
        &self,
        unit_id: &UnitId,
        snapshot: &UnitSnapshot,
        form: &SiteEditForm,
        payload: SitePayload,
    ) -> Result<SubmissionOutcome, AllocationServiceError> {
        let bare = SitePayload {
            allocations: None,
            ..payload
        };
        let site_id = self.mutator.upsert_site(unit_id, &bare)?;

        let existing = existing_allocations(snapshot, form.site_id.as_ref());
        let plan = merge_allocation_upsert(&existing, &form.allocations);
        let report = self.execute_plan(&site_id, &plan);

        Ok(SubmissionOutcome::Applied(report))
    }

    /// Execute a plan item by item, continuing past failures. Each failure
    /// is logged and reported; deciding whether to refetch and surface a
    /// partial-success message is the caller's call.
    fn execute_plan(&self, site_id: &SiteId, plan: &UpsertPlan) -> SubmissionReport {
        let mut applied = 0;
        let mut failures = Vec::new();

        for item in &plan.creates {
            match self.mutator.create_allocation(site_id, item) {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!(%site_id, role = %item.role_record_id, %err, "allocation create failed");
                    failures.push(PlanItemFailure {
                        operation: "create",
                        detail: err.to_string(),
                    });
                }
            }
        }

        for item in &plan.updates {
            match self.mutator.update_allocation(item) {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!(%site_id, association = %item.association_id, %err, "allocation update failed");
                    failures.push(PlanItemFailure {
                        operation: "update",
                        detail: err.to_string(),
                    });
                }
            }
        }

        for item in &plan.deletes {
            match self.mutator.delete_allocation(item) {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!(%site_id, association = %item.association_id, %err, "allocation delete failed");
                    failures.push(PlanItemFailure {
                        operation: "delete",
                        detail: err.to_string(),
                    });
                }
            }
        }

        SubmissionReport {
            site_id: site_id.clone(),
            applied,
            failures,
            embedded_payload: false,
        }
    }

    /// Remove a site after operator confirmation.
    pub fn delete_site(&self, site_id: &SiteId) -> Result<(), AllocationServiceError> {
        self.mutator.delete_site(site_id)?;
        Ok(())
    }
}

fn existing_allocations(
    snapshot: &UnitSnapshot,
    site_id: Option<&SiteId>,
) -> Vec<ExistingAllocation> {
    let Some(site_id) = site_id else {
        return Vec::new();
    };
    let Some(site) = snapshot.site(site_id) else {
        return Vec::new();
    };

    site.allocations
        .iter()
        .filter_map(|allocation| {
            let existing = ExistingAllocation::from_allocation(allocation);
            if existing.is_none() {
                warn!(%site_id, "allocation without association id cannot be edited item-level");
            }
            existing
        })
        .collect()
}
