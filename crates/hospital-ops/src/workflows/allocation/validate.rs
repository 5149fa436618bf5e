use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::availability::AvailabilitySnapshot;

/// One row of the site allocation form: a role, how many heads the operator
/// wants committed here, and the identity keys the form record carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAllocation {
    pub role_record_id: String,
    pub role_label: String,
    pub quantity: u32,
    pub aliases: BTreeSet<String>,
}

/// Outcome of validating a proposed edit.
///
/// Exceeding availability is a routine operator mistake, not an exceptional
/// condition, so it is a value the caller must branch on. Only the first
/// offender in input order is reported; the dialog surfaces one message at a
/// time and re-validates after each correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AllocationValidation {
    Ok,
    Rejected {
        role_label: String,
        requested: u32,
        available: u32,
    },
}

impl AllocationValidation {
    pub fn is_ok(&self) -> bool {
        matches!(self, AllocationValidation::Ok)
    }
}

/// Validate a proposed edit against availability computed with the edited
/// site excluded. A quantity of zero means "no allocation" and is always
/// valid. A role the availability snapshot cannot resolve is treated as
/// having nothing left to give.
pub fn validate_allocation_edit(
    proposed: &[ProposedAllocation],
    availability: &AvailabilitySnapshot,
) -> AllocationValidation {
    for item in proposed {
        if item.quantity == 0 {
            continue;
        }

        let available = availability
            .match_aliases(&item.aliases)
            .map(|entry| entry.available)
            .unwrap_or(0);

        if item.quantity > available {
            return AllocationValidation::Rejected {
                role_label: item.role_label.clone(),
                requested: item.quantity,
                available,
            };
        }
    }

    AllocationValidation::Ok
}
