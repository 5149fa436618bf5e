use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::domain::RoleAllocation;
use super::validate::ProposedAllocation;

/// Existing role-site association eligible for item-level mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingAllocation {
    pub association_id: String,
    pub quantity: u32,
    pub aliases: BTreeSet<String>,
}

impl ExistingAllocation {
    /// Associations returned without their own record id cannot be targeted
    /// by item-level calls and are skipped by the caller.
    pub fn from_allocation(allocation: &RoleAllocation) -> Option<Self> {
        allocation.association_id.as_ref().map(|id| Self {
            association_id: id.clone(),
            quantity: allocation.quantity,
            aliases: allocation.aliases.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAllocation {
    pub role_record_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAllocation {
    pub association_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAllocation {
    pub association_id: String,
}

/// Three-way partition of an edited form against the site's existing
/// associations. Items are independent operations: executing them is the
/// caller's job, and one failing item must not abort the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertPlan {
    pub creates: Vec<CreateAllocation>,
    pub updates: Vec<UpdateAllocation>,
    pub deletes: Vec<DeleteAllocation>,
}

impl UpsertPlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }
}

/// Derive the mutation plan for an edited site form.
///
/// Pure and idempotent: once the plan's effects are reflected back into
/// `existing`, a second merge of the same form yields an empty plan. Form
/// rows with quantity zero delete their existing association; rows for roles
/// with no existing association create one only when the quantity is
/// positive. Existing associations the form does not mention are left
/// untouched.
pub fn merge_allocation_upsert(
    existing: &[ExistingAllocation],
    form: &[ProposedAllocation],
) -> UpsertPlan {
    let mut plan = UpsertPlan::default();

    for entry in form {
        let current = existing
            .iter()
            .find(|allocation| !allocation.aliases.is_disjoint(&entry.aliases));

        match current {
            None => {
                if entry.quantity > 0 {
                    plan.creates.push(CreateAllocation {
                        role_record_id: entry.role_record_id.clone(),
                        quantity: entry.quantity,
                    });
                }
            }
            Some(allocation) if entry.quantity == 0 => {
                plan.deletes.push(DeleteAllocation {
                    association_id: allocation.association_id.clone(),
                });
            }
            Some(allocation) if entry.quantity != allocation.quantity => {
                plan.updates.push(UpdateAllocation {
                    association_id: allocation.association_id.clone(),
                    quantity: entry.quantity,
                });
            }
            Some(_) => {}
        }
    }

    plan
}
