use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::domain::{FunctionalSite, RoleBudget, SiteId};

/// Availability computed for one role budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleAvailability {
    pub record_id: String,
    pub label: String,
    pub total_headcount: u32,
    pub allocated: u32,
    pub available: u32,
    #[serde(skip)]
    pub aliases: BTreeSet<String>,
}

/// Per-role availability for a unit, queryable by any identity alias.
///
/// Downstream callers hold records keyed by whichever identity field the
/// backend happened to populate, so every alias of a budget resolves to the
/// same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilitySnapshot {
    entries: Vec<RoleAvailability>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AvailabilitySnapshot {
    pub fn entries(&self) -> &[RoleAvailability] {
        &self.entries
    }

    pub fn entry_for(&self, key: &str) -> Option<&RoleAvailability> {
        self.index.get(key).map(|position| &self.entries[*position])
    }

    pub fn available_for(&self, key: &str) -> Option<u32> {
        self.entry_for(key).map(|entry| entry.available)
    }

    /// Resolve an allocation's alias set against the indexed budgets.
    pub fn match_aliases(&self, aliases: &BTreeSet<String>) -> Option<&RoleAvailability> {
        aliases.iter().find_map(|alias| self.entry_for(alias))
    }
}

/// Compute how much of each role budget remains available to commit.
///
/// `exclude_site` names the site currently under edit, if any: its own
/// allocations are left out of the allocated-elsewhere sum so a site is
/// never blocked by headcount it already holds. Availability saturates at
/// zero; over-allocated legacy data must not surface as a negative count.
pub fn compute_availability(
    budgets: &[RoleBudget],
    sites: &[FunctionalSite],
    exclude_site: Option<&SiteId>,
) -> AvailabilitySnapshot {
    let mut entries = Vec::with_capacity(budgets.len());

    for budget in budgets {
        let mut allocated: u64 = 0;
        for site in sites {
            if exclude_site == Some(&site.site_id) {
                continue;
            }
            for allocation in &site.allocations {
                if budget.matches(&allocation.aliases) {
                    allocated += u64::from(allocation.quantity);
                }
            }
        }

        let allocated = u32::try_from(allocated).unwrap_or(u32::MAX);
        entries.push(RoleAvailability {
            record_id: budget.record_id.clone(),
            label: budget.label.clone(),
            total_headcount: budget.total_headcount,
            allocated,
            available: budget.total_headcount.saturating_sub(allocated),
            aliases: budget.aliases.clone(),
        });
    }

    let mut index = HashMap::new();
    for (position, entry) in entries.iter().enumerate() {
        for alias in &entry.aliases {
            index.entry(alias.clone()).or_insert(position);
        }
    }

    AvailabilitySnapshot { entries, index }
}
