use std::collections::BTreeSet;

use crate::workflows::allocation::domain::{
    FunctionalSite, RoleAllocation, RoleBudget, SiteId, SiteStatus,
};
use crate::workflows::allocation::validate::ProposedAllocation;

pub(super) fn aliases(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

pub(super) fn budget(record_id: &str, label: &str, total: u32, keys: &[&str]) -> RoleBudget {
    RoleBudget {
        record_id: record_id.to_string(),
        label: label.to_string(),
        total_headcount: total,
        aliases: aliases(keys),
    }
}

pub(super) fn allocation(association_id: &str, quantity: u32, keys: &[&str]) -> RoleAllocation {
    RoleAllocation {
        association_id: Some(association_id.to_string()),
        quantity,
        aliases: aliases(keys),
    }
}

pub(super) fn site(site_id: &str, allocations: Vec<RoleAllocation>) -> FunctionalSite {
    FunctionalSite {
        site_id: SiteId(site_id.to_string()),
        name: format!("Site {site_id}"),
        status: SiteStatus::Available,
        allocations,
    }
}

pub(super) fn proposed(record_id: &str, label: &str, quantity: u32, keys: &[&str]) -> ProposedAllocation {
    ProposedAllocation {
        role_record_id: record_id.to_string(),
        role_label: label.to_string(),
        quantity,
        aliases: aliases(keys),
    }
}
