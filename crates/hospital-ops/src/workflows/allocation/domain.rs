use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of an organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub String);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a functional site (room, box, workstation) within a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(pub String);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Available,
    InUse,
    Inactive,
}

impl SiteStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::InUse => "In Use",
            Self::Inactive => "Inactive",
        }
    }
}

/// Staffing budget for one role ("cargo") in one unit, normalized from the
/// upstream cargo-unidade record.
///
/// `aliases` holds every identity key the upstream API is known to use when
/// referring to this budget: the budget record id, the underlying role id,
/// and any nested object ids observed in responses. Matching allocations
/// against budgets is always an alias-set intersection; single-field equality
/// misses records keyed by a different endpoint's field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBudget {
    pub record_id: String,
    pub label: String,
    pub total_headcount: u32,
    pub aliases: BTreeSet<String>,
}

impl RoleBudget {
    pub fn matches(&self, aliases: &BTreeSet<String>) -> bool {
        !self.aliases.is_disjoint(aliases)
    }
}

/// One role's headcount commitment at one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAllocation {
    /// Id of the role-site association record, when the endpoint returned one.
    pub association_id: Option<String>,
    pub quantity: u32,
    pub aliases: BTreeSet<String>,
}

/// A functional site drawing staff from the unit's role budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalSite {
    pub site_id: SiteId,
    pub name: String,
    pub status: SiteStatus,
    pub allocations: Vec<RoleAllocation>,
}

/// In-memory snapshot of a unit's budgets and sites, already normalized.
///
/// The engine never mutates a snapshot; after every mutating call the caller
/// refetches and recomputes rather than patching cached state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub unit_id: UnitId,
    pub role_budgets: Vec<RoleBudget>,
    pub sites: Vec<FunctionalSite>,
}

impl UnitSnapshot {
    pub fn site(&self, site_id: &SiteId) -> Option<&FunctionalSite> {
        self.sites.iter().find(|site| &site.site_id == site_id)
    }
}
