//! Normalization of upstream unit/site payloads.
//!
//! The data API is inconsistent across endpoints and backend versions: site
//! allocations arrive under `cargos` or `cargosSitio`, identity keys may be
//! `cargoId`, `cargoUnidadeId`, a nested `cargo.id`, or a nested
//! `cargoUnidade.id`, ids may be numbers or strings, and legacy quantities
//! can be fractional or negative. Everything funnels through here into the
//! canonical types in [`super::domain`] before any computation runs.
//!
//! Records too malformed to identify are dropped with a warning rather than
//! propagated: a dropped budget yields zero availability, which can only
//! under-report free headcount, never hand out slots that do not exist.

use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

use super::domain::{
    FunctionalSite, RoleAllocation, RoleBudget, SiteId, SiteStatus, UnitId, UnitSnapshot,
};

/// Identity values arrive as strings or numbers depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Integer(i64),
}

impl RawId {
    pub(crate) fn canonical(&self) -> Option<String> {
        match self {
            RawId::Text(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            RawId::Integer(value) => Some(value.to_string()),
        }
    }
}

/// Nested object reference, e.g. `"cargo": { "id": 12 }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoleRef {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub nome: Option<String>,
}

/// Role-site association as returned by the upstream API. Which identity
/// fields are populated varies by endpoint and backend version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAllocation {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub cargo_id: Option<RawId>,
    #[serde(default)]
    pub cargo_unidade_id: Option<RawId>,
    #[serde(default)]
    pub cargo: Option<RawRoleRef>,
    #[serde(default)]
    pub cargo_unidade: Option<RawRoleRef>,
    #[serde(default)]
    pub quantidade: Option<f64>,
}

/// Cargo-unidade record: one role's budgeted headcount for the unit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoleBudget {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub cargo_id: Option<RawId>,
    #[serde(default)]
    pub cargo: Option<RawRoleRef>,
    #[serde(default, alias = "quantidadeTotal")]
    pub quantidade_funcionarios: Option<f64>,
    #[serde(default)]
    pub nome: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSite {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cargos: Vec<RawAllocation>,
    #[serde(default)]
    pub cargos_sitio: Vec<RawAllocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUnit {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub cargos_unidade: Vec<RawRoleBudget>,
    #[serde(default)]
    pub sitios_funcionais: Vec<RawSite>,
}

pub fn normalize_unit(raw: &RawUnit) -> UnitSnapshot {
    let unit_id = raw
        .id
        .as_ref()
        .and_then(RawId::canonical)
        .unwrap_or_default();

    let role_budgets = raw
        .cargos_unidade
        .iter()
        .filter_map(normalize_budget)
        .collect();

    let sites = raw
        .sitios_funcionais
        .iter()
        .filter_map(normalize_site)
        .collect();

    UnitSnapshot {
        unit_id: UnitId(unit_id),
        role_budgets,
        sites,
    }
}

pub fn normalize_budget(raw: &RawRoleBudget) -> Option<RoleBudget> {
    let record_id = raw.id.as_ref().and_then(RawId::canonical);

    let mut aliases = BTreeSet::new();
    if let Some(id) = &record_id {
        aliases.insert(id.clone());
    }
    if let Some(id) = raw.cargo_id.as_ref().and_then(RawId::canonical) {
        aliases.insert(id);
    }
    if let Some(id) = raw
        .cargo
        .as_ref()
        .and_then(|role| role.id.as_ref())
        .and_then(RawId::canonical)
    {
        aliases.insert(id);
    }

    let record_id = match record_id {
        Some(id) => id,
        None => {
            warn!("dropping cargo-unidade record without a usable id");
            return None;
        }
    };

    let label = raw
        .nome
        .clone()
        .or_else(|| raw.cargo.as_ref().and_then(|role| role.nome.clone()))
        .unwrap_or_else(|| record_id.clone());

    let total_headcount = normalize_quantity(raw.quantidade_funcionarios, "cargo-unidade total");

    Some(RoleBudget {
        record_id,
        label,
        total_headcount,
        aliases,
    })
}

pub fn normalize_site(raw: &RawSite) -> Option<FunctionalSite> {
    let site_id = match raw.id.as_ref().and_then(RawId::canonical) {
        Some(id) => id,
        None => {
            warn!("dropping functional site record without a usable id");
            return None;
        }
    };

    // Endpoints disagree on the allocation field name; prefer `cargos` and
    // fall back to `cargosSitio` when it is the only one populated.
    let raw_allocations = if raw.cargos.is_empty() {
        &raw.cargos_sitio
    } else {
        &raw.cargos
    };

    let allocations = raw_allocations.iter().map(normalize_allocation).collect();

    Some(FunctionalSite {
        site_id: SiteId(site_id),
        name: raw.nome.clone().unwrap_or_default(),
        status: parse_status(raw.status.as_deref()),
        allocations,
    })
}

pub fn normalize_allocation(raw: &RawAllocation) -> RoleAllocation {
    let aliases = allocation_aliases(raw);
    if aliases.is_empty() {
        warn!("role allocation carries no identity keys; it will match no budget");
    }

    RoleAllocation {
        association_id: raw.id.as_ref().and_then(RawId::canonical),
        quantity: normalize_quantity(raw.quantidade, "allocation quantity"),
        aliases,
    }
}

pub fn allocation_aliases(raw: &RawAllocation) -> BTreeSet<String> {
    let mut aliases = BTreeSet::new();
    let candidates = [
        raw.cargo_id.as_ref(),
        raw.cargo_unidade_id.as_ref(),
        raw.cargo.as_ref().and_then(|role| role.id.as_ref()),
        raw.cargo_unidade.as_ref().and_then(|role| role.id.as_ref()),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(id) = candidate.canonical() {
            aliases.insert(id);
        }
    }
    aliases
}

fn parse_status(value: Option<&str>) -> SiteStatus {
    let Some(value) = value else {
        return SiteStatus::Available;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "em_uso" | "in_use" => SiteStatus::InUse,
        "inativo" | "inactive" => SiteStatus::Inactive,
        "disponivel" | "available" | "" => SiteStatus::Available,
        other => {
            warn!(status = other, "unknown site status, treating as available");
            SiteStatus::Available
        }
    }
}

/// Legacy payloads carry fractional or negative quantities; clamp to zero
/// and floor so availability math stays in non-negative integers.
fn normalize_quantity(value: Option<f64>, context: &str) -> u32 {
    let Some(value) = value else {
        return 0;
    };
    if !value.is_finite() || value < 0.0 {
        warn!(value, context, "non-representable quantity, treating as zero");
        return 0;
    }
    let floored = value.floor();
    if floored >= f64::from(u32::MAX) {
        warn!(value, context, "quantity exceeds representable range");
        return u32::MAX;
    }
    floored as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit_from(value: serde_json::Value) -> UnitSnapshot {
        let raw: RawUnit = serde_json::from_value(value).expect("payload deserializes");
        normalize_unit(&raw)
    }

    #[test]
    fn collects_aliases_across_identity_fields() {
        let snapshot = unit_from(json!({
            "id": 7,
            "cargosUnidade": [
                {
                    "id": "cu-1",
                    "cargoId": 12,
                    "cargo": { "id": 12, "nome": "Enfermeiro" },
                    "quantidadeFuncionarios": 4
                }
            ]
        }));

        let budget = &snapshot.role_budgets[0];
        assert_eq!(budget.record_id, "cu-1");
        assert_eq!(budget.label, "Enfermeiro");
        assert_eq!(budget.total_headcount, 4);
        assert!(budget.aliases.contains("cu-1"));
        assert!(budget.aliases.contains("12"));
    }

    #[test]
    fn falls_back_to_cargos_sitio_field() {
        let snapshot = unit_from(json!({
            "id": 1,
            "sitiosFuncionais": [
                {
                    "id": "sf-1",
                    "nome": "Box 01",
                    "status": "EM_USO",
                    "cargosSitio": [
                        { "id": "assoc-1", "cargoUnidadeId": "cu-1", "quantidade": 2 }
                    ]
                }
            ]
        }));

        let site = &snapshot.sites[0];
        assert_eq!(site.status, SiteStatus::InUse);
        assert_eq!(site.allocations.len(), 1);
        assert_eq!(site.allocations[0].quantity, 2);
        assert!(site.allocations[0].aliases.contains("cu-1"));
    }

    #[test]
    fn prefers_cargos_when_both_fields_present() {
        let snapshot = unit_from(json!({
            "id": 1,
            "sitiosFuncionais": [
                {
                    "id": "sf-1",
                    "cargos": [{ "cargoId": "a", "quantidade": 1 }],
                    "cargosSitio": [{ "cargoId": "b", "quantidade": 9 }]
                }
            ]
        }));

        let allocations = &snapshot.sites[0].allocations;
        assert_eq!(allocations.len(), 1);
        assert!(allocations[0].aliases.contains("a"));
    }

    #[test]
    fn malformed_records_normalize_to_zero_not_panic() {
        let snapshot = unit_from(json!({
            "id": 1,
            "cargosUnidade": [
                { "cargoId": 5, "quantidadeFuncionarios": 3 },
                { "id": "cu-2", "quantidadeFuncionarios": -1.5 }
            ],
            "sitiosFuncionais": [
                { "nome": "sem id" },
                { "id": "sf-1", "cargos": [{ "quantidade": 2.9 }] }
            ]
        }));

        // budget without a record id is dropped; negative total clamps to zero
        assert_eq!(snapshot.role_budgets.len(), 1);
        assert_eq!(snapshot.role_budgets[0].total_headcount, 0);

        // site without an id is dropped; keyless allocation floors its quantity
        assert_eq!(snapshot.sites.len(), 1);
        let allocation = &snapshot.sites[0].allocations[0];
        assert_eq!(allocation.quantity, 2);
        assert!(allocation.aliases.is_empty());
    }

    #[test]
    fn numeric_and_string_ids_share_a_canonical_form() {
        let numeric: RawId = serde_json::from_value(json!(42)).expect("number id");
        let text: RawId = serde_json::from_value(json!("42")).expect("string id");
        assert_eq!(numeric.canonical(), text.canonical());
        assert_eq!(
            serde_json::from_value::<RawId>(json!("  "))
                .expect("blank id")
                .canonical(),
            None
        );
    }
}
