use chrono::{Duration, Utc};
use hospital_ops::workflows::allocation::{
    AllocationMutator, CreateAllocation, DeleteAllocation, DirectoryError, MutationError, RawUnit,
    SiteId, SitePayload, SiteStatus, UnitDirectory, UnitId, UpdateAllocation,
};
use hospital_ops::workflows::scp::{
    AnswerOption, CareBand, ClassificationResult, ClassificationSchema, EvaluationSession,
    FinalizeRequest, GatewayError, Question, ServerOutcome, SessionGateway, SessionState,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory stand-in for the hospital data and mutation APIs. Units are
/// stored as raw JSON in the same heterogeneous shapes the real backend
/// serves, so every read goes through the normalizer exactly like production
/// traffic.
pub(crate) struct InMemoryHospitalBackend {
    units: Mutex<HashMap<String, Value>>,
    sequence: AtomicU64,
}

impl InMemoryHospitalBackend {
    pub(crate) fn seeded() -> Self {
        let mut units = HashMap::new();
        units.insert("uni-7".to_string(), seed_unit());
        Self {
            units: Mutex::new(units),
            sequence: AtomicU64::new(100),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.sequence.fetch_add(1, Ordering::Relaxed))
    }
}

fn status_value(status: SiteStatus) -> Value {
    match status {
        SiteStatus::Available => json!("available"),
        SiteStatus::InUse => json!("in_use"),
        SiteStatus::Inactive => json!("inactive"),
    }
}

impl UnitDirectory for InMemoryHospitalBackend {
    fn fetch_unit(&self, unit_id: &UnitId) -> Result<RawUnit, DirectoryError> {
        let units = self.units.lock().expect("unit store mutex poisoned");
        let unit = units
            .get(&unit_id.0)
            .ok_or_else(|| DirectoryError::UnitNotFound(unit_id.0.clone()))?;
        serde_json::from_value(unit.clone())
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))
    }
}

impl AllocationMutator for InMemoryHospitalBackend {
    fn upsert_site(&self, unit_id: &UnitId, payload: &SitePayload) -> Result<SiteId, MutationError> {
        let mut units = self.units.lock().expect("unit store mutex poisoned");
        let unit = units
            .get_mut(&unit_id.0)
            .ok_or_else(|| MutationError::Rejected(format!("no unit {unit_id}")))?;

        let site_id = payload
            .site_id
            .clone()
            .unwrap_or_else(|| SiteId(self.next_id("sf")));

        let cargos: Vec<Value> = payload
            .allocations
            .iter()
            .flatten()
            .map(|item| {
                json!({
                    "id": self.next_id("as"),
                    "cargoUnidadeId": item.role_record_id,
                    "quantidade": item.quantity,
                })
            })
            .collect();

        let sites = unit["sitiosFuncionais"]
            .as_array_mut()
            .ok_or_else(|| MutationError::Rejected("unit record has no site array".to_string()))?;

        match sites.iter_mut().find(|site| site["id"] == json!(site_id.0)) {
            Some(existing) if payload.allocations.is_none() => {
                existing["nome"] = json!(payload.name);
                existing["status"] = status_value(payload.status);
            }
            Some(existing) => {
                *existing = json!({
                    "id": site_id.0,
                    "nome": payload.name,
                    "status": status_value(payload.status),
                    "cargos": cargos,
                });
            }
            None => {
                sites.push(json!({
                    "id": site_id.0,
                    "nome": payload.name,
                    "status": status_value(payload.status),
                    "cargos": cargos,
                }));
            }
        }

        Ok(site_id)
    }

    fn create_allocation(
        &self,
        site_id: &SiteId,
        item: &CreateAllocation,
    ) -> Result<(), MutationError> {
        let mut units = self.units.lock().expect("unit store mutex poisoned");
        for unit in units.values_mut() {
            let Some(sites) = unit["sitiosFuncionais"].as_array_mut() else {
                continue;
            };
            if let Some(site) = sites.iter_mut().find(|site| site["id"] == json!(site_id.0)) {
                let record = json!({
                    "id": self.next_id("as"),
                    "cargoUnidadeId": item.role_record_id,
                    "quantidade": item.quantity,
                });
                site["cargos"]
                    .as_array_mut()
                    .ok_or_else(|| {
                        MutationError::Rejected("site record has no cargo array".to_string())
                    })?
                    .push(record);
                return Ok(());
            }
        }
        Err(MutationError::Rejected(format!("no site {site_id}")))
    }

    fn update_allocation(&self, item: &UpdateAllocation) -> Result<(), MutationError> {
        let mut units = self.units.lock().expect("unit store mutex poisoned");
        for unit in units.values_mut() {
            let Some(sites) = unit["sitiosFuncionais"].as_array_mut() else {
                continue;
            };
            for site in sites {
                let Some(cargos) = site["cargos"].as_array_mut() else {
                    continue;
                };
                for cargo in cargos {
                    if cargo["id"] == json!(item.association_id) {
                        cargo["quantidade"] = json!(item.quantity);
                        return Ok(());
                    }
                }
            }
        }
        Err(MutationError::Rejected(format!(
            "no association {}",
            item.association_id
        )))
    }

    fn delete_allocation(&self, item: &DeleteAllocation) -> Result<(), MutationError> {
        let mut units = self.units.lock().expect("unit store mutex poisoned");
        for unit in units.values_mut() {
            let Some(sites) = unit["sitiosFuncionais"].as_array_mut() else {
                continue;
            };
            for site in sites {
                if let Some(cargos) = site["cargos"].as_array_mut() {
                    cargos.retain(|cargo| cargo["id"] != json!(item.association_id));
                }
            }
        }
        Ok(())
    }

    fn delete_site(&self, site_id: &SiteId) -> Result<(), MutationError> {
        let mut units = self.units.lock().expect("unit store mutex poisoned");
        for unit in units.values_mut() {
            if let Some(sites) = unit["sitiosFuncionais"].as_array_mut() {
                sites.retain(|site| site["id"] != json!(site_id.0));
            }
        }
        Ok(())
    }
}

/// Evaluation-session API double. Finalize accepts the submission as-is and
/// records the finalized session for the bed, replacing whatever was there.
#[derive(Default)]
pub(crate) struct InMemorySessionGateway {
    sessions: Mutex<HashMap<String, EvaluationSession>>,
}

impl SessionGateway for InMemorySessionGateway {
    fn active_session(&self, bed_id: &str) -> Result<Option<EvaluationSession>, GatewayError> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        Ok(sessions
            .get(bed_id)
            .filter(|session| session.is_active())
            .cloned())
    }

    fn finalize(&self, request: &FinalizeRequest) -> Result<ServerOutcome, GatewayError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");

        let outcome = ServerOutcome {
            total_points: request.provisional.total_points,
            band: request.provisional.band.clone(),
            state: SessionState::Finalized,
        };

        // sessions are keyed by bed via the draft id convention "ev-<bed>"
        let bed_id = request
            .session_id
            .strip_prefix("ev-")
            .unwrap_or(&request.session_id)
            .to_string();
        sessions.insert(
            bed_id.clone(),
            EvaluationSession {
                session_id: request.session_id.clone(),
                bed_id,
                evaluator: String::new(),
                state: SessionState::Finalized,
                result: Some(ClassificationResult {
                    total_points: outcome.total_points,
                    band: outcome.band.clone(),
                }),
            },
        );

        Ok(outcome)
    }
}

/// SCP instrument served when no schema override comes with the request.
pub(crate) fn sample_schema() -> ClassificationSchema {
    let question = |key: &str, text: &str| Question {
        key: key.to_string(),
        text: text.to_string(),
        options: (1..=4)
            .map(|points| AnswerOption {
                label: format!("{points} pontos"),
                points,
            })
            .collect(),
    };

    ClassificationSchema {
        method: "scp-fugulin".to_string(),
        questions: vec![
            question("estado_mental", "Estado mental"),
            question("oxigenacao", "Oxigenação"),
            question("sinais_vitais", "Sinais vitais"),
            question("motilidade", "Motilidade"),
            question("deambulacao", "Deambulação"),
            question("alimentacao", "Alimentação"),
            question("cuidado_corporal", "Cuidado corporal"),
            question("eliminacao", "Eliminação"),
            question("terapeutica", "Terapêutica"),
        ],
        bands: vec![
            CareBand {
                min: 0,
                max: 14,
                label: "MINIMOS".to_string(),
            },
            CareBand {
                min: 15,
                max: 20,
                label: "INTERMEDIARIOS".to_string(),
            },
            CareBand {
                min: 21,
                max: 26,
                label: "ALTA_DEPENDENCIA".to_string(),
            },
            CareBand {
                min: 27,
                max: 31,
                label: "SEMI_INTENSIVOS".to_string(),
            },
            CareBand {
                min: 32,
                max: 36,
                label: "INTENSIVOS".to_string(),
            },
        ],
    }
}

/// Candidate session for a brand-new evaluation. The gateway's response, not
/// this draft, decides the session's real id and state.
pub(crate) fn draft_session(bed_id: &str, evaluator: &str) -> EvaluationSession {
    EvaluationSession {
        session_id: format!("ev-{bed_id}"),
        bed_id: bed_id.to_string(),
        evaluator: evaluator.to_string(),
        state: SessionState::Active {
            expires_at: Utc::now() + Duration::hours(24),
        },
        result: None,
    }
}

fn seed_unit() -> Value {
    json!({
        "id": "uni-7",
        "nome": "Centro Cirúrgico Ambulatorial",
        "cargosUnidade": [
            {
                "id": "cu-enf",
                "cargoId": 12,
                "cargo": { "id": 12, "nome": "Enfermeiro" },
                "quantidadeFuncionarios": 4
            },
            {
                "id": "cu-tec",
                "cargoId": 15,
                "cargo": { "id": 15, "nome": "Técnico de Enfermagem" },
                "quantidadeFuncionarios": 6
            }
        ],
        "sitiosFuncionais": [
            {
                "id": "sf-1",
                "nome": "Box 01",
                "status": "em_uso",
                "cargos": [
                    { "id": "as-1", "cargoUnidadeId": "cu-enf", "quantidade": 2 },
                    { "id": "as-2", "cargoUnidadeId": "cu-tec", "quantidade": 2 }
                ]
            },
            {
                "id": "sf-2",
                "nome": "Box 02",
                "status": "available",
                "cargosSitio": [
                    { "id": "as-3", "cargo": { "id": 12 }, "quantidade": 1 }
                ]
            }
        ]
    })
}
