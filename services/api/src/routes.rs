use crate::infra::{draft_session, sample_schema, AppState};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use hospital_ops::error::AppError;
use hospital_ops::workflows::allocation::{
    allocation_router, AllocationMutator, SiteAllocationService, UnitDirectory,
};
use hospital_ops::workflows::scp::{
    classify, is_complete, needs_overwrite_confirmation, score, AnswerSet, ClassificationSchema,
    EvaluationSession, SessionGateway,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ScpScoreRequest {
    /// Instrument override; the built-in schema is used when absent.
    #[serde(default)]
    pub(crate) schema: Option<ClassificationSchema>,
    pub(crate) answers: AnswerSet,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScpScoreResponse {
    pub(crate) method: String,
    pub(crate) total_points: u32,
    pub(crate) band: Option<String>,
    pub(crate) complete: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinalizeEvaluationRequest {
    pub(crate) bed_id: String,
    pub(crate) evaluator: String,
    pub(crate) answers: AnswerSet,
    /// Required when the bed already holds an active session.
    #[serde(default)]
    pub(crate) confirm_overwrite: bool,
    #[serde(default)]
    pub(crate) schema: Option<ClassificationSchema>,
}

pub(crate) fn with_operations_routes<D, M>(
    service: Arc<SiteAllocationService<D, M>>,
) -> axum::Router
where
    D: UnitDirectory + 'static,
    M: AllocationMutator + 'static,
{
    allocation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/scp/score",
            axum::routing::post(scp_score_endpoint),
        )
        .route(
            "/api/v1/scp/evaluations",
            axum::routing::post(finalize_evaluation_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Live scoring preview. Partial answer sets are welcome; unanswered
/// questions simply contribute nothing yet.
pub(crate) async fn scp_score_endpoint(
    Json(payload): Json<ScpScoreRequest>,
) -> Json<ScpScoreResponse> {
    let schema = payload.schema.unwrap_or_else(sample_schema);
    let total_points = score(&schema, &payload.answers);

    Json(ScpScoreResponse {
        method: schema.method.clone(),
        total_points,
        band: classify(&schema, total_points).map(|band| band.label.clone()),
        complete: is_complete(&schema, &payload.answers),
    })
}

/// Finalize an SCP evaluation for a bed. Returns 409 when the bed already
/// holds an active session and the operator has not confirmed the overwrite;
/// the returned session carries the server's authoritative result.
pub(crate) async fn finalize_evaluation_endpoint(
    Extension(gateway): Extension<Arc<dyn SessionGateway>>,
    Json(payload): Json<FinalizeEvaluationRequest>,
) -> Result<Response, AppError> {
    let schema = payload.schema.unwrap_or_else(sample_schema);

    let existing = gateway.active_session(&payload.bed_id)?;
    if needs_overwrite_confirmation(existing.as_ref()) && !payload.confirm_overwrite {
        let session_id = existing.map(|session| session.session_id);
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "bed already holds an active evaluation session",
                "session_id": session_id,
            })),
        )
            .into_response());
    }

    let mut session: EvaluationSession = draft_session(&payload.bed_id, &payload.evaluator);
    let request = session.finalize_request(&schema, &payload.answers)?;
    let outcome = gateway.finalize(&request)?;
    session.adopt(outcome);

    Ok(Json(session).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use hospital_ops::workflows::scp::{
        FinalizeRequest, GatewayError, ServerOutcome, SessionState,
    };

    struct StubGateway {
        busy_bed: Option<&'static str>,
    }

    impl SessionGateway for StubGateway {
        fn active_session(&self, bed_id: &str) -> Result<Option<EvaluationSession>, GatewayError> {
            if self.busy_bed == Some(bed_id) {
                return Ok(Some(EvaluationSession {
                    session_id: "ev-existing".to_string(),
                    bed_id: bed_id.to_string(),
                    evaluator: "coren-111".to_string(),
                    state: SessionState::Active {
                        expires_at: Utc::now() + Duration::hours(12),
                    },
                    result: None,
                }));
            }
            Ok(None)
        }

        fn finalize(&self, request: &FinalizeRequest) -> Result<ServerOutcome, GatewayError> {
            Ok(ServerOutcome {
                total_points: request.provisional.total_points,
                band: request.provisional.band.clone(),
                state: SessionState::Finalized,
            })
        }
    }

    fn full_answers() -> AnswerSet {
        sample_schema()
            .questions
            .iter()
            .map(|question| (question.key.clone(), 2))
            .collect()
    }

    #[tokio::test]
    async fn score_endpoint_previews_partial_answer_sets() {
        let request = ScpScoreRequest {
            schema: None,
            answers: AnswerSet::from([("estado_mental".to_string(), 4)]),
        };

        let Json(body) = scp_score_endpoint(Json(request)).await;

        assert_eq!(body.total_points, 4);
        assert_eq!(body.band.as_deref(), Some("MINIMOS"));
        assert!(!body.complete);
    }

    #[tokio::test]
    async fn score_endpoint_bands_a_complete_answer_set() {
        let request = ScpScoreRequest {
            schema: None,
            answers: full_answers(),
        };

        let Json(body) = scp_score_endpoint(Json(request)).await;

        assert_eq!(body.total_points, 18);
        assert_eq!(body.band.as_deref(), Some("INTERMEDIARIOS"));
        assert!(body.complete);
    }

    #[tokio::test]
    async fn finalize_endpoint_returns_the_server_result() {
        let gateway: Arc<dyn SessionGateway> = Arc::new(StubGateway { busy_bed: None });
        let request = FinalizeEvaluationRequest {
            bed_id: "leito-12".to_string(),
            evaluator: "coren-555".to_string(),
            answers: full_answers(),
            confirm_overwrite: false,
            schema: None,
        };

        let response = finalize_evaluation_endpoint(Extension(gateway), Json(request))
            .await
            .expect("finalize succeeds");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn finalize_endpoint_conflicts_on_a_busy_bed() {
        let gateway: Arc<dyn SessionGateway> = Arc::new(StubGateway {
            busy_bed: Some("leito-busy"),
        });
        let request = FinalizeEvaluationRequest {
            bed_id: "leito-busy".to_string(),
            evaluator: "coren-555".to_string(),
            answers: full_answers(),
            confirm_overwrite: false,
            schema: None,
        };

        let response = finalize_evaluation_endpoint(Extension(gateway), Json(request))
            .await
            .expect("handler responds");

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn finalize_endpoint_overwrites_when_confirmed() {
        let gateway: Arc<dyn SessionGateway> = Arc::new(StubGateway {
            busy_bed: Some("leito-busy"),
        });
        let request = FinalizeEvaluationRequest {
            bed_id: "leito-busy".to_string(),
            evaluator: "coren-555".to_string(),
            answers: full_answers(),
            confirm_overwrite: true,
            schema: None,
        };

        let response = finalize_evaluation_endpoint(Extension(gateway), Json(request))
            .await
            .expect("finalize succeeds");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn finalize_endpoint_rejects_an_incomplete_answer_set() {
        let gateway: Arc<dyn SessionGateway> = Arc::new(StubGateway { busy_bed: None });
        let request = FinalizeEvaluationRequest {
            bed_id: "leito-12".to_string(),
            evaluator: "coren-555".to_string(),
            answers: AnswerSet::from([("estado_mental".to_string(), 2)]),
            confirm_overwrite: false,
            schema: None,
        };

        let err = finalize_evaluation_endpoint(Extension(gateway), Json(request))
            .await
            .expect_err("incomplete answers refused");

        assert!(matches!(err, AppError::Session(_)));
    }
}
