use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{SiteId, UnitId};
use super::repository::{AllocationMutator, DirectoryError, UnitDirectory};
use super::service::{AllocationServiceError, SiteAllocationService, SiteEditForm, SubmissionOutcome};

/// Router builder exposing the reconciliation engine over HTTP.
pub fn allocation_router<D, M>(service: Arc<SiteAllocationService<D, M>>) -> Router
where
    D: UnitDirectory + 'static,
    M: AllocationMutator + 'static,
{
    Router::new()
        .route(
            "/api/v1/units/:unit_id/availability",
            post(availability_handler::<D, M>),
        )
        .route("/api/v1/units/:unit_id/sites", post(submit_site_handler::<D, M>))
        .route("/api/v1/sites/:site_id", delete(delete_site_handler::<D, M>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AvailabilityRequest {
    /// Site currently being edited, excluded from the allocated-elsewhere sum.
    #[serde(default)]
    pub(crate) exclude_site: Option<String>,
}

pub(crate) async fn availability_handler<D, M>(
    State(service): State<Arc<SiteAllocationService<D, M>>>,
    Path(unit_id): Path<String>,
    axum::Json(request): axum::Json<AvailabilityRequest>,
) -> Response
where
    D: UnitDirectory + 'static,
    M: AllocationMutator + 'static,
{
    let unit_id = UnitId(unit_id);
    let exclude_site = request.exclude_site.map(SiteId);

    match service.availability(&unit_id, exclude_site.as_ref()) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_site_handler<D, M>(
    State(service): State<Arc<SiteAllocationService<D, M>>>,
    Path(unit_id): Path<String>,
    axum::Json(form): axum::Json<SiteEditForm>,
) -> Response
where
    D: UnitDirectory + 'static,
    M: AllocationMutator + 'static,
{
    let unit_id = UnitId(unit_id);

    match service.submit_site_edit(&unit_id, &form) {
        Ok(outcome @ SubmissionOutcome::Rejected { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(outcome)).into_response()
        }
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_site_handler<D, M>(
    State(service): State<Arc<SiteAllocationService<D, M>>>,
    Path(site_id): Path<String>,
) -> Response
where
    D: UnitDirectory + 'static,
    M: AllocationMutator + 'static,
{
    match service.delete_site(&SiteId(site_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: AllocationServiceError) -> Response {
    let status = match &err {
        AllocationServiceError::Directory(DirectoryError::UnitNotFound(_)) => StatusCode::NOT_FOUND,
        AllocationServiceError::Directory(DirectoryError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
        AllocationServiceError::Mutation(_) => StatusCode::BAD_GATEWAY,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
