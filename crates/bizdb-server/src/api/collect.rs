use axum::{extract::State, Extension, Json};
use bizdb_collect::{collect_on_demand, CategoryOutcome, CollectionRequest};
use bizdb_core::{to_table, BusinessTableRow};
use bizdb_db::TriggerSource;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{parse_provider, provider_for, ApiError, ApiResponse, AppState};

fn default_radius_miles() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub(super) struct CollectBody {
    provider: String,
    categories: Vec<String>,
    location: String,
    #[serde(default = "default_radius_miles")]
    radius_miles: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum CollectStatus {
    Ok,
    Empty,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectData {
    status: CollectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    rows: Vec<BusinessTableRow>,
    saved: u64,
    by_category: Vec<CategoryOutcome>,
}

pub(super) async fn collect(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CollectBody>,
) -> Result<Json<ApiResponse<CollectData>>, ApiError> {
    let kind = parse_provider(&req_id.0, &body.provider)?;
    let request = CollectionRequest::on_demand(&body.categories, &body.location, body.radius_miles)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let provider = provider_for(&req_id.0, kind, &state.config)?;

    let outcome = collect_on_demand(
        &state.pool,
        &[provider],
        &request,
        state.config.max_concurrent_categories,
        TriggerSource::Api,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "on-demand collection failed");
        ApiError::new(req_id.0.clone(), "internal_error", "collection could not be saved")
    })?;

    let reason = outcome.collection.empty_reason(&request.location);
    let data = CollectData {
        status: if reason.is_some() {
            CollectStatus::Empty
        } else {
            CollectStatus::Ok
        },
        reason,
        rows: to_table(&outcome.collection.businesses).rows,
        saved: outcome.saved,
        by_category: outcome.collection.by_category,
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}
