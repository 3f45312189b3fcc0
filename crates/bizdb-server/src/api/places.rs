use axum::{
    extract::{Path, State},
    Extension, Json,
};
use bizdb_core::RawRecord;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{parse_provider, provider_for, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct PlaceData {
    provider: String,
    place_id: String,
    record: RawRecord,
}

/// Full details for one provider place id.
pub(super) async fn get_place(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((provider, place_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<PlaceData>>, ApiError> {
    let kind = parse_provider(&req_id.0, &provider)?;
    let client = provider_for(&req_id.0, kind, &state.config)?;

    match client.try_details(&place_id).await {
        Ok(Some(record)) => Ok(Json(ApiResponse::new(
            PlaceData {
                provider: kind.to_string(),
                place_id,
                record,
            },
            req_id.0,
        ))),
        Ok(None) => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("{kind} has no place '{place_id}'"),
        )),
        Err(e) => {
            tracing::warn!(provider = %kind, place_id = %place_id, error = %e, "details lookup failed");
            Err(ApiError::new(
                req_id.0,
                "upstream_error",
                format!("{kind} details lookup failed"),
            ))
        }
    }
}
