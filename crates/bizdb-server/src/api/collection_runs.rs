use axum::{
    extract::{Query, State},
    Extension, Json,
};
use bizdb_db::CollectionRunRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

const RUN_STATUSES: [&str; 4] = ["queued", "running", "succeeded", "failed"];

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    limit: Option<i64>,
    status: Option<String>,
}

/// A ledger row as shown to operators. The internal row id stays private.
#[derive(Debug, Serialize)]
pub(super) struct RunView {
    id: String,
    run_type: String,
    trigger_source: String,
    status: String,
    records_processed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    /// Wall time between start and completion; absent until the run finishes.
    duration_ms: Option<i64>,
}

impl From<CollectionRunRow> for RunView {
    fn from(row: CollectionRunRow) -> Self {
        let duration_ms = match (row.started_at, row.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0)),
            _ => None,
        };
        Self {
            id: row.public_id,
            run_type: row.run_type,
            trigger_source: row.trigger_source,
            status: row.status,
            records_processed: row.records_processed,
            error: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_ms,
        }
    }
}

pub(super) async fn list_collection_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<RunView>>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let rows = match query.status.as_deref().map(str::trim) {
        None | Some("") => bizdb_db::list_collection_runs(&state.pool, limit).await,
        Some(status) if RUN_STATUSES.contains(&status) => {
            bizdb_db::list_collection_runs_by_status(&state.pool, status, limit).await
        }
        Some(other) => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                format!("unknown run status '{other}'; expected one of {}", RUN_STATUSES.join(", ")),
            ))
        }
    }
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let runs = rows.into_iter().map(RunView::from).collect();
    Ok(Json(ApiResponse::new(runs, req_id.0)))
}
