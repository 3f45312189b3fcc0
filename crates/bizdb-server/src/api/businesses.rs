use axum::{extract::State, Extension, Json};
use bizdb_core::{to_table, BusinessTableRow};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CategoryCount {
    category: String,
    count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct BusinessesData {
    count: usize,
    by_category: Vec<CategoryCount>,
    rows: Vec<BusinessTableRow>,
}

pub(super) async fn list_businesses(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<BusinessesData>>, ApiError> {
    let businesses = bizdb_db::load_all_businesses(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let table = to_table(&businesses);
    let by_category = table
        .category_counts()
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

    Ok(Json(ApiResponse::new(
        BusinessesData {
            count: table.len(),
            by_category,
            rows: table.rows,
        },
        req_id.0,
    )))
}
