use axum::{
    extract::{Path, State},
    Extension, Json,
};
use bizdb_collect::{
    plan_jobs, CycleReport, CycleState, JobStatus, NextRun, SchedulerError, SchedulerStatus,
};
use bizdb_core::CollectionPlan;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

/// The configured jobs, none of them scheduled.
fn disabled_status(plan: &CollectionPlan) -> SchedulerStatus {
    let jobs = plan_jobs(plan)
        .unwrap_or_default()
        .into_iter()
        .map(|job| JobStatus {
            schedule: job.trigger.to_string(),
            id: job.id,
            name: job.name,
            next_run: NextRun::NotScheduled,
            last_run: None,
        })
        .collect();
    SchedulerStatus {
        running: false,
        cycle: CycleState::Idle,
        jobs,
    }
}

pub(super) async fn scheduler_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SchedulerStatus>> {
    let status = match &state.scheduler {
        Some(scheduler) => scheduler.status(),
        None => disabled_status(&state.config.collection_plan),
    };
    Json(ApiResponse::new(status, req_id.0))
}

pub(super) async fn run_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<String>,
) -> Result<Json<ApiResponse<CycleReport>>, ApiError> {
    let Some(scheduler) = state.scheduler.clone() else {
        return Err(ApiError::new(
            req_id.0,
            "service_unavailable",
            "background scheduler is disabled",
        ));
    };

    // Detached: the cycle runs to completion even if the client goes away.
    let id = job_id.clone();
    let joined = tokio::spawn(async move { scheduler.trigger_now(&id).await }).await;

    match joined {
        Ok(Ok(report)) => Ok(Json(ApiResponse::new(report, req_id.0))),
        Ok(Err(SchedulerError::NotScheduled(_))) => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no job '{job_id}'"),
        )),
        Ok(Err(SchedulerError::Busy)) => Err(ApiError::new(
            req_id.0,
            "conflict",
            "a collection cycle is already in progress",
        )),
        Ok(Err(e)) => {
            tracing::error!(job = %job_id, error = %e, "manual job run failed");
            Err(ApiError::new(req_id.0, "internal_error", e.to_string()))
        }
        Err(e) => {
            tracing::error!(job = %job_id, error = %e, "manual job run task failed");
            Err(ApiError::new(req_id.0, "internal_error", "job run failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use bizdb_collect::{
        CycleError, CycleKind, CycleReport, CycleRunner, ManualClock, Scheduler,
    };
    use bizdb_core::CollectionPlan;
    use bizdb_db::TriggerSource;
    use chrono::{TimeZone, Utc};
    use futures::future::BoxFuture;

    use super::super::test_support::{app_with, get, post_json, send};

    struct StubRunner;

    impl CycleRunner for StubRunner {
        fn run(
            &self,
            kind: CycleKind,
            _trigger: TriggerSource,
        ) -> BoxFuture<'static, Result<CycleReport, CycleError>> {
            Box::pin(async move {
                Ok(CycleReport {
                    kind,
                    collected: 4,
                    saved: 4,
                    by_category: Vec::new(),
                })
            })
        }
    }

    fn scheduler() -> Arc<Scheduler> {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 1, 30, 0).unwrap());
        Arc::new(
            Scheduler::for_plan(
                Arc::new(clock),
                Arc::new(StubRunner),
                &CollectionPlan::default(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn disabled_scheduler_lists_jobs_as_not_scheduled() {
        let (app, _pool) = app_with(&[], None).await;
        let (status, json) = send(app, get("/api/v1/scheduler")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["running"], false);
        assert_eq!(json["data"]["cycle"], "idle");
        assert_eq!(json["data"]["jobs"][0]["id"], "daily_update");
        assert_eq!(json["data"]["jobs"][0]["next_run"], "Not scheduled");
        assert_eq!(json["data"]["jobs"][1]["name"], "Weekly full refresh");
    }

    #[tokio::test]
    async fn running_scheduler_reports_next_fire_times() {
        let scheduler = scheduler();
        scheduler.start().unwrap();
        let (app, _pool) = app_with(&[], Some(Arc::clone(&scheduler))).await;

        let (status, json) = send(app, get("/api/v1/scheduler")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["running"], true);
        assert_eq!(json["data"]["jobs"][0]["next_run"], "2024-03-05 02:00:00");
        assert_eq!(json["data"]["jobs"][1]["next_run"], "2024-03-10 03:00:00");

        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn manual_run_returns_the_cycle_report() {
        let scheduler = scheduler();
        let (app, _pool) = app_with(&[], Some(Arc::clone(&scheduler))).await;

        let (status, json) = send(
            app,
            post_json("/api/v1/scheduler/jobs/weekly_refresh/run", &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["kind"], "full_refresh");
        assert_eq!(json["data"]["saved"], 4);
        assert_eq!(
            scheduler.status().jobs[1].last_run.as_ref().map(|r| r.saved),
            Some(Some(4))
        );
    }

    #[tokio::test]
    async fn manual_run_of_unknown_job_is_not_found() {
        let (app, _pool) = app_with(&[], Some(scheduler())).await;
        let (status, json) = send(
            app,
            post_json("/api/v1/scheduler/jobs/hourly/run", &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn manual_run_without_scheduler_is_unavailable() {
        let (app, _pool) = app_with(&[], None).await;
        let (status, json) = send(
            app,
            post_json("/api/v1/scheduler/jobs/daily_update/run", &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "service_unavailable");
    }
}
