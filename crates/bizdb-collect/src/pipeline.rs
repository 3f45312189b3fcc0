//! Update cycles: incremental append, destructive full refresh, and
//! operator-driven on-demand collection, each recorded in the run ledger.

use std::fmt;
use std::sync::Arc;

use bizdb_core::{AppConfig, CollectionPlan};
use bizdb_db::{RunType, TriggerSource};
use bizdb_providers::{Provider, ProviderError};
use futures::future::BoxFuture;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::collector::{collect, CategoryOutcome, Collection, CollectionRequest};
use crate::error::CycleError;
use crate::scheduler::CycleRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    Incremental,
    FullRefresh,
}

impl CycleKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CycleKind::Incremental => "incremental",
            CycleKind::FullRefresh => "full_refresh",
        }
    }
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub collected: usize,
    pub saved: u64,
    pub by_category: Vec<CategoryOutcome>,
}

/// Result of an on-demand collection: what was found and how much was kept.
#[derive(Debug, Clone)]
pub struct OnDemandOutcome {
    pub collection: Collection,
    pub saved: u64,
}

/// Runs collection cycles for a fixed plan against one store.
#[derive(Clone)]
pub struct Pipeline {
    pool: SqlitePool,
    providers: Arc<[Provider]>,
    plan: Arc<CollectionPlan>,
    max_concurrent: usize,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("providers", &self.providers)
            .field("plan", &self.plan)
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(
        pool: SqlitePool,
        providers: Vec<Provider>,
        plan: CollectionPlan,
        max_concurrent: usize,
    ) -> Self {
        Self {
            pool,
            providers: providers.into(),
            plan: Arc::new(plan),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Builds the plan's providers from configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] when any provider named by
    /// the plan has no key, before any network call is made.
    pub fn from_config(pool: SqlitePool, config: &AppConfig) -> Result<Self, ProviderError> {
        let plan = config.collection_plan.clone();
        let providers = Provider::all_from_config(&plan.providers, config)?;
        Ok(Self::new(
            pool,
            providers,
            plan,
            config.max_concurrent_categories,
        ))
    }

    #[must_use]
    pub fn plan(&self) -> &CollectionPlan {
        &self.plan
    }

    fn plan_request(&self) -> CollectionRequest {
        CollectionRequest {
            categories: self.plan.categories.clone(),
            location: self.plan.location.clone(),
            radius_m: bizdb_core::radius_meters_from_miles(self.plan.radius_miles),
        }
    }

    /// Collects every planned category and appends the batch in one write.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Store`] if the batch cannot be written. Provider
    /// failures only reduce the batch.
    pub async fn update_data(&self, trigger: TriggerSource) -> Result<CycleReport, CycleError> {
        let run_id = begin_run(&self.pool, RunType::Incremental, trigger).await;
        let collection = collect(&self.providers, &self.plan_request(), self.max_concurrent).await;

        let result = bizdb_db::save_businesses(&self.pool, &collection.businesses).await;
        self.finish(CycleKind::Incremental, run_id, collection, result)
            .await
    }

    /// Collects every planned category, then swaps the stored dataset for the
    /// result in one transaction.
    ///
    /// The old dataset is discarded even when nothing was collected.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Store`] if the replacement cannot be committed;
    /// the previous dataset then survives intact.
    pub async fn full_refresh(&self, trigger: TriggerSource) -> Result<CycleReport, CycleError> {
        let run_id = begin_run(&self.pool, RunType::FullRefresh, trigger).await;
        let collection = collect(&self.providers, &self.plan_request(), self.max_concurrent).await;

        if collection.is_empty() {
            tracing::warn!(
                location = %self.plan.location,
                "full refresh collected nothing; store will be left empty"
            );
        }
        let result = bizdb_db::replace_businesses(&self.pool, &collection.businesses).await;
        self.finish(CycleKind::FullRefresh, run_id, collection, result)
            .await
    }

    async fn finish(
        &self,
        kind: CycleKind,
        run_id: Option<i64>,
        collection: Collection,
        result: Result<u64, bizdb_db::DbError>,
    ) -> Result<CycleReport, CycleError> {
        match result {
            Ok(saved) => {
                end_run(&self.pool, run_id, Ok(saved)).await;
                Ok(CycleReport {
                    kind,
                    collected: collection.businesses.len(),
                    saved,
                    by_category: collection.by_category,
                })
            }
            Err(e) => {
                end_run(&self.pool, run_id, Err(&e.to_string())).await;
                Err(CycleError::Store(e))
            }
        }
    }
}

impl CycleRunner for Pipeline {
    fn run(
        &self,
        kind: CycleKind,
        trigger: TriggerSource,
    ) -> BoxFuture<'static, Result<CycleReport, CycleError>> {
        let pipeline = self.clone();
        Box::pin(async move {
            match kind {
                CycleKind::Incremental => pipeline.update_data(trigger).await,
                CycleKind::FullRefresh => pipeline.full_refresh(trigger).await,
            }
        })
    }
}

/// Collects `request` from `providers` and appends whatever was found.
///
/// # Errors
///
/// Returns [`CycleError::Store`] if the batch cannot be written.
pub async fn collect_on_demand(
    pool: &SqlitePool,
    providers: &[Provider],
    request: &CollectionRequest,
    max_concurrent: usize,
    trigger: TriggerSource,
) -> Result<OnDemandOutcome, CycleError> {
    let run_id = begin_run(pool, RunType::OnDemand, trigger).await;
    let collection = collect(providers, request, max_concurrent).await;

    match bizdb_db::save_businesses(pool, &collection.businesses).await {
        Ok(saved) => {
            end_run(pool, run_id, Ok(saved)).await;
            Ok(OnDemandOutcome { collection, saved })
        }
        Err(e) => {
            end_run(pool, run_id, Err(&e.to_string())).await;
            Err(CycleError::Store(e))
        }
    }
}

// The ledger is bookkeeping: a failure to record a run never fails the run.
async fn begin_run(pool: &SqlitePool, run_type: RunType, trigger: TriggerSource) -> Option<i64> {
    let run = match bizdb_db::create_collection_run(pool, run_type, trigger).await {
        Ok(run) => run,
        Err(e) => {
            tracing::warn!(run_type = run_type.as_str(), error = %e, "could not record collection run");
            return None;
        }
    };
    if let Err(e) = bizdb_db::start_collection_run(pool, run.id).await {
        tracing::warn!(run_id = run.id, error = %e, "could not mark collection run running");
        return None;
    }
    Some(run.id)
}

async fn end_run(pool: &SqlitePool, run_id: Option<i64>, outcome: Result<u64, &str>) {
    let Some(id) = run_id else {
        return;
    };
    let result = match outcome {
        Ok(saved) => bizdb_db::complete_collection_run(pool, id, saved).await,
        Err(message) => bizdb_db::fail_collection_run(pool, id, message).await,
    };
    if let Err(e) = result {
        tracing::warn!(run_id = id, error = %e, "could not close collection run");
    }
}
