use anyhow::Context;
use bizdb_collect::{
    collect_on_demand, CategoryOutcome, CollectionRequest, CycleKind, CycleReport, Pipeline,
};
use bizdb_core::{AppConfig, ProviderKind};
use bizdb_db::TriggerSource;
use bizdb_providers::Provider;
use sqlx::SqlitePool;

use crate::report;

pub(crate) async fn run_collect(
    pool: &SqlitePool,
    config: &AppConfig,
    provider: ProviderKind,
    categories: &[String],
    location: &str,
    radius_miles: u32,
) -> anyhow::Result<()> {
    let request = CollectionRequest::on_demand(categories, location, radius_miles)?;
    let client = Provider::from_config(provider, config)?;

    println!(
        "collecting {} categor{} from {provider} near {} ({} m)",
        request.categories.len(),
        if request.categories.len() == 1 { "y" } else { "ies" },
        request.location,
        request.radius_m
    );

    let outcome = collect_on_demand(
        pool,
        &[client],
        &request,
        config.max_concurrent_categories,
        TriggerSource::Cli,
    )
    .await
    .context("on-demand collection failed")?;

    for line in category_lines(&outcome.collection.by_category) {
        println!("{line}");
    }

    if let Some(reason) = outcome.collection.empty_reason(&request.location) {
        println!("{reason}");
        return Ok(());
    }

    let table = bizdb_core::to_table(&outcome.collection.businesses);
    print!("{}", report::render_table(&table));
    println!(
        "collected {} businesses, saved {}",
        outcome.collection.businesses.len(),
        outcome.saved
    );
    Ok(())
}

pub(crate) async fn run_cycle(
    pool: &SqlitePool,
    config: &AppConfig,
    kind: CycleKind,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(pool.clone(), config)?;
    let plan = pipeline.plan();
    println!(
        "{kind}: {} categories near {} ({} mi)",
        plan.categories.len(),
        plan.location,
        plan.radius_miles
    );

    let report = match kind {
        CycleKind::Incremental => pipeline.update_data(TriggerSource::Cli).await,
        CycleKind::FullRefresh => pipeline.full_refresh(TriggerSource::Cli).await,
    }
    .with_context(|| format!("{kind} cycle failed"))?;

    for line in cycle_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

/// One line per category; failed providers are listed after the count.
pub(crate) fn category_lines(outcomes: &[CategoryOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|outcome| {
            let mut line = format!("  {:<24} {:>4} records", outcome.category, outcome.records);
            for failure in &outcome.failures {
                line.push_str(&format!("  [{} failed: {}]", failure.provider, failure.error));
            }
            line
        })
        .collect()
}

pub(crate) fn cycle_lines(report: &CycleReport) -> Vec<String> {
    let mut lines = category_lines(&report.by_category);
    lines.push(format!(
        "{} complete: collected {}, saved {}",
        report.kind, report.collected, report.saved
    ));
    lines
}

#[cfg(test)]
mod tests {
    use bizdb_collect::{CategoryOutcome, CycleKind, CycleReport, ProviderFailure};

    use super::*;

    fn outcome(category: &str, records: usize, failures: &[(&str, &str)]) -> CategoryOutcome {
        CategoryOutcome {
            category: category.to_string(),
            records,
            failures: failures
                .iter()
                .map(|(provider, error)| ProviderFailure {
                    provider: (*provider).to_string(),
                    error: (*error).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn category_lines_show_counts_and_failures() {
        let lines = category_lines(&[
            outcome("Lawyers", 12, &[]),
            outcome("Paralegal", 0, &[("yelp", "HTTP 500")]),
        ]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Lawyers"));
        assert!(lines[0].contains("12 records"));
        assert!(lines[1].contains("[yelp failed: HTTP 500]"));
    }

    #[test]
    fn cycle_lines_end_with_a_summary() {
        let report = CycleReport {
            kind: CycleKind::FullRefresh,
            collected: 7,
            saved: 7,
            by_category: vec![outcome("Lawyers", 7, &[])],
        };
        let lines = cycle_lines(&report);
        assert_eq!(
            lines.last().map(String::as_str),
            Some("full_refresh complete: collected 7, saved 7")
        );
    }
}
