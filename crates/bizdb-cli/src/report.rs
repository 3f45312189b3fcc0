use std::fmt::Write as _;

use anyhow::Context;
use bizdb_collect::{plan_jobs, NextRun};
use bizdb_core::{to_table, AppConfig, BusinessTable, CollectionPlan, ProviderKind};
use bizdb_providers::Provider;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const NAME_WIDTH: usize = 32;
const ADDRESS_WIDTH: usize = 40;

pub(crate) async fn print_businesses(pool: &SqlitePool, json: bool) -> anyhow::Result<()> {
    let businesses = bizdb_db::load_all_businesses(pool)
        .await
        .context("failed to load businesses")?;
    let table = to_table(&businesses);

    if json {
        println!("{}", serde_json::to_string_pretty(&table.rows)?);
        return Ok(());
    }

    if table.is_empty() {
        println!("no businesses stored");
        return Ok(());
    }
    print!("{}", render_table(&table));
    for (category, count) in table.category_counts() {
        println!("  {category}: {count}");
    }
    println!("{} businesses", table.len());
    Ok(())
}

pub(crate) async fn print_details(
    config: &AppConfig,
    kind: ProviderKind,
    id: &str,
) -> anyhow::Result<()> {
    let provider = Provider::from_config(kind, config)?;
    match provider
        .try_details(id)
        .await
        .with_context(|| format!("{kind} details lookup failed"))?
    {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("{kind} has no place with id '{id}'"),
    }
    Ok(())
}

pub(crate) fn print_schedule(plan: &CollectionPlan, now: DateTime<Utc>) -> anyhow::Result<()> {
    for line in schedule_lines(plan, now)? {
        println!("{line}");
    }
    Ok(())
}

/// The plan's jobs with the first fire time strictly after `now`.
pub(crate) fn schedule_lines(
    plan: &CollectionPlan,
    now: DateTime<Utc>,
) -> Result<Vec<String>, bizdb_collect::TriggerError> {
    Ok(plan_jobs(plan)?
        .into_iter()
        .map(|job| {
            let next = NextRun::At(job.trigger.next_fire_after(now));
            let schedule = job.trigger.to_string();
            format!("{:<16} {:<22} {schedule:<26} next: {next}", job.id, job.name)
        })
        .collect())
}

/// Fixed-width text rendering of the display columns.
pub(crate) fn render_table(table: &BusinessTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<NAME_WIDTH$} {:<ADDRESS_WIDTH$} {:<11} {:>6} {:>7} {:<16} {:<18} {}",
        "NAME", "ADDRESS", "TYPE", "RATING", "REVIEWS", "PHONE", "CATEGORY", "SOURCE"
    );
    for row in &table.rows {
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$} {:<ADDRESS_WIDTH$} {:<11} {:>6.1} {:>7} {:<16} {:<18} {}",
            clip(&row.name, NAME_WIDTH),
            clip(&row.address, ADDRESS_WIDTH),
            row.address_type,
            row.rating,
            row.review_count,
            row.phone,
            row.business_category,
            row.source
        );
    }
    out
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
