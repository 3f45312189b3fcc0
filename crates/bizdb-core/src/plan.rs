//! The collection plan: what the scheduler collects, where, and when.
//!
//! Constructed once at scheduler start and passed down explicitly so tests can
//! inject alternate plans.

use std::collections::HashSet;
use std::path::Path;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::provider_kind::ProviderKind;
use crate::ConfigError;

pub const MIN_RADIUS_MILES: u32 = 1;
pub const MAX_RADIUS_MILES: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailySchedule {
    pub hour: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub hour: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionPlan {
    pub location: String,
    #[serde(default = "default_radius_miles")]
    pub radius_miles: u32,
    /// Providers queried per category; the first is the merge primary.
    pub providers: Vec<ProviderKind>,
    pub categories: Vec<String>,
    #[serde(default = "default_daily_update")]
    pub daily_update: DailySchedule,
    #[serde(default = "default_weekly_refresh")]
    pub weekly_refresh: WeeklySchedule,
}

fn default_radius_miles() -> u32 {
    5
}

fn default_daily_update() -> DailySchedule {
    DailySchedule { hour: 2 }
}

fn default_weekly_refresh() -> WeeklySchedule {
    WeeklySchedule {
        weekday: Weekday::Sun,
        hour: 3,
    }
}

impl Default for CollectionPlan {
    fn default() -> Self {
        Self {
            location: "Oakland County, Michigan".to_string(),
            radius_miles: default_radius_miles(),
            providers: vec![ProviderKind::Yelp],
            categories: vec![
                "Marketing Firms".to_string(),
                "Lawyers".to_string(),
                "Paralegal".to_string(),
            ],
            daily_update: default_daily_update(),
            weekly_refresh: default_weekly_refresh(),
        }
    }
}

/// Load and validate a collection plan from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_collection_plan(path: &Path) -> Result<CollectionPlan, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlanFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_collection_plan(&content)
}

/// Parse and validate a collection plan from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text is not a valid plan.
pub fn parse_collection_plan(content: &str) -> Result<CollectionPlan, ConfigError> {
    let mut plan: CollectionPlan = serde_yaml::from_str(content)?;
    plan.location = plan.location.trim().to_string();
    plan.categories = plan
        .categories
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    validate_plan(&plan)?;
    Ok(plan)
}

/// Checks the invariants every plan must satisfy.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the first violation.
pub fn validate_plan(plan: &CollectionPlan) -> Result<(), ConfigError> {
    if plan.location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "location must be non-empty".to_string(),
        ));
    }

    if !(MIN_RADIUS_MILES..=MAX_RADIUS_MILES).contains(&plan.radius_miles) {
        return Err(ConfigError::Validation(format!(
            "radius_miles {} must be between {MIN_RADIUS_MILES} and {MAX_RADIUS_MILES}",
            plan.radius_miles
        )));
    }

    if plan.providers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one provider is required".to_string(),
        ));
    }
    let mut seen_providers = HashSet::new();
    for provider in &plan.providers {
        if !seen_providers.insert(*provider) {
            return Err(ConfigError::Validation(format!(
                "duplicate provider: '{provider}'"
            )));
        }
    }

    if plan.categories.iter().all(|c| c.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one category is required".to_string(),
        ));
    }
    let mut seen_categories = HashSet::new();
    for category in &plan.categories {
        if !seen_categories.insert(category.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category: '{category}'"
            )));
        }
    }

    for (label, hour) in [
        ("daily_update.hour", plan.daily_update.hour),
        ("weekly_refresh.hour", plan.weekly_refresh.hour),
    ] {
        if hour > 23 {
            return Err(ConfigError::Validation(format!(
                "{label} {hour} must be between 0 and 23"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PLAN: &str = r#"
location: "Detroit, MI"
radius_miles: 10
providers: [here, yelp]
categories: ["Restaurants", " Auto Repair "]
daily_update: { hour: 4 }
weekly_refresh: { weekday: mon, hour: 5 }
"#;

    #[test]
    fn default_plan_is_valid() {
        let plan = CollectionPlan::default();
        validate_plan(&plan).unwrap();
        assert_eq!(plan.location, "Oakland County, Michigan");
        // Only the Yelp key is needed to run with the built-in plan.
        assert_eq!(plan.providers, vec![ProviderKind::Yelp]);
        assert_eq!(plan.weekly_refresh.weekday, Weekday::Sun);
    }

    #[test]
    fn parses_full_plan() {
        let plan = parse_collection_plan(FULL_PLAN).unwrap();
        assert_eq!(plan.location, "Detroit, MI");
        assert_eq!(plan.radius_miles, 10);
        assert_eq!(plan.providers, vec![ProviderKind::Here, ProviderKind::Yelp]);
        assert_eq!(plan.categories, vec!["Restaurants", "Auto Repair"]);
        assert_eq!(plan.daily_update.hour, 4);
        assert_eq!(plan.weekly_refresh.weekday, Weekday::Mon);
        assert_eq!(plan.weekly_refresh.hour, 5);
    }

    #[test]
    fn schedules_default_when_omitted() {
        let plan = parse_collection_plan(
            "location: Troy, MI\nproviders: [yelp]\ncategories: [Lawyers]\n",
        )
        .unwrap();
        assert_eq!(plan.radius_miles, 5);
        assert_eq!(plan.daily_update.hour, 2);
        assert_eq!(plan.weekly_refresh.hour, 3);
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = parse_collection_plan(
            "location: Troy\nproviders: [bing]\ncategories: [Lawyers]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::PlanFileParse(_)), "got {err:?}");
    }

    #[test]
    fn rejects_duplicate_categories_case_insensitively() {
        let err = parse_collection_plan(
            "location: Troy\nproviders: [yelp]\ncategories: [Lawyers, lawyers]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate category")));
    }

    #[test]
    fn rejects_blank_categories() {
        let err = parse_collection_plan(
            "location: Troy\nproviders: [yelp]\ncategories: [\"  \"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_duplicate_providers() {
        let err = parse_collection_plan(
            "location: Troy\nproviders: [yelp, yelp]\ncategories: [Lawyers]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate provider")));
    }

    #[test]
    fn rejects_out_of_range_radius_and_hour() {
        let radius = parse_collection_plan(
            "location: Troy\nradius_miles: 40\nproviders: [yelp]\ncategories: [Lawyers]\n",
        );
        assert!(matches!(radius, Err(ConfigError::Validation(_))));

        let hour = parse_collection_plan(
            "location: Troy\nproviders: [yelp]\ncategories: [Lawyers]\ndaily_update: { hour: 24 }\n",
        );
        assert!(matches!(hour, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_collection_plan(Path::new("/nonexistent/plan.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::PlanFileIo { .. }));
    }
}
