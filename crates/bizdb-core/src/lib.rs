pub mod app_config;
pub mod business;
pub mod classify;
pub mod config;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod plan;
pub mod provider_kind;
pub mod raw;
pub mod table;

pub use app_config::{AppConfig, Environment, ProviderCredentials};
pub use business::{AddressType, Business, GeoPoint};
pub use classify::{classify_address, classify_address_with, COMMERCIAL_INDICATORS};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use merge::{merge, merge_all, DedupKey};
pub use normalize::{clean, clean_record, NormalizeError};
pub use plan::{
    load_collection_plan, parse_collection_plan, validate_plan, CollectionPlan, DailySchedule,
    WeeklySchedule, MAX_RADIUS_MILES, MIN_RADIUS_MILES,
};
pub use provider_kind::{radius_meters_from_miles, ProviderKind};
pub use raw::{keys, RawRecord};
pub use table::{to_table, BusinessTable, BusinessTableRow};
