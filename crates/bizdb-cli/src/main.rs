mod collect;
mod report;

use bizdb_core::{ProviderKind, MAX_RADIUS_MILES, MIN_RADIUS_MILES};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bizdb-cli")]
#[command(about = "Collect, store and inspect local business listings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search one provider for up to five categories and save the results
    Collect {
        /// google, here or yelp
        #[arg(long)]
        provider: ProviderKind,

        /// Business category; repeat for additional categories
        #[arg(long = "category", required = true)]
        categories: Vec<String>,

        /// Free-text place name or address
        #[arg(long)]
        location: String,

        #[arg(
            long,
            default_value_t = 5,
            value_parser = clap::value_parser!(u32).range(i64::from(MIN_RADIUS_MILES)..=i64::from(MAX_RADIUS_MILES))
        )]
        radius_miles: u32,
    },
    /// Print every stored business
    List {
        /// Emit JSON rows instead of a text table
        #[arg(long)]
        json: bool,
    },
    /// Run one incremental update for the configured plan
    Update,
    /// Replace the stored dataset with a fresh collection for the configured plan
    Refresh,
    /// Look up full details for a provider place id
    Details {
        #[arg(long)]
        provider: ProviderKind,

        id: String,
    },
    /// Show the configured jobs and when each would next fire
    Schedule,
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
    /// Delete every stored business; the run ledger is kept
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("bizdb-cli: no command given; see --help");
        return Ok(());
    };

    let config = bizdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Schedule => report::print_schedule(&config.collection_plan, chrono::Utc::now())?,
        Commands::Details { provider, id } => report::print_details(&config, provider, &id).await?,
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    bizdb_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = bizdb_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
                DbCommands::Clear => {
                    bizdb_db::run_migrations(&pool).await?;
                    let removed = bizdb_db::clear_businesses(&pool).await?;
                    println!("removed {removed} business(es)");
                }
            }
        }
        Commands::Collect {
            provider,
            categories,
            location,
            radius_miles,
        } => {
            let pool = connect_migrated(&config).await?;
            collect::run_collect(&pool, &config, provider, &categories, &location, radius_miles)
                .await?;
        }
        Commands::List { json } => {
            let pool = connect_migrated(&config).await?;
            report::print_businesses(&pool, json).await?;
        }
        Commands::Update => {
            let pool = connect_migrated(&config).await?;
            collect::run_cycle(&pool, &config, bizdb_collect::CycleKind::Incremental).await?;
        }
        Commands::Refresh => {
            let pool = connect_migrated(&config).await?;
            collect::run_cycle(&pool, &config, bizdb_collect::CycleKind::FullRefresh).await?;
        }
    }

    Ok(())
}

async fn connect(config: &bizdb_core::AppConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let pool_config = bizdb_db::PoolConfig::from_app_config(config);
    Ok(bizdb_db::connect_pool(&config.database_url, pool_config).await?)
}

async fn connect_migrated(config: &bizdb_core::AppConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let pool = connect(config).await?;
    bizdb_db::run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests;
