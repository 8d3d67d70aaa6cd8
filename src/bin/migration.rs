use anyhow::{Context, Result};
use tracing::info;

use facility_registry::{config, migrator};

/// Applies all schema migrations (and reference seeds) to the configured database.
///
/// `DATABASE_URL` overrides the configured `database_url`.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_config().context("failed to load application config")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database_url.clone());

    info!("Starting database migration");
    migrator::run_migration(&database_url).await?;
    info!("Migration completed successfully");

    Ok(())
}
