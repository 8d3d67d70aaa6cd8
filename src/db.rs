use crate::config::AppConfig;
use crate::errors::{AppError, ServiceError};
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, AppError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("facility_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        AppError::DatabaseError(e)
    })?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, AppError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Opens a transaction for one coordinator operation.
///
/// The returned [`UnitOfWork`] rolls back when dropped without [`UnitOfWork::commit`].
pub async fn begin_unit(pool: &DbPool, operation: &'static str) -> Result<UnitOfWork, ServiceError> {
    let txn = pool.begin().await.map_err(|e| {
        error!(operation, error = %e, "Failed to open transaction");
        ServiceError::db_error(e)
    })?;
    let id = Uuid::new_v4();
    debug!(transaction_id = %id, operation, "Starting database transaction");
    counter!("facility_db.transaction.started", 1);

    Ok(UnitOfWork {
        txn,
        id,
        operation,
        started: Instant::now(),
    })
}

/// A single atomic unit of work wrapping a database transaction.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
    id: Uuid,
    operation: &'static str,
    started: Instant,
}

impl UnitOfWork {
    /// Connection to pass explicitly to store, audit and matrix functions.
    pub fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    pub async fn commit(self) -> Result<(), ServiceError> {
        let elapsed = self.started.elapsed();
        match self.txn.commit().await {
            Ok(()) => {
                counter!("facility_db.transaction.committed", 1);
                histogram!("facility_db.transaction.duration", elapsed);
                debug!(
                    transaction_id = %self.id,
                    operation = self.operation,
                    "Transaction committed successfully in {:?}",
                    elapsed
                );
                Ok(())
            }
            Err(e) => {
                counter!("facility_db.transaction.rolled_back", 1);
                warn!(
                    transaction_id = %self.id,
                    operation = self.operation,
                    error = %e,
                    "Transaction commit failed after {:?}",
                    elapsed
                );
                Err(ServiceError::db_error(e))
            }
        }
    }

    /// Explicit rollback, used when an operation fails after the transaction opened.
    pub async fn rollback(self) -> Result<(), ServiceError> {
        counter!("facility_db.transaction.rolled_back", 1);
        debug!(
            transaction_id = %self.id,
            operation = self.operation,
            "Rolling back transaction after {:?}",
            self.started.elapsed()
        );
        self.txn.rollback().await.map_err(ServiceError::db_error)
    }
}

/// Runs database migrations
///
/// # Errors
/// Returns an `AppError` if migrations fail to execute
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(AppError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), AppError> {
    debug!("Checking database connection");
    let start = Instant::now();

    let result = pool.ping().await.map_err(AppError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("facility_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(
                "Database connection check failed after {:?}: {}",
                elapsed, e
            );
            counter!("facility_db.connection_failures", 1);
        }
    }

    result
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), AppError> {
    info!("Closing database connection pool");

    pool.close().await.map_err(AppError::DatabaseError)
}
