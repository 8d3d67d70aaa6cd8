use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::db::DbPool;
use crate::entities::facility_distance_matrix::{
    canonical_pair, ActiveModel as DistanceActiveModel, Column, DistanceStatus,
    Entity as DistanceMatrix, Model as DistanceEntryModel,
};
use crate::errors::ServiceError;
use crate::repositories::facility_repository;

/// Rows per multi-row insert, kept well under backend bind-parameter limits.
const INSERT_CHUNK: usize = 500;

/// Adds a pending entry pairing `facility_id` with every other facility.
///
/// Must run in the same transaction that inserted the facility. Returns the number of entries
/// created, which equals the number of pre-existing facilities.
pub async fn create_pending_for<C>(conn: &C, facility_id: i64) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    let others = facility_repository::other_ids(conn, facility_id).await?;
    if others.is_empty() {
        return Ok(0);
    }

    let mut created = 0;
    for chunk in others.chunks(INSERT_CHUNK) {
        let rows = chunk.iter().map(|&other| {
            let (facility1_id, facility2_id) = canonical_pair(other, facility_id);
            DistanceActiveModel {
                facility1_id: Set(facility1_id),
                facility2_id: Set(facility2_id),
                distance_miles: Set(None),
                drive_time_seconds: Set(None),
                status: Set(DistanceStatus::Pending),
            }
        });
        created += DistanceMatrix::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .map_err(ServiceError::db_error)?;
    }

    debug!(facility_id, created, "Created pending distance entries");
    Ok(created)
}

/// Marks every entry touching `facility_id` pending and clears its cached values.
///
/// Returns the number of entries touched; entries not involving the facility are left alone.
pub async fn invalidate_facility<C>(conn: &C, facility_id: i64) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    let result = DistanceMatrix::update_many()
        .col_expr(Column::Status, Expr::value(DistanceStatus::Pending))
        .col_expr(Column::DistanceMiles, Expr::value(Option::<f64>::None))
        .col_expr(Column::DriveTimeSeconds, Expr::value(Option::<i64>::None))
        .filter(touching(facility_id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    counter!("facility.distance_matrix.invalidated", result.rows_affected);
    debug!(
        facility_id,
        invalidated = result.rows_affected,
        "Invalidated distance entries"
    );
    Ok(result.rows_affected)
}

fn touching(facility_id: i64) -> Condition {
    Condition::any()
        .add(Column::Facility1Id.eq(facility_id))
        .add(Column::Facility2Id.eq(facility_id))
}

/// Entry counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSummary {
    pub pending: u64,
    pub computed: u64,
}

impl MatrixSummary {
    pub fn total(&self) -> u64 {
        self.pending + self.computed
    }
}

/// Rejects measurements no routing service would produce.
fn validate_measurement(
    a: i64,
    b: i64,
    distance_miles: f64,
    drive_time_seconds: i64,
) -> Result<(), ServiceError> {
    if a == b {
        return Err(ServiceError::InvalidInput(format!(
            "a facility has no distance to itself ({})",
            a
        )));
    }
    if !distance_miles.is_finite() || distance_miles < 0.0 {
        return Err(ServiceError::InvalidInput(format!(
            "distance_miles must be a non-negative number, got {}",
            distance_miles
        )));
    }
    if drive_time_seconds < 0 {
        return Err(ServiceError::InvalidInput(format!(
            "drive_time_seconds must be non-negative, got {}",
            drive_time_seconds
        )));
    }
    Ok(())
}

/// Read/write access for the external distance-computation worker.
#[derive(Debug, Clone)]
pub struct DistanceMatrixService {
    db_pool: Arc<DbPool>,
}

impl DistanceMatrixService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Entry for a pair, in either order.
    pub async fn get_entry(
        &self,
        a: i64,
        b: i64,
    ) -> Result<Option<DistanceEntryModel>, ServiceError> {
        DistanceMatrix::find_by_id(canonical_pair(a, b))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Oldest pairs first, so a worker drains the backlog in a stable order.
    pub async fn list_pending(&self, limit: u64) -> Result<Vec<DistanceEntryModel>, ServiceError> {
        DistanceMatrix::find()
            .filter(Column::Status.eq(DistanceStatus::Pending))
            .order_by_asc(Column::Facility1Id)
            .order_by_asc(Column::Facility2Id)
            .limit(limit)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn list_for_facility(
        &self,
        facility_id: i64,
    ) -> Result<Vec<DistanceEntryModel>, ServiceError> {
        DistanceMatrix::find()
            .filter(touching(facility_id))
            .order_by_asc(Column::Facility1Id)
            .order_by_asc(Column::Facility2Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count_by_status(&self) -> Result<MatrixSummary, ServiceError> {
        let db = self.db_pool.as_ref();
        let pending = DistanceMatrix::find()
            .filter(Column::Status.eq(DistanceStatus::Pending))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let computed = DistanceMatrix::find()
            .filter(Column::Status.eq(DistanceStatus::Computed))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(MatrixSummary { pending, computed })
    }

    /// Stores a computed distance for a pair and marks it computed.
    ///
    /// Values are stored as given. A pair with no entry fails `NotFound`.
    #[instrument(skip(self), err)]
    pub async fn record_computed(
        &self,
        a: i64,
        b: i64,
        distance_miles: f64,
        drive_time_seconds: i64,
    ) -> Result<DistanceEntryModel, ServiceError> {
        validate_measurement(a, b, distance_miles, drive_time_seconds)?;
        let (facility1_id, facility2_id) = canonical_pair(a, b);

        let result = DistanceMatrix::update_many()
            .col_expr(Column::DistanceMiles, Expr::value(distance_miles))
            .col_expr(Column::DriveTimeSeconds, Expr::value(drive_time_seconds))
            .col_expr(Column::Status, Expr::value(DistanceStatus::Computed))
            .filter(Column::Facility1Id.eq(facility1_id))
            .filter(Column::Facility2Id.eq(facility2_id))
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "No distance entry for facilities {} and {}",
                facility1_id, facility2_id
            )));
        }

        counter!("facility.distance_matrix.computed", 1);
        info!(
            facility1_id,
            facility2_id, distance_miles, drive_time_seconds, "Recorded computed distance"
        );

        self.get_entry(facility1_id, facility2_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "distance entry {}-{} vanished after update",
                    facility1_id, facility2_id
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn measurement_checks() {
        assert!(validate_measurement(1, 2, 12.5, 900).is_ok());
        assert!(validate_measurement(1, 2, 0.0, 0).is_ok());
        assert_matches!(
            validate_measurement(3, 3, 1.0, 60),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            validate_measurement(1, 2, -1.0, 60),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            validate_measurement(1, 2, f64::NAN, 60),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            validate_measurement(1, 2, 4.0, -5),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn summary_total() {
        let summary = MatrixSummary {
            pending: 2,
            computed: 1,
        };
        assert_eq!(summary.total(), 3);
    }
}
