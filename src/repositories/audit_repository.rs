use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use crate::entities::facility_audit_trail::{
    ActiveModel as AuditActiveModel, Column, Entity as AuditTrail, Model as AuditEntryModel,
};
use crate::errors::ServiceError;

/// Appends one audit entry. Entries are never updated or removed.
pub async fn record<C>(
    conn: &C,
    facility_id: i64,
    field_name: &str,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Result<AuditEntryModel, ServiceError>
where
    C: ConnectionTrait,
{
    let entry = AuditActiveModel {
        id: ActiveValue::NotSet,
        facility_id: Set(facility_id),
        field_name: Set(field_name.to_string()),
        old_value: Set(old_value),
        new_value: Set(new_value),
        date_modified: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    debug!(
        facility_id,
        field = field_name,
        audit_id = entry.id,
        "Recorded facility audit entry"
    );
    Ok(entry)
}

/// Audit history of one facility, oldest first.
pub async fn list_for_facility<C>(
    conn: &C,
    facility_id: i64,
) -> Result<Vec<AuditEntryModel>, ServiceError>
where
    C: ConnectionTrait,
{
    AuditTrail::find()
        .filter(Column::FacilityId.eq(facility_id))
        .order_by_asc(Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}
