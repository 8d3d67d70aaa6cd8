use chrono::Utc;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
};
use tracing::debug;

use crate::entities::facility::{
    self, name_key, ActiveModel as FacilityActiveModel, Column, Entity as Facility, FacilityType,
    Model as FacilityModel,
};
use crate::errors::ServiceError;
use crate::models::{FacilityField, FacilityStatus};

/// Fully resolved values for a new facility row.
#[derive(Debug, Clone)]
pub struct NewFacility {
    pub name: String,
    pub facility_type: FacilityType,
    pub street_address: String,
    pub city: String,
    pub county_id: i64,
    pub county: String,
    pub state: String,
    pub website: Option<String>,
    pub facebook: Option<String>,
    pub hours: Option<String>,
    pub max_supply_load_id: i64,
    pub max_supply_load: String,
    pub receiving_notes: Option<String>,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
    pub additional_contacts: Option<String>,
    pub deployment_id: Option<i64>,
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Facility {} not found", id))
}

pub async fn find_by_id<C>(conn: &C, id: i64) -> Result<Option<FacilityModel>, ServiceError>
where
    C: ConnectionTrait,
{
    Facility::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Loads a facility or fails with `NotFound`.
pub async fn get<C>(conn: &C, id: i64) -> Result<FacilityModel, ServiceError>
where
    C: ConnectionTrait,
{
    find_by_id(conn, id).await?.ok_or_else(|| not_found(id))
}

/// Case-insensitive lookup by name.
pub async fn find_by_name<C>(conn: &C, name: &str) -> Result<Option<FacilityModel>, ServiceError>
where
    C: ConnectionTrait,
{
    Facility::find()
        .filter(Column::NameKey.eq(name_key(name)))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Reads a facility row under an exclusive row lock (`SELECT ... FOR UPDATE` where supported).
async fn lock_row<C>(conn: &C, id: i64) -> Result<FacilityModel, ServiceError>
where
    C: ConnectionTrait,
{
    Facility::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| not_found(id))
}

/// Inserts a facility. A name already taken (ignoring case) fails with `DuplicateName`.
pub async fn insert<C>(conn: &C, new: NewFacility) -> Result<FacilityModel, ServiceError>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let name = new.name;
    let active = FacilityActiveModel {
        id: ActiveValue::NotSet,
        name_key: Set(name_key(&name)),
        name: Set(name.clone()),
        facility_type: Set(new.facility_type),
        street_address: Set(new.street_address),
        city: Set(new.city),
        county_id: Set(new.county_id),
        county: Set(new.county),
        state: Set(new.state),
        website: Set(new.website),
        facebook: Set(new.facebook),
        hours: Set(new.hours),
        max_supply_load_id: Set(new.max_supply_load_id),
        max_supply_load: Set(new.max_supply_load),
        receiving_notes: Set(new.receiving_notes),
        contact_name: Set(new.contact_name),
        contact_number: Set(new.contact_number),
        additional_contacts: Set(new.additional_contacts),
        deployment_id: Set(new.deployment_id),
        active: Set(true),
        accepting_donations: Set(true),
        distributing_supplies: Set(true),
        publicly_visible: Set(true),
        inactive_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active
        .insert(conn)
        .await
        .map_err(|e| ServiceError::from_name_write(e, &name))?;
    debug!(facility_id = model.id, name = %model.name, "Inserted facility");
    Ok(model)
}

/// Writes one text field under a row lock and returns the value it replaced.
///
/// Blank values are not rejected here; required-field checks belong to the caller.
pub async fn set_field<C>(
    conn: &C,
    id: i64,
    field: FacilityField,
    value: Option<String>,
) -> Result<Option<String>, ServiceError>
where
    C: ConnectionTrait,
{
    let current = lock_row(conn, id).await?;
    let old = field.value_of(&current);

    let mut update = Facility::update_many()
        .col_expr(field.column(), Expr::value(value.clone()))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id));

    if field == FacilityField::Name {
        let name = value.unwrap_or_default();
        update = update.col_expr(Column::NameKey, Expr::value(name_key(&name)));
        update
            .exec(conn)
            .await
            .map_err(|e| ServiceError::from_name_write(e, &name))?;
    } else {
        update.exec(conn).await.map_err(ServiceError::db_error)?;
    }

    Ok(old)
}

/// Replaces the county/state pair and returns the previous `(county, state)`.
pub async fn set_county<C>(
    conn: &C,
    id: i64,
    county_id: i64,
    county: &str,
    state: &str,
) -> Result<(String, String), ServiceError>
where
    C: ConnectionTrait,
{
    let current = lock_row(conn, id).await?;

    Facility::update_many()
        .col_expr(Column::CountyId, Expr::value(county_id))
        .col_expr(Column::County, Expr::value(county))
        .col_expr(Column::State, Expr::value(state))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok((current.county, current.state))
}

async fn set_column<C>(
    conn: &C,
    id: i64,
    column: Column,
    value: SimpleExpr,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let result = Facility::update_many()
        .col_expr(column, value)
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub async fn set_active<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    active: bool,
) -> Result<(), ServiceError> {
    set_column(conn, id, Column::Active, Expr::value(active)).await
}

pub async fn set_accepting_donations<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    accepting: bool,
) -> Result<(), ServiceError> {
    set_column(conn, id, Column::AcceptingDonations, Expr::value(accepting)).await
}

pub async fn set_distributing_supplies<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    distributing: bool,
) -> Result<(), ServiceError> {
    set_column(
        conn,
        id,
        Column::DistributingSupplies,
        Expr::value(distributing),
    )
    .await
}

pub async fn set_publicly_visible<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    visible: bool,
) -> Result<(), ServiceError> {
    set_column(conn, id, Column::PubliclyVisible, Expr::value(visible)).await
}

pub async fn set_inactive_reason<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    reason: Option<String>,
) -> Result<(), ServiceError> {
    set_column(conn, id, Column::InactiveReason, Expr::value(reason)).await
}

pub async fn set_facility_type<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    facility_type: FacilityType,
) -> Result<(), ServiceError> {
    set_column(conn, id, Column::FacilityType, Expr::value(facility_type)).await
}

/// Points the facility at another max-supply-load option, keeping the denormalized name in step.
pub async fn set_max_supply_load<C>(
    conn: &C,
    id: i64,
    load_id: i64,
    load_name: &str,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let result = Facility::update_many()
        .col_expr(Column::MaxSupplyLoadId, Expr::value(load_id))
        .col_expr(Column::MaxSupplyLoad, Expr::value(load_name))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// All facilities ordered by name.
pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<FacilityModel>, ServiceError> {
    Facility::find()
        .order_by_asc(Column::NameKey)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// One page of facilities ordered by name, with the total count. Pages start at 1.
pub async fn list_page<C>(
    conn: &C,
    page: u64,
    page_size: u64,
) -> Result<(Vec<FacilityModel>, u64), ServiceError>
where
    C: ConnectionTrait,
{
    let paginator = Facility::find()
        .order_by_asc(Column::NameKey)
        .paginate(conn, page_size.max(1));

    let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
    let facilities = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .map_err(ServiceError::db_error)?;

    Ok((facilities, total))
}

pub async fn count<C: ConnectionTrait>(conn: &C) -> Result<u64, ServiceError> {
    Facility::find()
        .count(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Statement serializing facility creation, for backends whose default isolation lets two
/// creators miss each other's rows. SQLite admits a single writer and needs none.
pub fn creation_lock_statement(backend: DbBackend) -> Option<Statement> {
    match backend {
        DbBackend::Postgres => Some(Statement::from_string(
            backend,
            "LOCK TABLE facilities IN SHARE ROW EXCLUSIVE MODE",
        )),
        _ => None,
    }
}

/// Blocks other creators until the surrounding transaction ends.
///
/// Taken before the insert so that [`other_ids`] sees every facility committed ahead of this one.
pub async fn lock_for_creation<C: ConnectionTrait>(conn: &C) -> Result<(), ServiceError> {
    if let Some(statement) = creation_lock_statement(conn.get_database_backend()) {
        conn.execute(statement)
            .await
            .map_err(ServiceError::db_error)?;
        debug!("Acquired facility creation lock");
    }
    Ok(())
}

/// Ids of every facility except `exclude`, ascending.
pub async fn other_ids<C: ConnectionTrait>(conn: &C, exclude: i64) -> Result<Vec<i64>, ServiceError> {
    Facility::find()
        .select_only()
        .column(Column::Id)
        .filter(Column::Id.ne(exclude))
        .order_by_asc(Column::Id)
        .into_tuple::<i64>()
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub async fn fetch_status<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<FacilityStatus, ServiceError> {
    let model = get(conn, id).await?;
    Ok(FacilityStatus::from(&model))
}

pub async fn fetch_name<C: ConnectionTrait>(conn: &C, id: i64) -> Result<String, ServiceError> {
    Facility::find_by_id(id)
        .select_only()
        .column(facility::Column::Name)
        .into_tuple::<String>()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| not_found(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_lock_applies_to_postgres_only() {
        let statement = creation_lock_statement(DbBackend::Postgres).unwrap();
        assert_eq!(
            statement.sql,
            "LOCK TABLE facilities IN SHARE ROW EXCLUSIVE MODE"
        );
        assert!(creation_lock_statement(DbBackend::Sqlite).is_none());
    }
}
