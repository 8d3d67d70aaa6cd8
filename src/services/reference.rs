use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::debug;

use crate::db::DbPool;
use crate::entities::county::{self, Entity as County};
use crate::entities::max_supply_load::{self, Entity as MaxSupplyLoad};
use crate::errors::ServiceError;

/// Canonical county row a county/state pair resolved to.
pub type CountyRef = county::Model;

/// Max-supply-load option as stored in the reference table.
pub type MaxSupplyOption = max_supply_load::Model;

/// Lookups against the reference tables facilities point into.
///
/// Matching of display names is case-insensitive and ignores surrounding whitespace; the returned
/// rows carry the canonical spelling.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve_county_state(
        &self,
        county: &str,
        state: &str,
    ) -> Result<Option<CountyRef>, ServiceError>;

    async fn resolve_max_supply_load(
        &self,
        name: &str,
    ) -> Result<Option<MaxSupplyOption>, ServiceError>;

    /// The option preselected for new facilities.
    async fn default_max_supply_load(&self) -> Result<Option<MaxSupplyOption>, ServiceError>;

    async fn list_max_supply_options(&self) -> Result<Vec<MaxSupplyOption>, ServiceError>;

    /// Counties of the given states ordered by state, then name.
    async fn list_counties_by_state(&self, states: &[String])
        -> Result<Vec<CountyRef>, ServiceError>;
}

/// [`ReferenceResolver`] reading the seeded `counties` and `max_supply_loads` tables.
#[derive(Debug, Clone)]
pub struct DbReferenceResolver {
    db_pool: Arc<DbPool>,
}

impl DbReferenceResolver {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }
}

fn normalized(value: &str) -> String {
    value.trim().to_lowercase()
}

#[async_trait]
impl ReferenceResolver for DbReferenceResolver {
    async fn resolve_county_state(
        &self,
        county: &str,
        state: &str,
    ) -> Result<Option<CountyRef>, ServiceError> {
        let found = County::find()
            .filter(Expr::expr(Func::lower(Expr::col(county::Column::Name))).eq(normalized(county)))
            .filter(Expr::expr(Func::lower(Expr::col(county::Column::State))).eq(normalized(state)))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if found.is_none() {
            debug!(county, state, "County/state pair did not resolve");
        }
        Ok(found)
    }

    async fn resolve_max_supply_load(
        &self,
        name: &str,
    ) -> Result<Option<MaxSupplyOption>, ServiceError> {
        MaxSupplyLoad::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(max_supply_load::Column::Name)))
                    .eq(normalized(name)),
            )
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn default_max_supply_load(&self) -> Result<Option<MaxSupplyOption>, ServiceError> {
        MaxSupplyLoad::find()
            .filter(max_supply_load::Column::DefaultSelection.eq(true))
            .order_by_asc(max_supply_load::Column::SortOrder)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn list_max_supply_options(&self) -> Result<Vec<MaxSupplyOption>, ServiceError> {
        MaxSupplyLoad::find()
            .order_by_asc(max_supply_load::Column::SortOrder)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn list_counties_by_state(
        &self,
        states: &[String],
    ) -> Result<Vec<CountyRef>, ServiceError> {
        let states: Vec<String> = states.iter().map(|s| s.trim().to_uppercase()).collect();
        County::find()
            .filter(county::Column::State.is_in(states))
            .order_by_asc(county::Column::State)
            .order_by_asc(county::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}
