use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db::{begin_unit, DbPool, UnitOfWork};
use crate::entities::facility::{FacilityType, Model as FacilityModel};
use crate::entities::AuditEntryModel;
use crate::errors::ServiceError;
use crate::models::facility_field::is_blank;
use crate::models::{FacilityField, FacilityStatus, NewFacilityRequest};
use crate::repositories::{audit_repository, facility_repository, NewFacility};
use crate::services::distance_matrix;
use crate::services::reference::{MaxSupplyOption, ReferenceResolver};

/// Creates facilities and applies field changes, keeping the audit trail and the distance matrix
/// consistent with every committed write.
///
/// Each mutating operation runs in a single transaction; any failure leaves no partial state.
/// Callers publish the matching change event after a successful return.
#[derive(Clone)]
pub struct FacilityService {
    db_pool: Arc<DbPool>,
    references: Arc<dyn ReferenceResolver>,
}

/// Splits a `"County,ST"` composite into its trimmed halves.
fn split_county_state(value: &str) -> Option<(&str, &str)> {
    let (county, state) = value.split_once(',')?;
    let (county, state) = (county.trim(), state.trim());
    if county.is_empty() || state.is_empty() {
        return None;
    }
    Some((county, state))
}

fn composite(county: &str, state: &str) -> String {
    format!("{},{}", county, state)
}

/// Commits on success, rolls back on failure and hands back the operation's result.
async fn finish<T>(unit: UnitOfWork, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = unit.rollback().await {
                warn!("Rollback after failed operation also failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

impl FacilityService {
    pub fn new(db_pool: Arc<DbPool>, references: Arc<dyn ReferenceResolver>) -> Self {
        Self {
            db_pool,
            references,
        }
    }

    /// Creates a facility and a pending distance entry against every existing facility.
    ///
    /// Returns the new facility id.
    #[instrument(skip(self, request), fields(name = ?request.name), err)]
    pub async fn add_facility(&self, request: NewFacilityRequest) -> Result<i64, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        if let Some(field) = request.missing_required_field() {
            return Err(ServiceError::MissingRequiredField(field));
        }
        let facility_type = request
            .facility_type
            .ok_or_else(|| ServiceError::MissingRequiredField("facility_type".to_string()))?;

        let county = NewFacilityRequest::trimmed(&request.county);
        let state = NewFacilityRequest::trimmed(&request.state);
        let county_ref = self
            .references
            .resolve_county_state(&county, &state)
            .await?
            .ok_or_else(|| ServiceError::invalid_county(&county, &state))?;

        let load = self
            .resolve_load_or_default(NewFacilityRequest::optional(&request.max_supply_load))
            .await?;

        let new = NewFacility {
            name: NewFacilityRequest::trimmed(&request.name),
            facility_type,
            street_address: NewFacilityRequest::trimmed(&request.street_address),
            city: NewFacilityRequest::trimmed(&request.city),
            county_id: county_ref.id,
            county: county_ref.name,
            state: county_ref.state,
            website: NewFacilityRequest::optional(&request.website),
            facebook: NewFacilityRequest::optional(&request.facebook),
            hours: NewFacilityRequest::optional(&request.hours),
            max_supply_load_id: load.id,
            max_supply_load: load.name,
            receiving_notes: NewFacilityRequest::optional(&request.receiving_notes),
            contact_name: NewFacilityRequest::optional(&request.contact_name),
            contact_number: NewFacilityRequest::optional(&request.contact_number),
            additional_contacts: None,
            deployment_id: request.deployment_id,
        };

        let unit = begin_unit(&self.db_pool, "add_facility").await?;
        let result = async {
            facility_repository::lock_for_creation(unit.conn()).await?;
            let facility = facility_repository::insert(unit.conn(), new).await?;
            let pending = distance_matrix::create_pending_for(unit.conn(), facility.id).await?;
            Ok::<_, ServiceError>((facility, pending))
        }
        .await;
        let (facility, pending) = finish(unit, result).await?;

        counter!("facility.created", 1);
        info!(
            facility_id = facility.id,
            name = %facility.name,
            pending_distances = pending,
            "Facility created"
        );
        Ok(facility.id)
    }

    async fn resolve_load_or_default(
        &self,
        name: Option<String>,
    ) -> Result<MaxSupplyOption, ServiceError> {
        match name {
            Some(name) => self
                .references
                .resolve_max_supply_load(&name)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidReference(format!(
                        "max supply load '{}' is not a recognized option",
                        name
                    ))
                }),
            None => self.references.default_max_supply_load().await?.ok_or_else(|| {
                ServiceError::InvalidReference("no default max supply load is configured".into())
            }),
        }
    }

    /// Writes one text field, records an audit entry and invalidates cached distances when the
    /// field affects location. Returns the prior value.
    ///
    /// County and State take a `"County,ST"` composite and are applied as a validated pair.
    #[instrument(skip(self, new_value), err)]
    pub async fn update_field(
        &self,
        facility_id: i64,
        field: FacilityField,
        new_value: &str,
    ) -> Result<Option<String>, ServiceError> {
        if field.is_required() && is_blank(Some(new_value)) {
            return Err(ServiceError::RequiredFieldViolation(field));
        }

        if field.is_county_state() {
            let (county, state) = split_county_state(new_value).ok_or_else(|| {
                ServiceError::InvalidInput(format!(
                    "{} expects a 'County,ST' value, got '{}'",
                    field, new_value
                ))
            })?;
            let old = self.change_county(facility_id, county, state, field).await?;
            return Ok(Some(old));
        }

        let value = Some(new_value.trim().to_string()).filter(|v| !v.is_empty());

        let unit = begin_unit(&self.db_pool, "update_field").await?;
        let result = async {
            let old =
                facility_repository::set_field(unit.conn(), facility_id, field, value.clone())
                    .await?;
            audit_repository::record(
                unit.conn(),
                facility_id,
                &field.to_string(),
                old.clone(),
                value.clone(),
            )
            .await?;
            let invalidated = if field.is_location_field() {
                distance_matrix::invalidate_facility(unit.conn(), facility_id).await?
            } else {
                0
            };
            Ok::<_, ServiceError>((old, invalidated))
        }
        .await;
        let (old, invalidated) = finish(unit, result).await?;

        counter!("facility.field_updates", 1, "field" => field.to_string());
        info!(
            facility_id,
            field = %field,
            invalidated_distances = invalidated,
            "Facility field updated"
        );
        Ok(old)
    }

    /// Moves a facility to another county/state pair. Returns the previous pair as
    /// `"County,ST"`.
    #[instrument(skip(self), err)]
    pub async fn update_county(
        &self,
        facility_id: i64,
        county: &str,
        state: &str,
    ) -> Result<String, ServiceError> {
        self.change_county(facility_id, county, state, FacilityField::County)
            .await
    }

    async fn change_county(
        &self,
        facility_id: i64,
        county: &str,
        state: &str,
        audit_field: FacilityField,
    ) -> Result<String, ServiceError> {
        if is_blank(Some(county)) {
            return Err(ServiceError::RequiredFieldViolation(FacilityField::County));
        }
        if is_blank(Some(state)) {
            return Err(ServiceError::RequiredFieldViolation(FacilityField::State));
        }

        let county_ref = self
            .references
            .resolve_county_state(county.trim(), state.trim())
            .await?
            .ok_or_else(|| ServiceError::invalid_county(county.trim(), state.trim()))?;

        let unit = begin_unit(&self.db_pool, "update_county").await?;
        let result = async {
            let (old_county, old_state) = facility_repository::set_county(
                unit.conn(),
                facility_id,
                county_ref.id,
                &county_ref.name,
                &county_ref.state,
            )
            .await?;
            let old = composite(&old_county, &old_state);
            audit_repository::record(
                unit.conn(),
                facility_id,
                &audit_field.to_string(),
                Some(old.clone()),
                Some(composite(&county_ref.name, &county_ref.state)),
            )
            .await?;
            let invalidated = distance_matrix::invalidate_facility(unit.conn(), facility_id).await?;
            Ok::<_, ServiceError>((old, invalidated))
        }
        .await;
        let (old, invalidated) = finish(unit, result).await?;

        counter!("facility.field_updates", 1, "field" => audit_field.to_string());
        info!(
            facility_id,
            previous = %old,
            county = %county_ref.name,
            state = %county_ref.state,
            invalidated_distances = invalidated,
            "Facility county updated"
        );
        Ok(old)
    }

    pub async fn set_active(&self, facility_id: i64, active: bool) -> Result<(), ServiceError> {
        facility_repository::set_active(self.db_pool.as_ref(), facility_id, active).await?;
        info!(facility_id, active, "Facility active flag set");
        Ok(())
    }

    pub async fn set_accepting_donations(
        &self,
        facility_id: i64,
        accepting: bool,
    ) -> Result<(), ServiceError> {
        facility_repository::set_accepting_donations(self.db_pool.as_ref(), facility_id, accepting)
            .await?;
        info!(facility_id, accepting, "Facility accepting-donations flag set");
        Ok(())
    }

    pub async fn set_distributing_supplies(
        &self,
        facility_id: i64,
        distributing: bool,
    ) -> Result<(), ServiceError> {
        facility_repository::set_distributing_supplies(
            self.db_pool.as_ref(),
            facility_id,
            distributing,
        )
        .await?;
        info!(
            facility_id,
            distributing, "Facility distributing-supplies flag set"
        );
        Ok(())
    }

    pub async fn set_publicly_visible(
        &self,
        facility_id: i64,
        visible: bool,
    ) -> Result<(), ServiceError> {
        facility_repository::set_publicly_visible(self.db_pool.as_ref(), facility_id, visible)
            .await?;
        info!(facility_id, visible, "Facility publicly-visible flag set");
        Ok(())
    }

    /// Blank clears the reason.
    pub async fn set_inactive_reason(
        &self,
        facility_id: i64,
        reason: Option<String>,
    ) -> Result<(), ServiceError> {
        let reason = NewFacilityRequest::optional(&reason);
        facility_repository::set_inactive_reason(self.db_pool.as_ref(), facility_id, reason)
            .await?;
        info!(facility_id, "Facility inactive reason set");
        Ok(())
    }

    pub async fn set_facility_type(
        &self,
        facility_id: i64,
        facility_type: FacilityType,
    ) -> Result<(), ServiceError> {
        facility_repository::set_facility_type(self.db_pool.as_ref(), facility_id, facility_type)
            .await?;
        info!(facility_id, facility_type = %facility_type, "Facility type set");
        Ok(())
    }

    pub async fn set_max_supply_load(
        &self,
        facility_id: i64,
        load_name: &str,
    ) -> Result<(), ServiceError> {
        let load = self
            .resolve_load_or_default(Some(load_name.trim().to_string()))
            .await?;
        facility_repository::set_max_supply_load(
            self.db_pool.as_ref(),
            facility_id,
            load.id,
            &load.name,
        )
        .await?;
        info!(facility_id, max_supply_load = %load.name, "Facility max supply load set");
        Ok(())
    }

    pub async fn fetch_status(&self, facility_id: i64) -> Result<FacilityStatus, ServiceError> {
        facility_repository::fetch_status(self.db_pool.as_ref(), facility_id).await
    }

    pub async fn fetch_name(&self, facility_id: i64) -> Result<String, ServiceError> {
        facility_repository::fetch_name(self.db_pool.as_ref(), facility_id).await
    }

    pub async fn get(&self, facility_id: i64) -> Result<FacilityModel, ServiceError> {
        facility_repository::get(self.db_pool.as_ref(), facility_id).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<FacilityModel>, ServiceError> {
        facility_repository::find_by_name(self.db_pool.as_ref(), name).await
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<FacilityModel>, u64), ServiceError> {
        facility_repository::list_page(self.db_pool.as_ref(), page, page_size).await
    }

    pub async fn list_all(&self) -> Result<Vec<FacilityModel>, ServiceError> {
        facility_repository::list(self.db_pool.as_ref()).await
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        facility_repository::count(self.db_pool.as_ref()).await
    }

    /// Audit history of a facility, oldest first.
    pub async fn audit_trail(&self, facility_id: i64) -> Result<Vec<AuditEntryModel>, ServiceError> {
        let db = self.db_pool.as_ref();
        facility_repository::get(db, facility_id).await?;
        audit_repository::list_for_facility(db, facility_id).await
    }
}
