use serde::{Deserialize, Serialize};
use validator::Validate;

use super::facility_field::{is_blank, FacilityField};
use crate::entities::facility::{self, FacilityType};

/// Input for creating a facility.
///
/// Required values are optional at the type level so a missing value can be reported by name
/// instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewFacilityRequest {
    #[validate(length(max = 256))]
    pub name: Option<String>,
    #[validate(length(max = 512))]
    pub street_address: Option<String>,
    #[validate(length(max = 128))]
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub facility_type: Option<FacilityType>,
    pub hours: Option<String>,
    /// Name of a max-supply-load option; the default option applies when absent.
    pub max_supply_load: Option<String>,
    pub receiving_notes: Option<String>,
    #[validate(length(max = 512))]
    pub website: Option<String>,
    pub facebook: Option<String>,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
    pub deployment_id: Option<i64>,
}

impl NewFacilityRequest {
    /// Name of the first required value that is absent or blank, in form order.
    ///
    /// Max-supply-load is not checked here; an absent value falls back to the default option.
    pub fn missing_required_field(&self) -> Option<String> {
        let missing_text = [
            (FacilityField::Name, &self.name),
            (FacilityField::StreetAddress, &self.street_address),
            (FacilityField::City, &self.city),
            (FacilityField::County, &self.county),
            (FacilityField::State, &self.state),
        ]
        .into_iter()
        .find(|(_, value)| is_blank(value.as_deref()))
        .map(|(field, _)| field.to_string());

        missing_text.or_else(|| {
            self.facility_type
                .is_none()
                .then(|| "facility_type".to_string())
        })
    }

    pub fn trimmed(value: &Option<String>) -> String {
        value.as_deref().map(str::trim).unwrap_or_default().to_string()
    }

    /// Optional text trimmed, with blank collapsed to `None`.
    pub fn optional(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Status flags and classification of one facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityStatus {
    pub facility_id: i64,
    pub active: bool,
    pub accepting_donations: bool,
    pub distributing_supplies: bool,
    pub publicly_visible: bool,
    pub inactive_reason: Option<String>,
    pub facility_type: FacilityType,
}

impl From<&facility::Model> for FacilityStatus {
    fn from(model: &facility::Model) -> Self {
        Self {
            facility_id: model.id,
            active: model.active,
            accepting_donations: model.accepting_donations,
            distributing_supplies: model.distributing_supplies,
            publicly_visible: model.publicly_visible,
            inactive_reason: model.inactive_reason.clone(),
            facility_type: model.facility_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> NewFacilityRequest {
        NewFacilityRequest {
            name: Some("Boone Supply Hub".into()),
            street_address: Some("100 King St".into()),
            city: Some("Boone".into()),
            county: Some("Watauga".into()),
            state: Some("NC".into()),
            facility_type: Some(FacilityType::SupplyHub),
            ..Default::default()
        }
    }

    #[test]
    fn complete_request_has_no_missing_fields() {
        assert_eq!(complete().missing_required_field(), None);
    }

    #[test]
    fn reports_first_blank_required_field() {
        let mut request = complete();
        request.city = Some("   ".into());
        request.state = None;
        assert_eq!(request.missing_required_field().as_deref(), Some("city"));
    }

    #[test]
    fn facility_type_is_required() {
        let mut request = complete();
        request.facility_type = None;
        assert_eq!(
            request.missing_required_field().as_deref(),
            Some("facility_type")
        );
    }

    #[test]
    fn optional_collapses_blank_to_none() {
        assert_eq!(NewFacilityRequest::optional(&Some("  ".into())), None);
        assert_eq!(
            NewFacilityRequest::optional(&Some(" www.site.org ".into())),
            Some("www.site.org".to_string())
        );
    }
}
