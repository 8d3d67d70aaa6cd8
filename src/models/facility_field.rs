use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::entities::facility;

/// Text columns editable through the generic, audited update path.
///
/// Flags, inactive reason, facility type and max-supply-load have dedicated setters and are
/// deliberately absent here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacilityField {
    Name,
    StreetAddress,
    City,
    County,
    State,
    Website,
    Facebook,
    Hours,
    ContactName,
    ContactNumber,
    AdditionalContacts,
    ReceivingNotes,
}

impl FacilityField {
    /// Required fields may never be blanked.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::Name | Self::StreetAddress | Self::City | Self::County | Self::State
        )
    }

    /// Location fields feed distance computation; changing one invalidates cached distances.
    pub fn is_location_field(self) -> bool {
        matches!(
            self,
            Self::StreetAddress | Self::City | Self::County | Self::State
        )
    }

    /// County and state are written together as a validated pair.
    pub fn is_county_state(self) -> bool {
        matches!(self, Self::County | Self::State)
    }

    pub fn column(self) -> facility::Column {
        match self {
            Self::Name => facility::Column::Name,
            Self::StreetAddress => facility::Column::StreetAddress,
            Self::City => facility::Column::City,
            Self::County => facility::Column::County,
            Self::State => facility::Column::State,
            Self::Website => facility::Column::Website,
            Self::Facebook => facility::Column::Facebook,
            Self::Hours => facility::Column::Hours,
            Self::ContactName => facility::Column::ContactName,
            Self::ContactNumber => facility::Column::ContactNumber,
            Self::AdditionalContacts => facility::Column::AdditionalContacts,
            Self::ReceivingNotes => facility::Column::ReceivingNotes,
        }
    }

    /// Current value of this field on a loaded row.
    pub fn value_of(self, model: &facility::Model) -> Option<String> {
        match self {
            Self::Name => Some(model.name.clone()),
            Self::StreetAddress => Some(model.street_address.clone()),
            Self::City => Some(model.city.clone()),
            Self::County => Some(model.county.clone()),
            Self::State => Some(model.state.clone()),
            Self::Website => model.website.clone(),
            Self::Facebook => model.facebook.clone(),
            Self::Hours => model.hours.clone(),
            Self::ContactName => model.contact_name.clone(),
            Self::ContactNumber => model.contact_number.clone(),
            Self::AdditionalContacts => model.additional_contacts.clone(),
            Self::ReceivingNotes => model.receiving_notes.clone(),
        }
    }

    pub fn location_fields() -> impl Iterator<Item = FacilityField> {
        Self::iter().filter(|field| field.is_location_field())
    }
}

/// Blank means absent or whitespace only.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn location_fields_are_the_address_columns() {
        let fields: Vec<_> = FacilityField::location_fields().collect();
        assert_eq!(
            fields,
            vec![
                FacilityField::StreetAddress,
                FacilityField::City,
                FacilityField::County,
                FacilityField::State,
            ]
        );
    }

    #[test]
    fn every_location_field_is_required() {
        for field in FacilityField::iter() {
            if field.is_location_field() {
                assert!(field.is_required(), "{field} should be required");
            }
        }
    }

    #[test]
    fn optional_fields_are_not_required() {
        for field in [
            FacilityField::Website,
            FacilityField::Facebook,
            FacilityField::Hours,
            FacilityField::ContactName,
            FacilityField::ContactNumber,
            FacilityField::AdditionalContacts,
            FacilityField::ReceivingNotes,
        ] {
            assert!(!field.is_required());
            assert!(!field.is_location_field());
        }
        assert!(FacilityField::Name.is_required());
        assert!(!FacilityField::Name.is_location_field());
    }

    #[test]
    fn parses_snake_case_names() {
        assert_eq!(
            FacilityField::from_str("street_address").unwrap(),
            FacilityField::StreetAddress
        );
        assert_eq!(FacilityField::ReceivingNotes.to_string(), "receiving_notes");
        assert!(FacilityField::from_str("active").is_err());
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("  \t")));
        assert!(!is_blank(Some(" x ")));
    }
}
