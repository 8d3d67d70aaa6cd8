//! Domain value types shared by services, handlers and the admin CLI.

pub mod facility_field;
pub mod facility_request;

pub use facility_field::FacilityField;
pub use facility_request::{FacilityStatus, NewFacilityRequest};
