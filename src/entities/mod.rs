//! SeaORM entities backing the facility directory.

pub mod county;
pub mod facility;
pub mod facility_audit_trail;
pub mod facility_distance_matrix;
pub mod max_supply_load;

pub use facility::{FacilityType, Model as FacilityModel};
pub use facility_audit_trail::Model as AuditEntryModel;
pub use facility_distance_matrix::{DistanceStatus, Model as DistanceEntryModel};
