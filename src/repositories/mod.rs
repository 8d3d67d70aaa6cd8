//! Persistence functions for facilities and their audit trail.
//!
//! Every function takes the connection explicitly so callers can run several of them inside one
//! transaction.

pub mod audit_repository;
pub mod facility_repository;

pub use facility_repository::NewFacility;
