pub mod common;
pub mod distance_matrix;
pub mod facilities;
pub mod health;
pub mod reference;

use std::sync::Arc;

use crate::db::DbPool;
use crate::services::{
    DbReferenceResolver, DistanceMatrixService, FacilityService, ReferenceResolver,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub facilities: Arc<FacilityService>,
    pub distances: Arc<DistanceMatrixService>,
    pub references: Arc<dyn ReferenceResolver>,
}

impl AppServices {
    /// Builds the services over the database-backed reference resolver.
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        let references: Arc<dyn ReferenceResolver> =
            Arc::new(DbReferenceResolver::new(db_pool.clone()));
        Self::with_references(db_pool, references)
    }

    pub fn with_references(db_pool: Arc<DbPool>, references: Arc<dyn ReferenceResolver>) -> Self {
        Self {
            facilities: Arc::new(FacilityService::new(db_pool.clone(), references.clone())),
            distances: Arc::new(DistanceMatrixService::new(db_pool)),
            references,
        }
    }
}
