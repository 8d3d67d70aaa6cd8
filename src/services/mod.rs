// Facility mutation coordinator
pub mod facilities;

// Derived pairwise distance cache
pub mod distance_matrix;

// Reference-table lookups (counties, max supply loads)
pub mod reference;

pub use distance_matrix::{DistanceMatrixService, MatrixSummary};
pub use facilities::FacilityService;
pub use reference::{DbReferenceResolver, ReferenceResolver};
