use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Whether a cached distance is usable.
///
/// A row is `Pending` from creation until the distance collaborator fills it in, and goes back to
/// `Pending` whenever either endpoint moves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DistanceStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "computed")]
    Computed,
}

/// One unordered facility pair, stored with `facility1_id < facility2_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facility_distance_matrix")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub facility1_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub facility2_id: i64,
    pub distance_miles: Option<f64>,
    pub drive_time_seconds: Option<i64>,
    pub status: DistanceStatus,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.status == DistanceStatus::Pending
    }

    /// True when the pair touches `facility_id` on either side.
    pub fn touches(&self, facility_id: i64) -> bool {
        self.facility1_id == facility_id || self.facility2_id == facility_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Orders a facility pair the way the matrix stores it.
pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_puts_smaller_id_first() {
        assert_eq!(canonical_pair(7, 3), (3, 7));
        assert_eq!(canonical_pair(3, 7), (3, 7));
    }

    #[test]
    fn status_displays_in_snake_case() {
        assert_eq!(DistanceStatus::Pending.to_string(), "pending");
        assert_eq!(DistanceStatus::Computed.to_string(), "computed");
    }
}
