use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of site a facility operates as.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum FacilityType {
    #[sea_orm(string_value = "Distribution Center")]
    #[serde(rename = "Distribution Center")]
    #[strum(to_string = "Distribution Center", serialize = "distribution_center")]
    DistributionCenter,
    #[sea_orm(string_value = "Supply Hub")]
    #[serde(rename = "Supply Hub")]
    #[strum(to_string = "Supply Hub", serialize = "supply_hub")]
    SupplyHub,
}

/// A physical aid/distribution site.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facilities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// Trimmed, lowercased name carrying the unique index.
    #[serde(skip)]
    #[sea_orm(unique)]
    pub name_key: String,
    pub facility_type: FacilityType,
    pub street_address: String,
    pub city: String,
    pub county_id: i64,
    pub county: String,
    pub state: String,
    pub website: Option<String>,
    pub facebook: Option<String>,
    pub hours: Option<String>,
    pub max_supply_load_id: i64,
    pub max_supply_load: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub receiving_notes: Option<String>,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub additional_contacts: Option<String>,
    pub deployment_id: Option<i64>,
    pub active: bool,
    pub accepting_donations: bool,
    pub distributing_supplies: bool,
    pub publicly_visible: bool,
    pub inactive_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::county::Entity",
        from = "Column::CountyId",
        to = "super::county::Column::Id"
    )]
    County,
    #[sea_orm(
        belongs_to = "super::max_supply_load::Entity",
        from = "Column::MaxSupplyLoadId",
        to = "super::max_supply_load::Column::Id"
    )]
    MaxSupplyLoad,
    #[sea_orm(has_many = "super::facility_audit_trail::Entity")]
    AuditTrail,
}

impl Related<super::county::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::County.def()
    }
}

impl Related<super::max_supply_load::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaxSupplyLoad.def()
    }
}

impl Related<super::facility_audit_trail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuditTrail.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Normalized form of a facility name used for case-insensitive uniqueness.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
