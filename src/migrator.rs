use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240901_000001_create_counties_table::Migration),
            Box::new(m20240901_000002_create_max_supply_loads_table::Migration),
            Box::new(m20240901_000003_create_facilities_table::Migration),
            Box::new(m20240901_000004_create_facility_audit_trail_table::Migration),
            Box::new(m20240901_000005_create_facility_distance_matrix_table::Migration),
        ]
    }
}

mod m20240901_000001_create_counties_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    /// Counties recognized when a facility is created or moved.
    const SEED: &[(&str, &str)] = &[
        ("Alleghany", "NC"),
        ("Ashe", "NC"),
        ("Avery", "NC"),
        ("Buncombe", "NC"),
        ("Burke", "NC"),
        ("Caldwell", "NC"),
        ("Haywood", "NC"),
        ("Henderson", "NC"),
        ("Madison", "NC"),
        ("McDowell", "NC"),
        ("Mitchell", "NC"),
        ("Rutherford", "NC"),
        ("Watauga", "NC"),
        ("Wilkes", "NC"),
        ("Yancey", "NC"),
        ("Carter", "TN"),
        ("Cocke", "TN"),
        ("Johnson", "TN"),
        ("Unicoi", "TN"),
        ("Washington", "TN"),
        ("Carroll", "VA"),
        ("Grayson", "VA"),
        ("Halifax", "VA"),
        ("Smyth", "VA"),
        ("Washington", "VA"),
    ];

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000001_create_counties_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Counties::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Counties::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Counties::Name).string().not_null())
                        .col(ColumnDef::new(Counties::State).string_len(2).not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_counties_name_state")
                        .table(Counties::Table)
                        .col(Counties::Name)
                        .col(Counties::State)
                        .unique()
                        .to_owned(),
                )
                .await?;

            let mut insert = Query::insert();
            insert
                .into_table(Counties::Table)
                .columns([Counties::Name, Counties::State]);
            for (name, state) in SEED {
                insert.values_panic([(*name).into(), (*state).into()]);
            }
            manager.exec_stmt(insert).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Counties::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Counties {
        Table,
        Id,
        Name,
        State,
    }
}

mod m20240901_000002_create_max_supply_loads_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000002_create_max_supply_loads_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaxSupplyLoads::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaxSupplyLoads::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MaxSupplyLoads::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(MaxSupplyLoads::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MaxSupplyLoads::DefaultSelection)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            let insert = Query::insert()
                .into_table(MaxSupplyLoads::Table)
                .columns([
                    MaxSupplyLoads::Name,
                    MaxSupplyLoads::SortOrder,
                    MaxSupplyLoads::DefaultSelection,
                ])
                .values_panic(["Car".into(), 1.into(), true.into()])
                .values_panic(["Pickup Truck".into(), 2.into(), false.into()])
                .values_panic(["Box Truck".into(), 3.into(), false.into()])
                .values_panic(["Semi Truck".into(), 4.into(), false.into()])
                .to_owned();
            manager.exec_stmt(insert).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaxSupplyLoads::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum MaxSupplyLoads {
        Table,
        Id,
        Name,
        SortOrder,
        DefaultSelection,
    }
}

mod m20240901_000003_create_facilities_table {

    use super::m20240901_000001_create_counties_table::Counties;
    use super::m20240901_000002_create_max_supply_loads_table::MaxSupplyLoads;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000003_create_facilities_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Facilities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Facilities::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Facilities::Name).string().not_null())
                        .col(ColumnDef::new(Facilities::NameKey).string().not_null())
                        .col(ColumnDef::new(Facilities::FacilityType).string_len(32).not_null())
                        .col(ColumnDef::new(Facilities::StreetAddress).string().not_null())
                        .col(ColumnDef::new(Facilities::City).string().not_null())
                        .col(ColumnDef::new(Facilities::CountyId).big_integer().not_null())
                        .col(ColumnDef::new(Facilities::County).string().not_null())
                        .col(ColumnDef::new(Facilities::State).string_len(2).not_null())
                        .col(ColumnDef::new(Facilities::Website).string().null())
                        .col(ColumnDef::new(Facilities::Facebook).string().null())
                        .col(ColumnDef::new(Facilities::Hours).string().null())
                        .col(
                            ColumnDef::new(Facilities::MaxSupplyLoadId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Facilities::MaxSupplyLoad).string().not_null())
                        .col(ColumnDef::new(Facilities::ReceivingNotes).text().null())
                        .col(ColumnDef::new(Facilities::ContactName).string().null())
                        .col(ColumnDef::new(Facilities::ContactNumber).string().null())
                        .col(ColumnDef::new(Facilities::AdditionalContacts).text().null())
                        .col(ColumnDef::new(Facilities::DeploymentId).big_integer().null())
                        .col(
                            ColumnDef::new(Facilities::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Facilities::AcceptingDonations)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Facilities::DistributingSupplies)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Facilities::PubliclyVisible)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Facilities::InactiveReason).string().null())
                        .col(
                            ColumnDef::new(Facilities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Facilities::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_facilities_county_id")
                                .from(Facilities::Table, Facilities::CountyId)
                                .to(Counties::Table, Counties::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_facilities_max_supply_load_id")
                                .from(Facilities::Table, Facilities::MaxSupplyLoadId)
                                .to(MaxSupplyLoads::Table, MaxSupplyLoads::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Case-insensitive name uniqueness lives here, not in application checks
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_facilities_name_key")
                        .table(Facilities::Table)
                        .col(Facilities::NameKey)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_facilities_county_id")
                        .table(Facilities::Table)
                        .col(Facilities::CountyId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Facilities::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Facilities {
        Table,
        Id,
        Name,
        NameKey,
        FacilityType,
        StreetAddress,
        City,
        CountyId,
        County,
        State,
        Website,
        Facebook,
        Hours,
        MaxSupplyLoadId,
        MaxSupplyLoad,
        ReceivingNotes,
        ContactName,
        ContactNumber,
        AdditionalContacts,
        DeploymentId,
        Active,
        AcceptingDonations,
        DistributingSupplies,
        PubliclyVisible,
        InactiveReason,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240901_000004_create_facility_audit_trail_table {

    use super::m20240901_000003_create_facilities_table::Facilities;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000004_create_facility_audit_trail_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FacilityAuditTrail::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FacilityAuditTrail::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(FacilityAuditTrail::FacilityId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FacilityAuditTrail::FieldName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FacilityAuditTrail::OldValue).text().null())
                        .col(ColumnDef::new(FacilityAuditTrail::NewValue).text().null())
                        .col(
                            ColumnDef::new(FacilityAuditTrail::DateModified)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_facility_audit_trail_facility_id")
                                .from(FacilityAuditTrail::Table, FacilityAuditTrail::FacilityId)
                                .to(Facilities::Table, Facilities::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_facility_audit_trail_facility_id")
                        .table(FacilityAuditTrail::Table)
                        .col(FacilityAuditTrail::FacilityId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FacilityAuditTrail::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FacilityAuditTrail {
        Table,
        Id,
        FacilityId,
        FieldName,
        OldValue,
        NewValue,
        DateModified,
    }
}

mod m20240901_000005_create_facility_distance_matrix_table {

    use super::m20240901_000003_create_facilities_table::Facilities;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000005_create_facility_distance_matrix_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FacilityDistanceMatrix::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FacilityDistanceMatrix::Facility1Id)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FacilityDistanceMatrix::Facility2Id)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FacilityDistanceMatrix::DistanceMiles).double().null())
                        .col(
                            ColumnDef::new(FacilityDistanceMatrix::DriveTimeSeconds)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FacilityDistanceMatrix::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .primary_key(
                            Index::create()
                                .col(FacilityDistanceMatrix::Facility1Id)
                                .col(FacilityDistanceMatrix::Facility2Id),
                        )
                        // One row per unordered pair
                        .check(
                            Expr::col(FacilityDistanceMatrix::Facility1Id)
                                .lt(Expr::col(FacilityDistanceMatrix::Facility2Id)),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_facility_distance_matrix_facility1_id")
                                .from(
                                    FacilityDistanceMatrix::Table,
                                    FacilityDistanceMatrix::Facility1Id,
                                )
                                .to(Facilities::Table, Facilities::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_facility_distance_matrix_facility2_id")
                                .from(
                                    FacilityDistanceMatrix::Table,
                                    FacilityDistanceMatrix::Facility2Id,
                                )
                                .to(Facilities::Table, Facilities::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_facility_distance_matrix_facility2_id")
                        .table(FacilityDistanceMatrix::Table)
                        .col(FacilityDistanceMatrix::Facility2Id)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_facility_distance_matrix_status")
                        .table(FacilityDistanceMatrix::Table)
                        .col(FacilityDistanceMatrix::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FacilityDistanceMatrix::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FacilityDistanceMatrix {
        Table,
        Facility1Id,
        Facility2Id,
        DistanceMiles,
        DriveTimeSeconds,
        Status,
    }
}

// Database migration CLI runner
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
