mod common;

use assert_matches::assert_matches;
use common::{facility_request, TestApp};
use facility_registry::{
    entities::DistanceStatus, errors::ServiceError, models::FacilityField,
};

const FAIL_AUDIT_INSERT: &str = "CREATE TRIGGER fail_audit_insert BEFORE INSERT ON facility_audit_trail \
     BEGIN SELECT RAISE(ABORT, 'audit store unavailable'); END";

const FAIL_MATRIX_UPDATE: &str = "CREATE TRIGGER fail_matrix_update BEFORE UPDATE ON facility_distance_matrix \
     BEGIN SELECT RAISE(ABORT, 'matrix store unavailable'); END";

const FAIL_MATRIX_INSERT: &str = "CREATE TRIGGER fail_matrix_insert BEFORE INSERT ON facility_distance_matrix \
     BEGIN SELECT RAISE(ABORT, 'matrix store unavailable'); END";

/// Three facilities with every distance computed.
async fn computed_app() -> (TestApp, Vec<i64>) {
    let app = TestApp::new().await;
    let ids = app.add_many(3).await;
    app.compute_all().await;
    (app, ids)
}

async fn assert_matrix_computed(app: &TestApp) {
    let rows = app.matrix().await;
    assert_eq!(rows.len(), 3);
    assert!(rows
        .iter()
        .all(|row| row.status == DistanceStatus::Computed && row.distance_miles.is_some()));
}

#[tokio::test]
async fn failed_audit_write_undoes_the_field_write() {
    let (app, ids) = computed_app().await;
    app.execute(FAIL_AUDIT_INSERT).await;

    let result = app
        .facilities()
        .update_field(ids[0], FacilityField::City, "Blowing Rock")
        .await;
    assert_matches!(result, Err(ServiceError::DatabaseError(_)));

    assert_eq!(app.facilities().get(ids[0]).await.unwrap().city, "Boone");
    assert_matrix_computed(&app).await;
}

#[tokio::test]
async fn failed_matrix_invalidation_undoes_field_and_audit() {
    let (app, ids) = computed_app().await;
    app.execute(FAIL_MATRIX_UPDATE).await;

    let result = app
        .facilities()
        .update_field(ids[1], FacilityField::StreetAddress, "9 Depot St")
        .await;
    assert_matches!(result, Err(ServiceError::DatabaseError(_)));

    let facility = app.facilities().get(ids[1]).await.unwrap();
    assert_eq!(facility.street_address, "100 King St");
    assert!(app.facilities().audit_trail(ids[1]).await.unwrap().is_empty());
    assert_matrix_computed(&app).await;
}

#[tokio::test]
async fn failed_county_audit_keeps_the_old_county() {
    let (app, ids) = computed_app().await;
    app.execute(FAIL_AUDIT_INSERT).await;

    let result = app.facilities().update_county(ids[2], "Avery", "NC").await;
    assert_matches!(result, Err(ServiceError::DatabaseError(_)));

    let facility = app.facilities().get(ids[2]).await.unwrap();
    assert_eq!((facility.county.as_str(), facility.state.as_str()), ("Watauga", "NC"));
    assert_matrix_computed(&app).await;
}

#[tokio::test]
async fn failed_pairing_undoes_the_new_facility() {
    let app = TestApp::new().await;
    app.add_many(2).await;
    app.execute(FAIL_MATRIX_INSERT).await;

    let result = app
        .facilities()
        .add_facility(facility_request("Stranded"))
        .await;
    assert_matches!(result, Err(ServiceError::DatabaseError(_)));

    assert_eq!(app.facilities().count().await.unwrap(), 2);
    assert!(app
        .facilities()
        .find_by_name("Stranded")
        .await
        .unwrap()
        .is_none());
    assert_eq!(app.matrix().await.len(), 1);
}
