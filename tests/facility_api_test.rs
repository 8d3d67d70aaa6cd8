mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::{json, Value};

fn create_body(name: &str) -> Value {
    json!({
        "name": name,
        "street_address": "12 Main St",
        "city": "West Jefferson",
        "county": "Ashe",
        "state": "NC",
        "facility_type": "Supply Hub",
        "hours": "8-4"
    })
}

async fn create(app: &TestApp, name: &str) -> i64 {
    let response = app
        .request(Method::POST, "/api/v1/facilities", Some(create_body(name)))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");
}

#[tokio::test]
async fn create_returns_the_stored_facility() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, "/api/v1/facilities", Some(create_body("Ashe Hub")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["name"], "Ashe Hub");
    assert_eq!(body["county"], "Ashe");
    assert_eq!(body["max_supply_load"], "Car");
    assert_eq!(body["facility_type"], "Supply Hub");
}

#[tokio::test]
async fn create_reports_missing_and_conflicting_input() {
    let app = TestApp::new().await;
    create(&app, "Ashe Hub").await;

    let duplicate = app
        .request(Method::POST, "/api/v1/facilities", Some(create_body("ASHE HUB")))
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(duplicate).await["code"], "duplicate_name");

    let mut missing = create_body("No City");
    missing["city"] = json!("");
    let response = app
        .request(Method::POST, "/api/v1/facilities", Some(missing))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "missing_required_field");

    let mut bad_county = create_body("Wrong State");
    bad_county["state"] = json!("TN");
    let response = app
        .request(Method::POST, "/api/v1/facilities", Some(bad_county))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "invalid_reference");
}

#[tokio::test]
async fn field_update_returns_previous_value_and_audits() {
    let app = TestApp::new().await;
    let id = create(&app, "Field Test").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/facilities/{}/fields/hours", id),
            Some(json!({ "value": "24/7" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["previous_value"], "8-4");
    assert_eq!(body["field"], "hours");

    let audit = app
        .request(Method::GET, &format!("/api/v1/facilities/{}/audit", id), None)
        .await;
    assert_eq!(audit.status(), StatusCode::OK);
    let entries = response_json(audit).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["new_value"], "24/7");
}

#[tokio::test]
async fn blank_required_field_is_a_bad_request() {
    let app = TestApp::new().await;
    let id = create(&app, "Blank Name").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/facilities/{}/fields/name", id),
            Some(json!({ "value": "   " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "required_field_violation");

    let unknown_field = app
        .request(
            Method::PUT,
            &format!("/api/v1/facilities/{}/fields/active", id),
            Some(json!({ "value": "false" })),
        )
        .await;
    assert_eq!(unknown_field.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_facility_is_not_found() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/facilities/999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::PUT,
            "/api/v1/facilities/999/active",
            Some(json!({ "value": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn county_route_moves_the_facility_and_invalidates() {
    let app = TestApp::new().await;
    let first = create(&app, "First").await;
    let second = create(&app, "Second").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/distance-matrix/{}/{}", second, first),
            Some(json!({ "distance_miles": 3.2, "drive_time_seconds": 420 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "computed");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/facilities/{}/county", first),
            Some(json!({ "county": "Johnson", "state": "TN" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["previous"], "Ashe,NC");

    let entry = app
        .request(
            Method::GET,
            &format!("/api/v1/distance-matrix/{}/{}", first, second),
            None,
        )
        .await;
    let entry = response_json(entry).await;
    assert_eq!(entry["status"], "pending");
    assert!(entry["distance_miles"].is_null());
}

#[tokio::test]
async fn flags_report_current_status() {
    let app = TestApp::new().await;
    let id = create(&app, "Flags").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/facilities/{}/accepting-donations", id),
            Some(json!({ "value": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = response_json(response).await;
    assert_eq!(status["accepting_donations"], false);
    assert_eq!(status["active"], true);
}

#[tokio::test]
async fn pending_list_and_summary() {
    let app = TestApp::new().await;
    for name in ["P1", "P2", "P3"] {
        create(&app, name).await;
    }

    let response = app
        .request(Method::GET, "/api/v1/distance-matrix/pending?limit=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 2);

    let summary = app
        .request(Method::GET, "/api/v1/distance-matrix/summary", None)
        .await;
    let summary = response_json(summary).await;
    assert_eq!(summary["pending"], 3);
    assert_eq!(summary["computed"], 0);
}

#[tokio::test]
async fn list_is_paginated() {
    let app = TestApp::new().await;
    for name in ["One", "Two", "Three"] {
        create(&app, name).await;
    }

    let response = app
        .request(Method::GET, "/api/v1/facilities?page=1&per_page=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn reference_lists() {
    let app = TestApp::new().await;

    let loads = app
        .request(Method::GET, "/api/v1/reference/max-supply-loads", None)
        .await;
    let loads = response_json(loads).await;
    assert_eq!(loads[0]["name"], "Car");

    let counties = app
        .request(Method::GET, "/api/v1/reference/counties?states=VA", None)
        .await;
    assert_eq!(counties.status(), StatusCode::OK);
    let counties = response_json(counties).await;
    assert!(counties
        .as_array()
        .unwrap()
        .iter()
        .all(|county| county["state"] == "VA"));
    assert!(counties
        .as_array()
        .unwrap()
        .iter()
        .any(|county| county["name"] == "Halifax"));
}
