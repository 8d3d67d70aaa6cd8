#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use facility_registry::{
    build_router,
    config::AppConfig,
    db,
    entities::{facility_distance_matrix, DistanceEntryModel, FacilityType},
    events::{self, FacilityChangeNotifier, LoggingNotifier},
    models::NewFacilityRequest,
    services::{DistanceMatrixService, FacilityService},
    AppState,
};
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, Statement};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Application state over a fresh, migrated SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _data_dir: Option<TempDir>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory database.
        Self::with_database("sqlite::memory:".to_string(), 1, None).await
    }

    /// SQLite file with a pool of `connections`, so concurrent operations overlap.
    pub async fn file_backed(connections: u32) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("facilities.db").display()
        );
        Self::with_database(url, connections, Some(dir)).await
    }

    async fn with_database(url: String, connections: u32, data_dir: Option<TempDir>) -> Self {
        let mut cfg = AppConfig::new(url, "127.0.0.1".to_string(), 18_080, "test".to_string());
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let notifier: Arc<dyn FacilityChangeNotifier> = Arc::new(LoggingNotifier);
        let event_task = tokio::spawn(events::process_events(event_rx, notifier));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _data_dir: data_dir,
        }
    }

    /// Runs raw SQL against the test database, e.g. to install failure triggers.
    pub async fn execute(&self, sql: &str) {
        let db = self.state.db.as_ref();
        db.execute(Statement::from_string(db.get_database_backend(), sql.to_string()))
            .await
            .expect("execute test SQL");
    }

    pub fn facilities(&self) -> Arc<FacilityService> {
        self.state.services.facilities.clone()
    }

    pub fn distances(&self) -> Arc<DistanceMatrixService> {
        self.state.services.distances.clone()
    }

    /// Adds a facility in Watauga County, NC.
    pub async fn add(&self, name: &str) -> i64 {
        self.facilities()
            .add_facility(facility_request(name))
            .await
            .expect("add facility")
    }

    pub async fn add_many(&self, count: usize) -> Vec<i64> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            ids.push(self.add(&format!("Site {}", i)).await);
        }
        ids
    }

    /// Every matrix row ordered by pair.
    pub async fn matrix(&self) -> Vec<DistanceEntryModel> {
        facility_distance_matrix::Entity::find()
            .order_by_asc(facility_distance_matrix::Column::Facility1Id)
            .order_by_asc(facility_distance_matrix::Column::Facility2Id)
            .all(self.state.db.as_ref())
            .await
            .expect("read matrix")
    }

    /// Marks every pair computed with a distance derived from its ids.
    pub async fn compute_all(&self) {
        let distances = self.distances();
        for entry in self.matrix().await {
            distances
                .record_computed(
                    entry.facility1_id,
                    entry.facility2_id,
                    (entry.facility1_id + entry.facility2_id) as f64,
                    entry.facility1_id * 60,
                )
                .await
                .expect("record computed");
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> axum::response::Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Complete creation request in Watauga County, NC.
pub fn facility_request(name: &str) -> NewFacilityRequest {
    NewFacilityRequest {
        name: Some(name.to_string()),
        street_address: Some("100 King St".to_string()),
        city: Some("Boone".to_string()),
        county: Some("Watauga".to_string()),
        state: Some("NC".to_string()),
        facility_type: Some(FacilityType::DistributionCenter),
        ..Default::default()
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response is JSON")
}
