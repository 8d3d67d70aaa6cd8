mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{facility_request, TestApp};
use facility_registry::errors::ServiceError;
use tokio::sync::Barrier;

const POOL_CONNECTIONS: u32 = 4;

/// Starts one `add_facility` per name at the same moment and collects the outcomes in order.
async fn add_all_at_once(app: &TestApp, names: &[&str]) -> Vec<Result<i64, ServiceError>> {
    let barrier = Arc::new(Barrier::new(names.len()));
    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            let facilities = app.facilities();
            let barrier = barrier.clone();
            let request = facility_request(name);
            tokio::spawn(async move {
                barrier.wait().await;
                facilities.add_facility(request).await
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.expect("add task panicked"));
    }
    outcomes
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_with_the_same_name_admit_one() {
    let app = TestApp::file_backed(POOL_CONNECTIONS).await;
    app.add("Anchor").await;

    let outcomes = add_all_at_once(&app, &["Twin Oaks", "TWIN OAKS", " twin oaks "]).await;

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::DuplicateName(_))))
            .count(),
        2
    );
    assert_eq!(app.facilities().count().await.unwrap(), 2);
    assert_eq!(app.matrix().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_pair_with_each_other() {
    let app = TestApp::file_backed(POOL_CONNECTIONS).await;
    app.add_many(2).await;

    let names = ["Ridge", "Valley", "Summit", "Hollow", "Creek", "Gap"];
    let outcomes = add_all_at_once(&app, &names).await;
    assert!(outcomes.iter().all(|r| r.is_ok()), "{outcomes:?}");

    let total = 2 + names.len();
    let rows = app.matrix().await;
    assert_eq!(rows.len(), total * (total - 1) / 2);

    let pairs: HashSet<_> = rows
        .iter()
        .map(|row| (row.facility1_id, row.facility2_id))
        .collect();
    assert_eq!(pairs.len(), rows.len());

    let ids: Vec<i64> = app
        .facilities()
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            assert!(
                pairs.contains(&(*a.min(b), *a.max(b))),
                "missing pair {a}-{b}"
            );
        }
    }
}
