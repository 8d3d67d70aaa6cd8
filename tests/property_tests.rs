mod common;

use common::TestApp;
use facility_registry::entities::{
    facility::name_key, facility_distance_matrix::canonical_pair,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn canonical_pair_is_order_independent(a in 1i64..1_000_000, b in 1i64..1_000_000) {
        let (low, high) = canonical_pair(a, b);
        prop_assert!(low <= high);
        prop_assert_eq!(canonical_pair(b, a), (low, high));
        prop_assert_eq!(low.min(high), a.min(b));
        prop_assert_eq!(high.max(low), a.max(b));
    }

    #[test]
    fn name_key_ignores_case_and_padding(
        name in "[A-Za-z][A-Za-z0-9 ]{0,30}",
        pad_left in " {0,3}",
        pad_right in " {0,3}",
    ) {
        let padded = format!("{}{}{}", pad_left, name.to_uppercase(), pad_right);
        prop_assert_eq!(name_key(&padded), name_key(&name));
        prop_assert_eq!(name_key(&name), name_key(&name_key(&name)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn matrix_holds_one_entry_per_unordered_pair(count in 0usize..7) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (rows, summary) = runtime.block_on(async {
            let app = TestApp::new().await;
            app.add_many(count).await;
            let summary = app.distances().count_by_status().await.unwrap();
            (app.matrix().await, summary)
        });

        let expected = (count * count.saturating_sub(1) / 2) as u64;
        prop_assert_eq!(rows.len() as u64, expected);
        prop_assert_eq!(summary.pending, expected);
        prop_assert!(rows.iter().all(|row| row.facility1_id < row.facility2_id));
    }
}
