//! Property-based tests for the diagnostic log.

use claw_diagnostics::{DiagnosticLog, FileStorage, LogLevel, LogOptions, LogQuery};
use proptest::prelude::*;
use tempfile::TempDir;

fn level_strategy() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

fn calls_strategy() -> impl Strategy<Value = Vec<(LogLevel, String)>> {
    prop::collection::vec((level_strategy(), "[a-zA-Z0-9 ]{0,24}"), 0..60)
}

fn record_all(log: &DiagnosticLog, calls: &[(LogLevel, String)]) {
    for (level, message) in calls {
        log.log(message.clone(), LogOptions::new().level(*level));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_keeps_most_recent_in_order(
        capacity in 1usize..20,
        calls in calls_strategy(),
    ) {
        let log = DiagnosticLog::new(capacity);
        record_all(&log, &calls);

        let stored: Vec<String> = log
            .get_logs(&LogQuery::new())
            .into_iter()
            .map(|e| e.message)
            .collect();
        let skip = calls.len().saturating_sub(capacity);
        let expected: Vec<String> = calls.iter().skip(skip).map(|(_, m)| m.clone()).collect();

        prop_assert!(log.len() <= capacity);
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn prop_timestamps_non_decreasing_and_ids_unique(calls in calls_strategy()) {
        let log = DiagnosticLog::new(100);
        record_all(&log, &calls);

        let entries = log.get_logs(&LogQuery::new());
        for pair in entries.windows(2) {
            prop_assert!(pair[0].timestamp <= pair[1].timestamp);
        }

        let mut ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), entries.len());
    }

    #[test]
    fn prop_level_filter_is_ordered_subset(
        calls in calls_strategy(),
        level in level_strategy(),
        limit in proptest::option::of(0usize..10),
    ) {
        let log = DiagnosticLog::new(100);
        record_all(&log, &calls);

        let mut query = LogQuery::new().with_level(level);
        if let Some(limit) = limit {
            query = query.with_limit(limit);
        }
        let filtered = log.get_logs(&query);

        let all_matching: Vec<_> = log
            .get_logs(&LogQuery::new())
            .into_iter()
            .filter(|e| e.level == level)
            .collect();
        let skip = limit.map_or(0, |l| all_matching.len().saturating_sub(l));

        prop_assert!(filtered.iter().all(|e| e.level == level));
        prop_assert_eq!(filtered, all_matching[skip..].to_vec());
    }

    #[test]
    fn prop_search_matches_case_insensitively(
        calls in calls_strategy(),
        needle in "[a-z]{1,3}",
    ) {
        let log = DiagnosticLog::new(100);
        record_all(&log, &calls);

        let upper = needle.to_uppercase();
        let found = log.search_logs(&upper);
        let expected: Vec<String> = calls
            .iter()
            .map(|(_, m)| m.clone())
            .filter(|m| m.to_lowercase().contains(&needle) || "unknown".contains(&needle))
            .collect();

        let all_match = found.iter().all(|e| {
            e.message.to_lowercase().contains(&needle)
                || e.error_type.to_lowercase().contains(&needle)
        });
        prop_assert!(all_match);
        prop_assert_eq!(found.len(), expected.len());
    }

    #[test]
    fn prop_file_storage_survives_reload(
        capacity in 1usize..15,
        calls in calls_strategy(),
    ) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("diagnostics.json");

        let before = {
            let log = DiagnosticLog::with_storage(capacity, FileStorage::new(&path));
            record_all(&log, &calls);
            log.get_logs(&LogQuery::new())
        };

        let reopened = DiagnosticLog::with_storage(capacity, FileStorage::new(&path));
        prop_assert_eq!(reopened.get_logs(&LogQuery::new()), before);
    }
}
