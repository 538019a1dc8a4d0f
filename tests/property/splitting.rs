//! Splitting a multi-object response: every segment is persisted exactly once.

use deckwright::generation::split_and_persist;
use deckwright::store::{MemoryFallbackSink, MemoryRecordStore};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn record_strategy() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..4)
}

fn malformed_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,10}( [a-z]{1,10}){0,3}"
}

/// N well-formed objects give N records, each equal to its source segment.
#[test]
fn test_well_formed_segments_round_trip() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(record_strategy(), 1..8), 1u32..10),
            |(objects, start)| {
                let segments: Vec<String> = objects
                    .iter()
                    .map(|o| serde_json::to_string(o).unwrap())
                    .collect();
                let content = segments.join("\n---\n");
                let end = start + objects.len() as u32 - 1;

                let records = MemoryRecordStore::new();
                let fallback = MemoryFallbackSink::new();
                let report = split_and_persist(&content, start, end, &records, &fallback).unwrap();

                prop_assert_eq!(report.saved_count, objects.len());
                prop_assert_eq!(report.parsed_count, objects.len());
                prop_assert!(fallback.is_empty());

                for (k, (identifier, value)) in records.entries().into_iter().enumerate() {
                    prop_assert_eq!(identifier, format!("slide{}", start + k as u32));
                    prop_assert_eq!(value, serde_json::to_value(&objects[k]).unwrap());
                }
                Ok(())
            },
        )
        .unwrap();
}

/// N segments with K malformed give N - K records and K fallback writes.
#[test]
fn test_malformed_segments_fall_back() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let segment = prop_oneof![
        record_strategy().prop_map(|o| (true, serde_json::to_string(&o).unwrap())),
        malformed_strategy().prop_map(|s| (false, s)),
    ];

    runner
        .run(&prop::collection::vec(segment, 1..10), |segments| {
            let content = segments
                .iter()
                .map(|(_, text)| text.as_str())
                .collect::<Vec<_>>()
                .join("\n----\n");
            let malformed = segments.iter().filter(|(ok, _)| !ok).count();

            let records = MemoryRecordStore::new();
            let fallback = MemoryFallbackSink::new();
            let report = split_and_persist(&content, 1, segments.len() as u32, &records, &fallback)
                .unwrap();

            prop_assert_eq!(report.saved_count, segments.len());
            prop_assert_eq!(report.fallback_count, malformed);
            prop_assert_eq!(fallback.len(), malformed);
            prop_assert_eq!(records.len(), segments.len() - malformed);

            for (identifier, raw) in fallback.entries() {
                let index: usize = identifier.trim_start_matches("slide").parse().unwrap();
                prop_assert_eq!(&raw, &segments[index - 1].1);
            }
            Ok(())
        })
        .unwrap();
}
