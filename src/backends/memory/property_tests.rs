//! Property-Based Tests for the Memory Backend
//!
//! Uses proptest to check the store contract over arbitrary keys and
//! operation sequences.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use proptest::prelude::*;

use super::MemoryStore;
use crate::models::{DeleteOptions, ListOptions, Options, ReadOptions, Record, WriteOptions};
use crate::store::Store;

// == Strategies ==
/// Generates keys free of characters with special meaning elsewhere
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Generates a sequence of store operations for testing
#[derive(Debug, Clone)]
enum StoreOp {
    Write { key: String, value: Vec<u8> },
    Delete { key: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        3 => (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| StoreOp::Write { key, value }),
        1 => valid_key_strategy().prop_map(|key| StoreOp::Delete { key }),
    ]
}

fn new_store() -> MemoryStore {
    MemoryStore::new(Options::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Any sequence of writes and deletes leaves the store agreeing with a
    // plain map: same keys listed, latest value read back.
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(store_op_strategy(), 1..40)) {
        tokio_test::block_on(async {
            let store = new_store();
            let mut model: BTreeMap<String, Vec<u8>> = BTreeMap::new();

            for op in ops {
                match op {
                    StoreOp::Write { key, value } => {
                        store.write(&Record::new(key.clone(), value.clone()), WriteOptions::new()).await.unwrap();
                        model.insert(key, value);
                    }
                    StoreOp::Delete { key } => {
                        store.delete(&key, DeleteOptions::new()).await.unwrap();
                        model.remove(&key);
                    }
                }
            }

            let listed: HashSet<String> = store.list(ListOptions::new()).await.unwrap().into_iter().collect();
            let expected: HashSet<String> = model.keys().cloned().collect();
            prop_assert_eq!(listed, expected);

            for (key, value) in &model {
                let records = store.read(key, ReadOptions::new()).await.unwrap();
                prop_assert_eq!(records.len(), 1);
                prop_assert_eq!(&records[0].value, value);
            }
            Ok(())
        })?;
    }

    // Listing with prefix and suffix returns exactly the keys matching
    // either one, without duplicates.
    #[test]
    fn prop_affix_list_is_union(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..30),
        prefix in "[a-c]{1,2}",
        suffix in "[0-2]{1,2}"
    ) {
        tokio_test::block_on(async {
            let store = new_store();
            for key in &keys {
                store.write(&Record::new(key.clone(), "v"), WriteOptions::new()).await.unwrap();
            }

            let listed = store
                .list(ListOptions::new().with_prefix(prefix.clone()).with_suffix(suffix.clone()))
                .await
                .unwrap();
            let unique: HashSet<&String> = listed.iter().collect();
            prop_assert_eq!(unique.len(), listed.len(), "List returned duplicates");

            let expected: HashSet<&String> = keys
                .iter()
                .filter(|k| k.starts_with(prefix.as_str()) || k.ends_with(suffix.as_str()))
                .collect();
            prop_assert_eq!(unique, expected);
            Ok(())
        })?;
    }

    // Concatenating every page reproduces the unpaginated listing.
    #[test]
    fn prop_pages_cover_listing(
        keys in prop::collection::vec(valid_key_strategy(), 1..30),
        limit in 1usize..7
    ) {
        tokio_test::block_on(async {
            let store = new_store();
            for key in &keys {
                store.write(&Record::new(key.clone(), "v"), WriteOptions::new()).await.unwrap();
            }

            let all = store.list(ListOptions::new()).await.unwrap();
            let mut paged = Vec::new();
            for page in 0.. {
                let keys = store
                    .list(ListOptions::new().with_limit(limit).with_offset(page))
                    .await
                    .unwrap();
                if keys.is_empty() {
                    break;
                }
                prop_assert!(keys.len() <= limit);
                paged.extend(keys);
            }
            prop_assert_eq!(paged, all);
            Ok(())
        })?;
    }

    // Identical keys in different tables never see each other.
    #[test]
    fn prop_namespace_isolation(key in valid_key_strategy(), value in valid_value_strategy()) {
        tokio_test::block_on(async {
            let store = new_store();
            store
                .write(&Record::new(key.clone(), value), WriteOptions::new().with_database("store", "t1"))
                .await
                .unwrap();

            let read = store.read(&key, ReadOptions::new().with_database("store", "t2")).await;
            prop_assert!(read.is_err());
            let listed = store.list(ListOptions::new().from_namespace("store", "t2")).await.unwrap();
            prop_assert!(listed.is_empty());
            Ok(())
        })?;
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An entry written with a short TTL disappears from reads and lists
    // once the TTL has elapsed.
    #[test]
    fn prop_ttl_expiration_behavior(key in valid_key_strategy(), value in valid_value_strategy()) {
        tokio_test::block_on(async {
            let store = new_store();
            let record = Record::new(key.clone(), value.clone()).with_ttl(Duration::from_millis(20));
            store.write(&record, WriteOptions::new()).await.unwrap();

            let before = store.read(&key, ReadOptions::new()).await.unwrap();
            prop_assert_eq!(&before[0].value, &value);

            tokio::time::sleep(Duration::from_millis(40)).await;

            prop_assert!(store.read(&key, ReadOptions::new()).await.is_err());
            prop_assert!(store.list(ListOptions::new()).await.unwrap().is_empty());
            Ok(())
        })?;
    }
}
