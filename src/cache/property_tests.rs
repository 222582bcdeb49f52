//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check tier bounds, eviction order and namespace isolation
//! over generated operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::cache::{
    derive_key, CacheEntry, CacheManager, EvictionPolicy, MemoryTier, PersistentTier, SetOptions,
};
use crate::config::Config;
use crate::storage::MemoryStorage;

// == Test Configuration ==
const TEST_TTL_MS: u64 = 300_000;

// == Strategies ==
/// Generates namespaces (no ':' so prefixes stay unambiguous)
fn namespace_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

/// Generates parameter values
fn params_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,16}"
}

fn payload_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,64}".prop_map(|s| json!(s)),
        (any::<bool>(), any::<u32>()).prop_map(|(b, n)| json!({"flag": b, "n": n})),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { namespace: String, params: String, data: Value },
    Get { namespace: String, params: String },
    Invalidate { namespace: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // A small namespace pool makes invalidations hit existing entries
    let namespace = prop::sample::select(vec!["ventures", "kpis", "worksheets"]).prop_map(str::to_string);
    prop_oneof![
        (namespace.clone(), params_strategy(), payload_strategy())
            .prop_map(|(namespace, params, data)| CacheOp::Set { namespace, params, data }),
        (namespace.clone(), params_strategy()).prop_map(|(namespace, params)| CacheOp::Get { namespace, params }),
        namespace.prop_map(|namespace| CacheOp::Invalidate { namespace }),
    ]
}

fn manager(max_memory_entries: usize) -> CacheManager {
    let config = Config {
        max_memory_entries,
        ..Config::default()
    };
    let persistent = PersistentTier::new(Box::new(MemoryStorage::new()), "tcache_", config.max_storage_entries);
    CacheManager::new(&config, persistent)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a value and reading it back before expiry returns the same value.
    #[test]
    fn prop_set_then_get(
        namespace in namespace_strategy(),
        params in params_strategy(),
        data in payload_strategy()
    ) {
        let mut cache = manager(100);

        cache.set_value(&namespace, &params, data.clone(), SetOptions::default().with_ttl_ms(TEST_TTL_MS));

        prop_assert_eq!(cache.get_value(&namespace, &params, true), Some(data));
    }

    // The memory tier never exceeds capacity, whatever is inserted.
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::vec(params_strategy(), 1..200),
        max_entries in 1usize..60
    ) {
        let mut tier = MemoryTier::new(max_entries, EvictionPolicy::CreationOrder);

        for key in keys {
            tier.set(key, CacheEntry::new(json!(1), TEST_TTL_MS));
            prop_assert!(
                tier.len() <= max_entries,
                "Tier size {} exceeds max {}",
                tier.len(),
                max_entries
            );
        }
    }

    // Eviction removes strictly from the oldest end: survivors are exactly
    // the most recently inserted distinct keys, in insertion order.
    #[test]
    fn prop_eviction_preserves_insertion_order(count in 1usize..300) {
        let max_entries = 100;
        let mut tier = MemoryTier::new(max_entries, EvictionPolicy::CreationOrder);

        for i in 0..count {
            tier.set(format!("k{:04}", i), CacheEntry::new(json!(i), TEST_TTL_MS));
        }

        let expected: Vec<String> = (count.saturating_sub(max_entries)..count)
            .map(|i| format!("k{:04}", i))
            .collect();
        prop_assert_eq!(tier.keys_by_eviction_order(), expected);
    }

    // Any sequence of sets, gets and invalidations matches a simple model
    // keyed by derived key, and invalidation never touches other namespaces.
    #[test]
    fn prop_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        // Large enough that nothing is evicted
        let mut cache = manager(1_000);
        let mut model: HashMap<String, (String, Value)> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { namespace, params, data } => {
                    cache.set_value(&namespace, &params, data.clone(), SetOptions::default());
                    model.insert(derive_key(&namespace, &params), (namespace, data));
                }
                CacheOp::Get { namespace, params } => {
                    let expected = model
                        .get(&derive_key(&namespace, &params))
                        .map(|(_, data)| data.clone());
                    prop_assert_eq!(cache.get_value(&namespace, &params, true), expected);
                }
                CacheOp::Invalidate { namespace } => {
                    cache.invalidate(&namespace);
                    model.retain(|_, (ns, _)| ns != &namespace);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.memory.size, model.len());
        prop_assert_eq!(stats.persistent.size, model.len());
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // After its TTL has elapsed an entry is absent from both tiers.
    #[test]
    fn prop_ttl_expiration_behavior(
        namespace in namespace_strategy(),
        params in params_strategy(),
        data in payload_strategy()
    ) {
        let mut cache = manager(100);

        cache.set_value(&namespace, &params, data.clone(), SetOptions::default().with_ttl_ms(10));
        prop_assert_eq!(cache.get_value(&namespace, &params, true), Some(data));

        std::thread::sleep(std::time::Duration::from_millis(25));

        prop_assert_eq!(cache.get_value(&namespace, &params, true), None);
    }
}
