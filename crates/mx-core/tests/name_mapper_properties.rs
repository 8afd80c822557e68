//! Property-based tests for column-name mapping invariants.

use mx_core::name_map::{thin_name, NameMapper};
use proptest::prelude::*;
use std::collections::HashSet;

/// Feature names shaped like pipeline output: segments of letters and
/// digits joined by underscores, often well past the bound.
fn feature_name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Z][a-z]{0,14}[0-9]{0,2}", 1..12).prop_map(|parts| parts.join("_"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn identifiers_are_bounded_and_distinct(
        names in prop::collection::hash_set(feature_name_strategy(), 1..40),
        max_len in 16usize..=64,
        seed in any::<u64>(),
    ) {
        let mut mapper = NameMapper::with_seed(max_len, seed);
        for name in &names {
            mapper.register(name.clone());
        }
        let mut seen = HashSet::new();
        for name in &names {
            let column = mapper.resolve(name).unwrap().to_string();
            prop_assert!(column.chars().count() <= max_len, "{} -> {}", name, column);
            prop_assert!(!column.is_empty());
            prop_assert!(seen.insert(column.clone()), "duplicate identifier {}", column);
        }
    }

    #[test]
    fn resolution_is_idempotent(
        names in prop::collection::vec(feature_name_strategy(), 1..30),
        seed in any::<u64>(),
    ) {
        let mut mapper = NameMapper::with_seed(32, seed);
        for name in &names {
            mapper.register(name.clone());
        }
        let first: Vec<String> = names
            .iter()
            .map(|n| mapper.resolve(n).unwrap().to_string())
            .collect();
        for name in &names {
            mapper.register(name.clone());
        }
        let second: Vec<String> = names
            .iter()
            .map(|n| mapper.resolve(n).unwrap().to_string())
            .collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn earlier_identifiers_survive_later_registrations(
        early in prop::collection::vec(feature_name_strategy(), 1..15),
        late in prop::collection::vec(feature_name_strategy(), 1..15),
        seed in any::<u64>(),
    ) {
        let mut mapper = NameMapper::with_seed(24, seed);
        for name in &early {
            mapper.register(name.clone());
        }
        let before: Vec<String> = early
            .iter()
            .map(|n| mapper.resolve(n).unwrap().to_string())
            .collect();
        for name in &late {
            mapper.register(name.clone());
        }
        for (name, column) in early.iter().zip(&before) {
            prop_assert_eq!(mapper.resolve(name).unwrap(), column.as_str());
        }
    }

    #[test]
    fn thinning_never_grows_and_keeps_order(name in feature_name_strategy(), excess in 0usize..40) {
        let thinned = thin_name(&name, excess);
        let removed = name.chars().count() - thinned.chars().count();
        prop_assert!(removed <= excess);
        // thinned is a subsequence of the original
        let mut rest = name.chars();
        prop_assert!(thinned.chars().all(|c| rest.any(|o| o == c)));
    }
}

#[test]
fn eighty_char_names_with_same_shortening_stay_distinct() {
    // identical except for lowercase vowels near the end, all of which
    // thinning removes first
    let stem = "Intensity_IntegratedIntensityEdge_CorrectedGreen_ObjectsNuclei_";
    let a = format!("{}Xe{}", stem, "a".repeat(15));
    let b = format!("{}Xae{}", stem, "a".repeat(14));
    assert_eq!(a.len(), 80);
    assert_eq!(b.len(), 80);
    assert_eq!(thin_name(&a, 16), thin_name(&b, 16));

    let mut mapper = NameMapper::with_seed(64, 3);
    mapper.register(a.clone());
    let ca = mapper.resolve(&a).unwrap().to_string();
    assert_eq!(ca.chars().count(), 64);
    assert_eq!(ca, thin_name(&a, 16));

    mapper.register(b.clone());
    let cb = mapper.resolve(&b).unwrap().to_string();
    assert!(cb.chars().count() <= 64);
    assert_ne!(ca, cb);
    assert_eq!(mapper.resolve(&a).unwrap(), ca);
}
