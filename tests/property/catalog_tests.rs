//! Property-based tests for the scenario catalog

use proptest::prelude::*;
use api_failure_simulator::catalog::{
    Category, NamedFault, ScenarioCatalog, ScenarioId, MAX_STATUS, MIN_STATUS,
};

proptest! {
    /// Every in-range code resolves to a descriptor with that status
    #[test]
    fn test_every_valid_code_resolves(
        code in MIN_STATUS..=MAX_STATUS,
    ) {
        let catalog = ScenarioCatalog::default();
        let descriptor = catalog.lookup(&ScenarioId::Status(code)).unwrap();

        prop_assert_eq!(descriptor.status, code);
        prop_assert_eq!(descriptor.id, code.to_string());
        prop_assert_eq!(Some(descriptor.category), Category::from_status(code));
        prop_assert!(!descriptor.title.is_empty());
    }

    /// Lookups are pure
    #[test]
    fn test_lookup_is_deterministic(
        code in MIN_STATUS..=MAX_STATUS,
    ) {
        let catalog = ScenarioCatalog::default();
        let id = ScenarioId::Status(code);

        prop_assert_eq!(catalog.lookup(&id).unwrap(), catalog.lookup(&id).unwrap());
    }

    /// Codes outside the HTTP range are refused
    #[test]
    fn test_out_of_range_codes_rejected(
        code in prop_oneof![0u16..MIN_STATUS, (MAX_STATUS + 1)..=u16::MAX],
    ) {
        prop_assert!(ScenarioId::from_code(code).is_err());
    }

    /// Fault identifiers tolerate case and underscores
    #[test]
    fn test_fault_name_normalization(
        index in 0usize..NamedFault::ALL.len(),
        upper in any::<bool>(),
        underscores in any::<bool>(),
    ) {
        let fault = NamedFault::ALL[index];
        let mut name = fault.id().to_string();
        if upper {
            name = name.to_uppercase();
        }
        if underscores {
            name = name.replace('-', "_");
        }

        prop_assert_eq!(ScenarioId::parse(&name).unwrap(), ScenarioId::Fault(fault));
    }

    /// Arbitrary lowercase words that are not fault names are unknown scenarios
    #[test]
    fn test_unknown_names_rejected(
        name in "[a-z]{3,12}",
    ) {
        prop_assume!(name.parse::<NamedFault>().is_err());
        prop_assert!(ScenarioId::parse(&name).is_err());
    }

    /// The random pool never contains exclusions and is never empty
    #[test]
    fn test_random_pool(
        exclude in proptest::collection::vec(400u16..=504, 0..12),
    ) {
        let catalog = ScenarioCatalog::default();
        let pool = catalog.random_pool(&exclude);

        prop_assert!(!pool.is_empty());
        if pool != vec![500] {
            prop_assert!(pool.iter().all(|code| !exclude.contains(code)));
        }
    }
}
