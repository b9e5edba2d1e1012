//! Property-based tests for template source ordering using proptest.

use proptest::prelude::*;
use templating::template::TemplateRegistry;
use templating::TemplateTarget;

// ============================================================================
// Test helpers
// ============================================================================

fn code_of(target: &TemplateTarget) -> String {
    target.as_code().unwrap_or_default().to_string()
}

// Small code alphabet so duplicates are common.
fn registration_strategy() -> impl Strategy<Value = Vec<(String, i32)>> {
    prop::collection::vec(("[a-c]", -3i32..=3), 0..40)
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Sources come back sorted by weight, equal weights in registration order.
    #[test]
    fn sources_are_stably_sorted_by_weight(registrations in registration_strategy()) {
        let registry = TemplateRegistry::new("jinja");
        for (i, (_, weight)) in registrations.iter().enumerate() {
            registry.register("t", TemplateTarget::code(i.to_string()), *weight, None);
        }

        let mut expected: Vec<(i32, usize)> = registrations
            .iter()
            .enumerate()
            .map(|(i, (_, weight))| (*weight, i))
            .collect();
        expected.sort();

        let actual: Vec<(i32, usize)> = registry
            .list("t")
            .iter()
            .map(|s| (s.weight, code_of(&s.target).parse().unwrap()))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    /// The active source has the highest weight, latest registration on ties.
    #[test]
    fn active_source_is_last_highest_weight(registrations in registration_strategy()) {
        prop_assume!(!registrations.is_empty());
        let registry = TemplateRegistry::new("jinja");
        for (i, (_, weight)) in registrations.iter().enumerate() {
            registry.register("t", TemplateTarget::code(i.to_string()), *weight, None);
        }

        let max = registrations.iter().map(|(_, w)| *w).max().unwrap();
        let expected = registrations.iter().rposition(|(_, w)| *w == max).unwrap();

        let active = registry.active("t").unwrap();
        prop_assert_eq!(code_of(&active.target), expected.to_string());
    }

    /// Unregistering a code removes all its copies and keeps everything else in order.
    #[test]
    fn unregister_target_preserves_survivors(
        registrations in registration_strategy(),
        removed in "[a-c]",
    ) {
        let registry = TemplateRegistry::new("jinja");
        for (code, weight) in &registrations {
            registry.register("t", TemplateTarget::code(code.clone()), *weight, None);
        }

        let before: Vec<(i32, String)> = registry
            .list("t")
            .iter()
            .map(|s| (s.weight, code_of(&s.target)))
            .collect();

        registry.unregister("t", Some(&TemplateTarget::code(removed.clone())));

        let after: Vec<(i32, String)> = registry
            .list("t")
            .iter()
            .map(|s| (s.weight, code_of(&s.target)))
            .collect();
        let expected: Vec<(i32, String)> = before
            .into_iter()
            .filter(|(_, code)| code != &removed)
            .collect();

        prop_assert_eq!(&after, &expected);
        prop_assert_eq!(registry.is_registered("t"), !expected.is_empty());
    }
}
