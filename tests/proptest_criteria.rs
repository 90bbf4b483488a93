use jsonrules::{evaluate_criteria, Criteria, CriteriaOptions};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn arb_tested() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1000_i64..1000).prop_map(Value::from),
        (-1000_i64..1000).prop_map(|n| Value::from(n.to_string())),
        arb_word().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

// ---------------------------------------------------------------------------
// Numeric operators agree with integer arithmetic
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn relational_operators_match_integers(n in -1000_i64..1000, t in -1000_i64..1000) {
        let v = json!(n);
        prop_assert_eq!(evaluate_criteria(&format!(">={t}"), Some(&v)), n >= t);
        prop_assert_eq!(evaluate_criteria(&format!(">{t}"), Some(&v)), n > t);
        prop_assert_eq!(evaluate_criteria(&format!("<={t}"), Some(&v)), n <= t);
        prop_assert_eq!(evaluate_criteria(&format!("<{t}"), Some(&v)), n < t);
        prop_assert_eq!(evaluate_criteria(&t.to_string(), Some(&v)), n == t);
    }

    #[test]
    fn numeric_strings_behave_like_numbers(n in -1000_i64..1000, t in -1000_i64..1000) {
        let as_number = json!(n);
        let as_text = json!(n.to_string());
        for op in [">=", ">", "<=", "<", "!=", ""] {
            let source = format!("{op}{t}");
            prop_assert_eq!(
                evaluate_criteria(&source, Some(&as_number)),
                evaluate_criteria(&source, Some(&as_text)),
                "disagreement on {}", source
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Inequality is the negation of equality for present values
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn neq_negates_eq(literal in prop_oneof![arb_word(), (-50_i64..50).prop_map(|n| n.to_string())],
                      tested in arb_tested()) {
        let eq = evaluate_criteria(&literal, Some(&tested));
        let neq = evaluate_criteria(&format!("!={literal}"), Some(&tested));
        prop_assert_eq!(eq, !neq);
    }

    #[test]
    fn null_satisfies_no_concrete_literal(literal in arb_word(), op in prop_oneof![
        Just(""), Just("!="), Just(">"), Just(">="), Just("<"), Just("<=")
    ]) {
        let source = format!("{op}{literal}");
        prop_assert!(!evaluate_criteria(&source, None));
        prop_assert!(!evaluate_criteria(&source, Some(&Value::Null)));
    }
}

// ---------------------------------------------------------------------------
// AND binds tighter than OR
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn and_binds_tighter_than_or(
        n in -100_i64..100,
        a in -100_i64..100,
        b in -100_i64..100,
        c in -100_i64..100,
    ) {
        let v = json!(n);
        let source = format!(">={a} || >={b} && <={c}");
        let expected = n >= a || (n >= b && n <= c);
        prop_assert_eq!(evaluate_criteria(&source, Some(&v)), expected);

        let source = format!(">={b} && <={c} || <{a}");
        let expected = (n >= b && n <= c) || n < a;
        prop_assert_eq!(evaluate_criteria(&source, Some(&v)), expected);
    }

    #[test]
    fn or_of_alternatives_is_any(words in prop::collection::vec(arb_word(), 1..5), tested in arb_word()) {
        let source = words.join(" || ");
        let expected = words.contains(&tested);
        prop_assert_eq!(evaluate_criteria(&source, Some(&json!(tested))), expected);
    }
}

// ---------------------------------------------------------------------------
// Wildcards
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn wildcard_affixes(prefix in arb_word(), middle in arb_word(), suffix in arb_word()) {
        let text = json!(format!("{prefix}{middle}{suffix}"));
        let starts_with = format!("{prefix}*");
        let ends_with = format!("*{suffix}");
        let contains = format!("*{middle}*");
        let affixed = format!("{prefix}*{suffix}");
        let not_starts_with = format!("!={prefix}*");
        prop_assert!(evaluate_criteria(&starts_with, Some(&text)));
        prop_assert!(evaluate_criteria(&ends_with, Some(&text)));
        prop_assert!(evaluate_criteria(&contains, Some(&text)));
        prop_assert!(evaluate_criteria(&affixed, Some(&text)));
        prop_assert!(!evaluate_criteria(&not_starts_with, Some(&text)));
    }

    #[test]
    fn case_folded_wildcards_ignore_case(word in arb_word()) {
        let folded = CriteriaOptions { wildcard_case_sensitive: false };
        let criteria = Criteria::parse(&format!("{}*", word.to_uppercase()));
        prop_assert!(criteria.matches(Some(&json!(word)), &folded));
    }
}

// ---------------------------------------------------------------------------
// Parsing never panics
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn parse_is_total(source in ".{0,40}", tested in arb_tested()) {
        let criteria = Criteria::parse(&source);
        let _ = criteria.matches(Some(&tested), &CriteriaOptions::default());
        let _ = criteria.matches(None, &CriteriaOptions::default());
    }

    #[test]
    fn evaluation_is_deterministic(source in "[<>=!a-z0-9 &|*']{0,24}", tested in arb_tested()) {
        let first = evaluate_criteria(&source, Some(&tested));
        for _ in 0..3 {
            prop_assert_eq!(evaluate_criteria(&source, Some(&tested)), first);
        }
    }
}
