//! Property-based tests for LaTeX escaping
//!
//! Escaping must be idempotent, must leave no raw control character behind
//! and must never change the shape of a data tree.

use latex_engine::{escape_latex, sanitize};
use proptest::prelude::*;
use serde_json::Value;

/// Strings biased towards LaTeX control characters and escape fragments
fn latexish_string() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z0-9 ]{0,4}",
            Just("\\".to_string()),
            Just("&".to_string()),
            Just("%".to_string()),
            Just("$".to_string()),
            Just("#".to_string()),
            Just("_".to_string()),
            Just("{".to_string()),
            Just("}".to_string()),
            Just("~".to_string()),
            Just("^".to_string()),
            Just("\\textbackslash".to_string()),
            Just("\\textasciitilde{}".to_string()),
            Just("é€".to_string()),
        ],
        0..16,
    )
    .prop_map(|parts| parts.concat())
}

/// Arbitrary acyclic JSON trees with latex-ish string leaves
fn json_tree() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        latexish_string().prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Remove every known escape sequence; whatever remains must be plain text
fn strip_escapes(s: &str) -> String {
    [
        r"\textbackslash{}",
        r"\textasciitilde{}",
        r"\textasciicircum{}",
        r"\&",
        r"\%",
        r"\$",
        r"\#",
        r"\_",
        r"\{",
        r"\}",
    ]
    .iter()
    .fold(s.to_string(), |acc, seq| acc.replace(seq, ""))
}

fn same_shape(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(_), Value::String(_)) => true,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| same_shape(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).map_or(false, |w| same_shape(v, w)))
        }
        (l, r) => l == r,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn escaping_is_idempotent(s in latexish_string()) {
        let once = escape_latex(&s);
        prop_assert_eq!(escape_latex(&once), once);
    }

    #[test]
    fn no_raw_control_characters_survive(s in latexish_string()) {
        let escaped = escape_latex(&s);
        let rest = strip_escapes(&escaped);
        prop_assert!(
            !rest.chars().any(|c| "\\&%$#_{}~^".contains(c)),
            "raw control character left in {:?}", escaped
        );
    }

    #[test]
    fn plain_text_is_untouched(s in "[a-zA-Z0-9 .,:;!?()-]{0,40}") {
        prop_assert_eq!(escape_latex(&s), s);
    }

    #[test]
    fn sanitize_preserves_shape(tree in json_tree()) {
        let clean = sanitize(&tree);
        prop_assert!(same_shape(&tree, &clean));
    }

    #[test]
    fn sanitize_is_idempotent(tree in json_tree()) {
        let once = sanitize(&tree);
        prop_assert_eq!(sanitize(&once), once);
    }
}
