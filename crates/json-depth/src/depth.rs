// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Depth computation over parsed JSON values

use serde_json::Value;

use crate::error::ParseError;

/// Container nesting at which the parser rejects a document.
///
/// This is `serde_json`'s built-in recursion limit. Documents with
/// `MAX_NESTING` or more nested containers fail with
/// [`ParseErrorKind::TooDeep`](crate::ParseErrorKind::TooDeep), so the
/// deepest accepted document has depth `MAX_NESTING - 2`.
pub const MAX_NESTING: usize = 128;

/// Parse `raw_text` as JSON and return its structural depth
///
/// Any root kind is accepted, so a lone scalar such as `42` parses and has
/// depth 0. Trailing content after the document is rejected.
///
/// # Errors
///
/// Returns [`ParseError`] if `raw_text` is not a single valid JSON document.
pub fn compute_depth(raw_text: &str) -> Result<usize, ParseError> {
    let value: Value = serde_json::from_str(raw_text)?;
    Ok(depth_of(&value))
}

/// Structural depth of an already parsed value
///
/// The tree is walked with an explicit stack, so arbitrarily deep values
/// built in memory never exhaust the call stack.
pub fn depth_of(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0_usize)];

    while let Some((node, level)) = pending.pop() {
        deepest = deepest.max(level);
        match node {
            Value::Object(members) => {
                pending.extend(members.values().map(|member| (member, level + 1)));
            }
            Value::Array(elements) => {
                pending.extend(elements.iter().map(|element| (element, level + 1)));
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    deepest
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ParseErrorKind;

    fn nested_arrays(levels: usize) -> String {
        format!("{}{}", "[".repeat(levels), "]".repeat(levels))
    }

    #[test]
    fn scalars_have_no_depth() {
        for document in ["42", "-1.5e3", r#""x""#, "true", "false", "null"] {
            assert_eq!(compute_depth(document).ok(), Some(0), "document {document}");
        }
    }

    #[test]
    fn empty_containers_have_no_depth() {
        assert_eq!(compute_depth("{}").ok(), Some(0));
        assert_eq!(compute_depth("[]").ok(), Some(0));
        assert_eq!(compute_depth(" \n\t{ } ").ok(), Some(0));
    }

    #[test]
    fn nesting_levels() {
        let cases = [
            (r#"{"a": 1}"#, 1),
            (r#"{"a": {}}"#, 1),
            (r#"{"a": {"b": {}}}"#, 2),
            ("[[[]]]", 2),
            ("[1, 2, 3]", 1),
            (r#"{"a": [1, 2, {"b": 3}]}"#, 3),
            (r#"{"a": {"b": [1, 2, 3]}}"#, 3),
            (r#"[[], {}]"#, 1),
            (r#"[10, {"a": 20}]"#, 2),
            (r#"[[2], 3, [[[4]]]]"#, 4),
            (r#"{"a": {"a1": [3]}, "b": {"b1": {"c": {"d": [5]}}}}"#, 5),
            (
                r#"{"Person": {"Name": "Homer", "Age": 39, "Hobbies": ["Eating", "Sleeping"]}}"#,
                3,
            ),
        ];

        for (document, expected) in cases {
            assert_eq!(
                compute_depth(document).ok(),
                Some(expected),
                "document {document}"
            );
        }
    }

    #[test]
    fn container_kind_does_not_matter() {
        let objects = compute_depth(r#"{"a": {"b": {"c": 1}}}"#).ok();
        let arrays = compute_depth("[[[1]]]").ok();
        let mixed = compute_depth(r#"[{"b": [1]}]"#).ok();

        assert_eq!(objects, Some(3));
        assert_eq!(arrays, objects);
        assert_eq!(mixed, objects);
    }

    #[test]
    fn deepest_branch_wins() {
        let value = json!({
            "shallow": 1,
            "deep": [[[["leaf"]]]],
            "middle": {"x": {"y": null}},
        });

        assert_eq!(depth_of(&value), 5);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        for document in ["{", "not json", "", "   ", r#"{"a": 1,}"#, "[1 2]", "{} {}"] {
            assert!(compute_depth(document).is_err(), "document {document:?}");
        }
    }

    #[test]
    fn truncated_document_reports_eof() {
        let error = compute_depth(r#"{"a": [1, 2"#).unwrap_err();
        assert_eq!(error.kind(), ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn repeated_calls_agree() {
        let document = r#"{"a": [{"b": {"c": []}}], "d": "e"}"#;
        let first = compute_depth(document).ok();
        let second = compute_depth(document).ok();

        assert_eq!(first, Some(4));
        assert_eq!(first, second);
    }

    #[test]
    fn nesting_within_limit_is_accepted() {
        assert_eq!(compute_depth(&nested_arrays(100)).ok(), Some(99));
    }

    #[test]
    fn nesting_just_below_limit_is_accepted() {
        assert_eq!(
            compute_depth(&nested_arrays(MAX_NESTING - 1)).ok(),
            Some(MAX_NESTING - 2)
        );
    }

    #[test]
    fn nesting_at_limit_is_rejected() {
        let error = compute_depth(&nested_arrays(MAX_NESTING)).unwrap_err();
        assert_eq!(error.kind(), ParseErrorKind::TooDeep);
    }

    #[test]
    fn nesting_beyond_limit_is_rejected() {
        let error = compute_depth(&nested_arrays(MAX_NESTING * 4)).unwrap_err();
        assert_eq!(error.kind(), ParseErrorKind::TooDeep);
    }

    #[test]
    fn deep_in_memory_values_do_not_overflow() {
        let mut value = json!([]);
        for _ in 0..10_000 {
            value = Value::Array(vec![value]);
        }

        assert_eq!(depth_of(&value), 10_000);

        // dropping a value this deep recurses, unwind it by hand
        while let Value::Array(mut elements) = value {
            value = elements.pop().unwrap_or(Value::Null);
        }
    }
}
