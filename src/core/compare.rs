//! Comparison rules.
//!
//! Decides whether live state already matches a declaration. A mismatch is not
//! an error: it is what drives a reconciliation action.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::core::types::Params;

/// Whether `actual` satisfies the declared `desired` parameters.
///
/// Every key of `desired` must be present in `actual` with an equal value.
/// Mappings are compared recursively with the same rule, so keys present in
/// `actual` but not declared never cause a mismatch. An empty declaration is
/// satisfied by anything, including a nested one the server reports as null.
pub fn satisfies(desired: &Params, actual: &Value) -> bool {
    if desired.is_empty() {
        return true;
    }
    match actual {
        Value::Object(actual) => desired.iter().all(|(key, want)| {
            actual
                .get(key)
                .is_some_and(|have| value_satisfies(want, have))
        }),
        _ => false,
    }
}

fn value_satisfies(want: &Value, have: &Value) -> bool {
    match (want, have) {
        (Value::Object(want), Value::Object(_)) => satisfies(want, have),
        (Value::Object(want), Value::Null) => want.is_empty(),
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        _ => want == have,
    }
}

/// Declared keys whose value `actual` does not satisfy, sorted by key.
pub fn mismatched_keys<'a>(desired: &'a Params, actual: &Value) -> Vec<&'a str> {
    desired
        .iter()
        .filter(|(key, want)| {
            !actual
                .get(key.as_str())
                .is_some_and(|have| value_satisfies(want, have))
        })
        .map(|(key, _)| key.as_str())
        .collect()
}

/// Order-insensitive comparison of two string collections.
pub fn same_set<A, B>(a: A, b: B) -> bool
where
    A: IntoIterator,
    A::Item: AsRef<str>,
    B: IntoIterator,
    B::Item: AsRef<str>,
{
    let a: BTreeSet<String> = a.into_iter().map(|s| s.as_ref().to_string()).collect();
    let b: BTreeSet<String> = b.into_iter().map(|s| s.as_ref().to_string()).collect();
    a == b
}

/// Convert a JSON value into a parameter map, treating anything else as empty.
pub fn as_params(value: &Value) -> Params {
    match value {
        Value::Object(map) => map.clone(),
        _ => Params::new(),
    }
}
