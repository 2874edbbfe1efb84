//! Header bags and their merge rules.
//!
//! Request options carry a [`HeaderBag`] where a `None` value means "remove
//! this header if it was set by a lower-precedence layer". The transport only
//! ever sees a [`HeaderMap`] with plain values.

use std::collections::HashMap;

/// `Authorization` header name.
pub const AUTHORIZATION: &str = "Authorization";
/// `Accept` header name.
pub const ACCEPT: &str = "Accept";
/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Headers as configured on a client or a call. `None` marks a removal.
pub type HeaderBag = HashMap<String, Option<String>>;

/// Headers as handed to the transport. Unset keys are absent.
pub type HeaderMap = HashMap<String, String>;

/// Merge `overrides` on top of `base`.
///
/// Keys of `base` are kept unless `overrides` has the same key, in which case
/// the override wins. An override set to `None` removes the key from the
/// result. `None` entries of `base` are dropped as well, so the result never
/// stores a removal marker.
///
/// ```
/// use minfetch_core::{HeaderBag, merge_headers};
///
/// let base = HeaderBag::from([
///     ("X-Kept".to_string(), Some("kept".to_string())),
///     ("X-Removed".to_string(), Some("gone".to_string())),
/// ]);
/// let overrides = HeaderBag::from([("X-Removed".to_string(), None)]);
///
/// let merged = merge_headers(&base, &overrides);
/// assert_eq!(merged.get("X-Kept"), Some(&Some("kept".to_string())));
/// assert!(!merged.contains_key("X-Removed"));
/// ```
#[must_use]
pub fn merge_headers(base: &HeaderBag, overrides: &HeaderBag) -> HeaderBag {
    let mut merged: HeaderBag = base
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    for (name, value) in overrides {
        match value {
            Some(value) => {
                merged.insert(name.clone(), Some(value.clone()));
            }
            None => {
                merged.remove(name);
            }
        }
    }

    merged
}

/// Drop every header whose value is unset.
#[must_use]
pub fn remove_unset(bag: &HeaderBag) -> HeaderMap {
    bag.iter()
        .filter_map(|(name, value)| value.as_ref().map(|value| (name.clone(), value.clone())))
        .collect()
}

/// Build a [`HeaderBag`] from plain name/value pairs.
pub fn header_bag<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> HeaderBag
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), Some(value.into())))
        .collect()
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    fn bag(pairs: &[(&str, Option<&str>)]) -> HeaderBag {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn merge_overrides_same_key() {
        let base = bag(&[("X-KEPT", Some("Kept")), ("X-OVERRIDE", Some("Not overriden"))]);
        let overrides = bag(&[("X-OVERRIDE", Some("Overriden"))]);

        let merged = merge_headers(&base, &overrides);

        check!(merged == bag(&[("X-KEPT", Some("Kept")), ("X-OVERRIDE", Some("Overriden"))]));
    }

    #[test]
    fn merge_removes_unset_override() {
        let base = bag(&[("Authorization", Some("Bearer token")), ("Accept", Some("*/*"))]);
        let overrides = bag(&[("Authorization", None)]);

        let merged = merge_headers(&base, &overrides);

        check!(!merged.contains_key("Authorization"));
        check!(merged.get("Accept") == Some(&Some("*/*".to_string())));
    }

    #[test]
    fn merge_unset_override_absent_from_base() {
        let merged = merge_headers(&HeaderBag::new(), &bag(&[("X-New", None)]));
        check!(merged.is_empty());
    }

    #[test]
    fn merge_drops_unset_base_entries() {
        let merged = merge_headers(&bag(&[("Accept", None)]), &HeaderBag::new());
        check!(merged.is_empty());
    }

    #[test]
    fn merge_is_case_sensitive() {
        let base = bag(&[("accept", Some("text/plain"))]);
        let overrides = bag(&[("Accept", Some("application/json"))]);

        let merged = merge_headers(&base, &overrides);

        check!(merged.len() == 2);
    }

    #[test]
    fn remove_unset_values() {
        let initial = bag(&[("shouldBeDefined", Some("foo")), ("shouldBeRemoved", None)]);

        let map = remove_unset(&initial);

        check!(map.get("shouldBeDefined").map(String::as_str) == Some("foo"));
        check!(!map.contains_key("shouldBeRemoved"));
    }

    #[test]
    fn header_bag_from_pairs() {
        let bag = header_bag([("Accept", "application/json")]);
        check!(bag.get("Accept") == Some(&Some("application/json".to_string())));
    }
}
