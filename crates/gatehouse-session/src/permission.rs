//! Group-based permission checks.

use std::collections::BTreeSet;

/// A set of group names.
///
/// `BTreeSet` rather than `HashSet` so groups print in a stable order in
/// logs and test failures.
pub type Groups = BTreeSet<String>;

/// Builds a [`Groups`] set from anything string-like.
///
/// ```rust
/// use gatehouse_session::groups;
///
/// let held = groups(["app1", "group1"]);
/// assert!(held.contains("app1"));
/// ```
pub fn groups<I, S>(items: I) -> Groups
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Returns `true` if `held` covers every group in `required`.
///
/// `None` or an empty requirement means "no restriction configured" and
/// always passes. Never fails and has no side effects.
pub fn satisfies(held: &Groups, required: Option<&Groups>) -> bool {
    match required {
        None => true,
        Some(required) => required.is_subset(held),
    }
}
