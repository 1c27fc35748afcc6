use indexmap::IndexMap;

use crate::object::{DeepCopyMemo, Object};

/// Module-level identifiers that are never reported as global changes.
pub const EXCLUDED_GLOBALS: [&str; 6] = [
    "__name__",
    "__doc__",
    "__package__",
    "__loader__",
    "__spec__",
    "__builtins__",
];

/// Whether `name` takes part in namespace diffs and feedback listings.
#[must_use]
pub fn is_user_name(name: &str) -> bool {
    !EXCLUDED_GLOBALS.contains(&name)
}

/// Global variables of the submitted code: identifier to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace(IndexMap<String, Object>);

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Object) -> Option<Object> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Object> {
        self.0.shift_remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names visible to feedback, skipping the reserved module identifiers.
    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str).filter(|name| is_user_name(name))
    }

    /// Independent snapshot; aliasing between entries is preserved inside the copy.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        let mut memo = DeepCopyMemo::default();
        Self(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), value.deep_copy_with(&mut memo)))
                .collect(),
        )
    }

    /// Adds or overwrites every entry of `other`.
    pub fn update(&mut self, other: Self) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(String, Object)> for Namespace {
    fn from_iter<T: IntoIterator<Item = (String, Object)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, Object)> for Namespace {
    fn from_iter<T: IntoIterator<Item = (&'a str, Object)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }
}

impl IntoIterator for Namespace {
    type Item = (String, Object);
    type IntoIter = indexmap::map::IntoIter<String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A value that changed between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub name: String,
    pub before: Object,
    pub after: Object,
}

/// Differences between two namespaces, each list in namespace order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceDiff {
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub modified: Vec<Modification>,
}

impl NamespaceDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    pub fn modified_names(&self) -> impl Iterator<Item = &str> {
        self.modified.iter().map(|m| m.name.as_str())
    }
}

/// Computes the added, deleted and modified identifiers going from `previous` to `current`.
///
/// Reserved module identifiers are ignored on every side.
#[must_use]
pub fn diff(previous: &Namespace, current: &Namespace) -> NamespaceDiff {
    let mut result = NamespaceDiff::default();
    for (name, before) in previous.iter().filter(|(name, _)| is_user_name(name)) {
        match current.get(name) {
            None => result.deleted.push(name.to_owned()),
            Some(after) if after != before => result.modified.push(Modification {
                name: name.to_owned(),
                before: before.clone(),
                after: after.clone(),
            }),
            Some(_) => {}
        }
    }
    result.added = current
        .user_names()
        .filter(|name| !previous.contains(name))
        .map(str::to_owned)
        .collect();
    result
}
