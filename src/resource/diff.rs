//! Structural differences between property values.
//!
//! This is the value-level diff the detailed-diff translator consumes. A diff
//! is only produced when two values are structurally unequal; equal inputs
//! yield `None`.

use std::collections::BTreeMap;

use super::property::{PropertyKey, PropertyMap, PropertyValue};

/// Difference between two property maps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectDiff {
    /// Properties only present in the new map.
    pub adds: PropertyMap,
    /// Properties only present in the old map.
    pub deletes: PropertyMap,
    /// Properties that are equal in both maps.
    pub sames: PropertyMap,
    /// Properties present in both maps with different values.
    pub updates: BTreeMap<PropertyKey, ValueDiff>,
}

/// Difference between two arrays, keyed by element index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayDiff {
    /// Elements only present in the new array.
    pub adds: BTreeMap<usize, PropertyValue>,
    /// Elements only present in the old array.
    pub deletes: BTreeMap<usize, PropertyValue>,
    /// Elements equal in both arrays.
    pub sames: BTreeMap<usize, PropertyValue>,
    /// Elements present in both arrays with different values.
    pub updates: BTreeMap<usize, ValueDiff>,
}

/// Difference between two values.
///
/// When both sides are objects (or both arrays) the nested diff is set;
/// otherwise this is a terminal old/new pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueDiff {
    /// The old value.
    pub old: PropertyValue,
    /// The new value.
    pub new: PropertyValue,
    /// Nested diff when both values are objects.
    pub object: Option<ObjectDiff>,
    /// Nested diff when both values are arrays.
    pub array: Option<ArrayDiff>,
}

impl ObjectDiff {
    /// Returns true if anything was added, deleted or updated.
    #[must_use]
    pub fn any_changes(&self) -> bool {
        !self.adds.is_empty() || !self.deletes.is_empty() || !self.updates.is_empty()
    }

    /// Returns the keys that changed, in order.
    #[must_use]
    pub fn changed_keys(&self) -> Vec<PropertyKey> {
        let mut keys: Vec<PropertyKey> = self
            .adds
            .keys()
            .chain(self.deletes.keys())
            .chain(self.updates.keys())
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl ArrayDiff {
    /// Returns true if anything was added, deleted or updated.
    #[must_use]
    pub fn any_changes(&self) -> bool {
        !self.adds.is_empty() || !self.deletes.is_empty() || !self.updates.is_empty()
    }
}

impl ValueDiff {
    /// Diffs two values, returning `None` when they are equal.
    #[must_use]
    pub fn between(old: &PropertyValue, new: &PropertyValue) -> Option<Self> {
        if old == new {
            return None;
        }

        let (inner_old, inner_new) = match (old, new) {
            (PropertyValue::Secret(a), PropertyValue::Secret(b)) => (a.as_ref(), b.as_ref()),
            _ => (old, new),
        };

        let mut diff = Self {
            old: old.clone(),
            new: new.clone(),
            object: None,
            array: None,
        };

        // Containers that differ only in null-valued entries are equal.
        match (inner_old, inner_new) {
            (PropertyValue::Object(a), PropertyValue::Object(b)) => {
                diff.object = Some(a.diff(b)?);
            }
            (PropertyValue::Array(a), PropertyValue::Array(b)) => {
                diff.array = Some(diff_arrays(a, b)?);
            }
            _ => {}
        }

        Some(diff)
    }
}

fn diff_arrays(olds: &[PropertyValue], news: &[PropertyValue]) -> Option<ArrayDiff> {
    let mut diff = ArrayDiff::default();

    for (i, old) in olds.iter().enumerate() {
        match news.get(i) {
            Some(new) => match ValueDiff::between(old, new) {
                Some(vd) => {
                    diff.updates.insert(i, vd);
                }
                None => {
                    diff.sames.insert(i, old.clone());
                }
            },
            None => {
                diff.deletes.insert(i, old.clone());
            }
        }
    }

    for (i, new) in news.iter().enumerate().skip(olds.len()) {
        diff.adds.insert(i, new.clone());
    }

    diff.any_changes().then_some(diff)
}

impl PropertyMap {
    /// Diffs this map (the olds) against `news`.
    ///
    /// Returns `None` when the maps are structurally equal. Null values are
    /// treated the same as missing keys.
    #[must_use]
    pub fn diff(&self, news: &Self) -> Option<ObjectDiff> {
        self.diff_ignoring(news, |_| false)
    }

    /// Diffs this map against `news`, skipping top-level keys for which
    /// `ignore` returns true.
    #[must_use]
    pub fn diff_ignoring<F>(&self, news: &Self, ignore: F) -> Option<ObjectDiff>
    where
        F: Fn(&str) -> bool,
    {
        let mut diff = ObjectDiff::default();

        for (key, old) in self.iter() {
            if ignore(key.as_str()) {
                continue;
            }
            match news.get(key) {
                Some(new) if !new.is_null() => {
                    if old.is_null() {
                        diff.adds.insert(key.clone(), new.clone());
                    } else if let Some(vd) = ValueDiff::between(old, new) {
                        diff.updates.insert(key.clone(), vd);
                    } else {
                        diff.sames.insert(key.clone(), old.clone());
                    }
                }
                _ => {
                    if !old.is_null() {
                        diff.deletes.insert(key.clone(), old.clone());
                    }
                }
            }
        }

        for (key, new) in news.iter() {
            if ignore(key.as_str()) || self.contains_key(key) || new.is_null() {
                continue;
            }
            diff.adds.insert(key.clone(), new.clone());
        }

        diff.any_changes().then_some(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_maps_have_no_diff() {
        let a = PropertyMap::new().with("size", "small").with("count", 1);
        assert!(a.diff(&a.clone()).is_none());
    }

    #[test]
    fn test_adds_deletes_updates() {
        let olds = PropertyMap::new().with("region", "eu").with("size", "small").with("keep", 1);
        let news = PropertyMap::new().with("tags", "x").with("size", "large").with("keep", 1);

        let diff = olds.diff(&news).expect("maps differ");

        assert!(diff.adds.contains_key("tags"));
        assert!(diff.deletes.contains_key("region"));
        assert!(diff.updates.contains_key("size"));
        assert!(diff.sames.contains_key("keep"));
        assert_eq!(diff.changed_keys(), vec!["region", "size", "tags"]);
    }

    #[test]
    fn test_null_counts_as_missing() {
        let olds = PropertyMap::new().with("a", PropertyValue::Null);
        let news = PropertyMap::new().with("a", "set");
        let diff = olds.diff(&news).expect("maps differ");
        assert!(diff.adds.contains_key("a"));

        let diff = news.diff(&olds).expect("maps differ");
        assert!(diff.deletes.contains_key("a"));
    }

    #[test]
    fn test_nested_null_counts_as_missing() {
        let olds = PropertyMap::new().with("a", PropertyMap::new().with("x", PropertyValue::Null));
        let news = PropertyMap::new().with("a", PropertyMap::new());
        assert!(olds.diff(&news).is_none());
        assert!(news.diff(&olds).is_none());

        let olds = PropertyMap::new().with(
            "list",
            PropertyValue::Array(vec![PropertyMap::new().with("x", PropertyValue::Null).into()]),
        );
        let news = PropertyMap::new().with("list", PropertyValue::Array(vec![PropertyMap::new().into()]));
        assert!(olds.diff(&news).is_none());
    }

    #[test]
    fn test_nested_array_diff() {
        let olds = PropertyMap::new().with(
            "rules",
            PropertyValue::Array(vec!["a".into(), "b".into(), "c".into()]),
        );
        let news = PropertyMap::new().with("rules", PropertyValue::Array(vec!["a".into(), "x".into()]));

        let diff = olds.diff(&news).expect("maps differ");
        let rules = diff.updates.get("rules").expect("rules updated");
        let array = rules.array.as_ref().expect("array diff");

        assert!(array.sames.contains_key(&0));
        assert!(array.updates.contains_key(&1));
        assert!(array.deletes.contains_key(&2));
        assert!(array.adds.is_empty());
    }

    #[test]
    fn test_nested_object_diff_through_secret() {
        let olds = PropertyMap::new().with(
            "creds",
            PropertyValue::from(PropertyMap::new().with("user", "a")).into_secret(),
        );
        let news = PropertyMap::new().with(
            "creds",
            PropertyValue::from(PropertyMap::new().with("user", "b")).into_secret(),
        );

        let diff = olds.diff(&news).expect("maps differ");
        let creds = diff.updates.get("creds").expect("creds updated");
        let object = creds.object.as_ref().expect("object diff");
        assert!(object.updates.contains_key("user"));
    }

    #[test]
    fn test_ignored_keys_are_skipped() {
        let olds = PropertyMap::new().with("a", 1).with("b", 1);
        let news = PropertyMap::new().with("a", 2).with("b", 1).with("c", 3);

        assert!(olds.diff_ignoring(&news, |k| k == "a" || k == "c").is_none());
    }

    #[test]
    fn test_computed_value_is_an_update() {
        let olds = PropertyMap::new().with("ip", "10.0.0.1");
        let news = PropertyMap::new().with("ip", PropertyValue::Computed);
        let diff = olds.diff(&news).expect("maps differ");
        let ip = diff.updates.get("ip").expect("ip updated");
        assert!(ip.object.is_none() && ip.array.is_none());
    }
}
