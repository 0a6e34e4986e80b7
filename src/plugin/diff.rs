//! Diff classification and the detailed-diff translator.
//!
//! A provider's `Diff` answers two questions: what changed, and does the
//! change force the resource to be replaced. [`DiffResult`] carries both a
//! coarse, top-level view (`replace_keys`, `changed_keys`, `stable_keys`) and
//! the fine-grained [`DetailedDiff`] keyed by property path.
//!
//! Paths are built as `key`, `parent.key` for object members and
//! `parent[index]` for array elements, e.g. `tags[2].name`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::DiffError;
use crate::resource::{ArrayDiff, ObjectDiff, PropertyKey, ValueDiff};

/// Fine-grained diff keyed by property path.
pub type DetailedDiff = BTreeMap<String, PropertyDiff>;

/// Whether a diff found changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffChanges {
    /// The provider gave no information about changes (legacy behavior).
    #[default]
    Unknown,
    /// The diff ran and found no changes.
    None,
    /// The diff ran and found changes.
    Some,
}

/// The kind of change that applies to a single property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffKind {
    /// The property was added.
    Add,
    /// The property was added and the resource must be replaced.
    AddReplace,
    /// The property was deleted.
    Delete,
    /// The property was deleted and the resource must be replaced.
    DeleteReplace,
    /// The property was updated.
    Update,
    /// The property was updated and the resource must be replaced.
    UpdateReplace,
}

/// The difference recorded for a single property path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyDiff {
    /// The kind of change.
    pub kind: DiffKind,
    /// True if old inputs were compared to new inputs, rather than old state
    /// to new inputs.
    #[serde(default)]
    pub input_diff: bool,
}

/// Outcome of a provider `Diff` or `DiffConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    /// Whether changes were found.
    pub changes: DiffChanges,
    /// Top-level keys whose change forces replacement.
    #[serde(default)]
    pub replace_keys: Vec<PropertyKey>,
    /// Top-level keys guaranteed not to change.
    #[serde(default)]
    pub stable_keys: Vec<PropertyKey>,
    /// Top-level keys that changed.
    #[serde(default)]
    pub changed_keys: Vec<PropertyKey>,
    /// Per-path diff; the source of truth when present.
    #[serde(default)]
    pub detailed_diff: DetailedDiff,
    /// The old resource must be deleted before its replacement is created.
    #[serde(default)]
    pub delete_before_replace: bool,
}

/// A provider could not compute a diff for a resource.
///
/// Callers must not read this as "no changes"; the usual policy is to assume
/// changes exist and ask for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct DiffUnavailableError {
    reason: String,
}

impl DiffUnavailableError {
    /// Creates a diff-unavailable error with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason given by the provider.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl DiffKind {
    /// Returns true for the three replacement kinds.
    #[must_use]
    pub const fn is_replace(self) -> bool {
        matches!(self, Self::AddReplace | Self::DeleteReplace | Self::UpdateReplace)
    }

    /// Returns the replacement counterpart of this kind.
    ///
    /// Replacement kinds map to themselves, so this is idempotent.
    #[must_use]
    pub const fn as_replace(self) -> Self {
        match self {
            Self::Add | Self::AddReplace => Self::AddReplace,
            Self::Delete | Self::DeleteReplace => Self::DeleteReplace,
            Self::Update | Self::UpdateReplace => Self::UpdateReplace,
        }
    }

    /// All six kinds, in wire order.
    pub const ALL: [Self; 6] = [
        Self::Add,
        Self::AddReplace,
        Self::Delete,
        Self::DeleteReplace,
        Self::Update,
        Self::UpdateReplace,
    ];
}

impl TryFrom<i32> for DiffKind {
    type Error = DiffError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(DiffError::UnknownDiffKind { value })
    }
}

impl std::fmt::Display for DiffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::AddReplace => "add-replace",
            Self::Delete => "delete",
            Self::DeleteReplace => "delete-replace",
            Self::Update => "update",
            Self::UpdateReplace => "update-replace",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for DiffChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::None => "none",
            Self::Some => "some",
        };
        write!(f, "{s}")
    }
}

impl PropertyDiff {
    /// Creates a property diff of the given kind.
    #[must_use]
    pub const fn new(kind: DiffKind) -> Self {
        Self {
            kind,
            input_diff: false,
        }
    }

    /// Returns a copy with the kind converted to its replacement counterpart.
    #[must_use]
    pub const fn to_replace(self) -> Self {
        Self {
            kind: self.kind.as_replace(),
            input_diff: self.input_diff,
        }
    }
}

impl DiffResult {
    /// A diff that ran and found nothing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            changes: DiffChanges::None,
            ..Self::default()
        }
    }

    /// Builds a result from a detailed diff, deriving the coarse key lists
    /// from the top-level segment of each path.
    #[must_use]
    pub fn from_detailed_diff(detailed_diff: DetailedDiff, delete_before_replace: bool) -> Self {
        let mut changed = BTreeSet::new();
        let mut replace = BTreeSet::new();
        for (path, diff) in &detailed_diff {
            let key = top_level_key(path).to_string();
            if diff.kind.is_replace() {
                replace.insert(key.clone());
            }
            changed.insert(key);
        }

        let changes = if detailed_diff.is_empty() {
            DiffChanges::None
        } else {
            DiffChanges::Some
        };

        Self {
            changes,
            replace_keys: replace.into_iter().collect(),
            stable_keys: vec![],
            changed_keys: changed.into_iter().collect(),
            detailed_diff,
            delete_before_replace,
        }
    }

    /// Returns true if this diff requires the resource to be replaced.
    #[must_use]
    pub fn replace(&self) -> bool {
        self.detailed_diff.values().any(|d| d.kind.is_replace()) || !self.replace_keys.is_empty()
    }

    /// Returns true if the diff reported changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changes == DiffChanges::Some
    }

    /// Checks that the coarse key lists and the detailed diff agree.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::Inconsistent`] describing the first disagreement.
    pub fn validate(&self) -> Result<(), DiffError> {
        if self.changes == DiffChanges::None
            && (!self.replace_keys.is_empty()
                || !self.changed_keys.is_empty()
                || !self.detailed_diff.is_empty())
        {
            return Err(DiffError::inconsistent(
                "diff reports no changes but lists changed properties",
            ));
        }

        if self.detailed_diff.is_empty() {
            return Ok(());
        }

        let detailed_replace: BTreeSet<&str> = self
            .detailed_diff
            .iter()
            .filter(|(_, d)| d.kind.is_replace())
            .map(|(path, _)| top_level_key(path))
            .collect();

        if let Some(key) = self
            .replace_keys
            .iter()
            .find(|k| !detailed_replace.contains(k.as_str()))
        {
            return Err(DiffError::inconsistent(format!(
                "'{key}' is a replace key but has no replacement in the detailed diff"
            )));
        }

        if !self.replace_keys.is_empty()
            && let Some(key) = detailed_replace
                .iter()
                .find(|k| !self.replace_keys.iter().any(|r| r == *k))
        {
            return Err(DiffError::inconsistent(format!(
                "'{key}' requires replacement in the detailed diff but is not a replace key"
            )));
        }

        Ok(())
    }

    /// Removes ignored properties from both the coarse and detailed views.
    ///
    /// An ignore path hides itself and everything nested under it.
    pub fn apply_ignore_changes(&mut self, ignore_changes: &[String]) {
        if ignore_changes.is_empty() {
            return;
        }

        let changed_before = detailed_top_level_keys(&self.detailed_diff, false);
        let replace_before = detailed_top_level_keys(&self.detailed_diff, true);

        self.detailed_diff
            .retain(|path, _| !ignore_changes.iter().any(|ignore| path_is_under(path, ignore)));

        let changed_after = detailed_top_level_keys(&self.detailed_diff, false);
        let replace_after = detailed_top_level_keys(&self.detailed_diff, true);

        // A coarse key survives unless it is ignored outright or every
        // detailed entry that backed it was ignored.
        let ignored_key = |key: &String| ignore_changes.iter().any(|ignore| ignore == key);
        let backed = |key: &String, before: &BTreeSet<String>, after: &BTreeSet<String>| {
            !before.contains(key) || after.contains(key)
        };
        self.changed_keys
            .retain(|k| !ignored_key(k) && backed(k, &changed_before, &changed_after));
        self.replace_keys.retain(|k| {
            !ignored_key(k)
                && backed(k, &changed_before, &changed_after)
                && backed(k, &replace_before, &replace_after)
        });

        if self.changes == DiffChanges::Some
            && self.detailed_diff.is_empty()
            && self.changed_keys.is_empty()
            && self.replace_keys.is_empty()
        {
            self.changes = DiffChanges::None;
        }
    }
}

/// Collects the top-level keys of a detailed diff, optionally only those of
/// replace-kind entries.
fn detailed_top_level_keys(detailed_diff: &DetailedDiff, replace_only: bool) -> BTreeSet<String> {
    detailed_diff
        .iter()
        .filter(|(_, d)| !replace_only || d.kind.is_replace())
        .map(|(path, _)| top_level_key(path).to_string())
        .collect()
}

/// Returns the top-level property key of a path.
#[must_use]
pub fn top_level_key(path: &str) -> &str {
    path.find(['.', '[']).map_or(path, |end| &path[..end])
}

/// Returns true if `path` is `prefix` or nested beneath it.
#[must_use]
pub fn path_is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
}

/// Sets the `input_diff` flag on every entry.
pub fn mark_input_diff(detailed_diff: &mut DetailedDiff, input_diff: bool) {
    for diff in detailed_diff.values_mut() {
        diff.input_diff = input_diff;
    }
}

/// Flattens a structural object diff into a detailed diff.
///
/// A missing diff yields an empty map.
#[must_use]
pub fn detailed_diff_from_object_diff(diff: Option<&ObjectDiff>) -> DetailedDiff {
    let mut out = DetailedDiff::new();
    if let Some(diff) = diff {
        object_diff_to_detailed_diff("", diff, &mut out);
    }
    out
}

fn object_diff_to_detailed_diff(prefix: &str, diff: &ObjectDiff, acc: &mut DetailedDiff) {
    let nested = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    for (key, vd) in &diff.updates {
        value_diff_to_detailed_diff(&nested(key), vd, acc);
    }
    for key in diff.adds.keys() {
        acc.insert(nested(key), PropertyDiff::new(DiffKind::Add));
    }
    for key in diff.deletes.keys() {
        acc.insert(nested(key), PropertyDiff::new(DiffKind::Delete));
    }
}

fn array_diff_to_detailed_diff(prefix: &str, diff: &ArrayDiff, acc: &mut DetailedDiff) {
    let nested = |i: usize| format!("{prefix}[{i}]");

    for (i, vd) in &diff.updates {
        value_diff_to_detailed_diff(&nested(*i), vd, acc);
    }
    for i in diff.adds.keys() {
        acc.insert(nested(*i), PropertyDiff::new(DiffKind::Add));
    }
    for i in diff.deletes.keys() {
        acc.insert(nested(*i), PropertyDiff::new(DiffKind::Delete));
    }
}

fn value_diff_to_detailed_diff(prefix: &str, vd: &ValueDiff, acc: &mut DetailedDiff) {
    if let Some(object) = &vd.object {
        object_diff_to_detailed_diff(prefix, object, acc);
    } else if let Some(array) = &vd.array {
        array_diff_to_detailed_diff(prefix, array, acc);
    } else {
        let kind = match (vd.old.is_null(), vd.new.is_null()) {
            (true, false) => DiffKind::Add,
            (false, true) => DiffKind::Delete,
            _ => DiffKind::Update,
        };
        acc.insert(prefix.to_string(), PropertyDiff::new(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{PropertyMap, PropertyValue};

    fn update(old: &str, new: &str) -> ValueDiff {
        ValueDiff {
            old: PropertyValue::from(old),
            new: PropertyValue::from(new),
            object: None,
            array: None,
        }
    }

    #[test]
    fn test_as_replace_idempotent() {
        for kind in DiffKind::ALL {
            assert_eq!(kind.as_replace().as_replace(), kind.as_replace());
            assert!(kind.as_replace().is_replace());
        }
    }

    #[test]
    fn test_is_replace_partition() {
        let replace: Vec<DiffKind> = DiffKind::ALL.into_iter().filter(|k| k.is_replace()).collect();
        assert_eq!(
            replace,
            vec![DiffKind::AddReplace, DiffKind::DeleteReplace, DiffKind::UpdateReplace]
        );
    }

    #[test]
    fn test_to_replace_preserves_input_diff() {
        let diff = PropertyDiff {
            kind: DiffKind::Delete,
            input_diff: true,
        };
        let replaced = diff.to_replace();
        assert_eq!(replaced.kind, DiffKind::DeleteReplace);
        assert!(replaced.input_diff);
    }

    #[test]
    fn test_kind_display_and_wire() {
        assert_eq!(DiffKind::UpdateReplace.to_string(), "update-replace");
        assert_eq!(DiffKind::try_from(3).ok(), Some(DiffKind::DeleteReplace));
        assert!(matches!(
            DiffKind::try_from(6),
            Err(DiffError::UnknownDiffKind { value: 6 })
        ));
        assert!(DiffKind::try_from(-1).is_err());
    }

    #[test]
    fn test_nil_diff_is_empty_map() {
        let mut out = detailed_diff_from_object_diff(None);
        assert!(out.is_empty());
        out.insert(String::from("x"), PropertyDiff::new(DiffKind::Add));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_empty_object_diff_is_empty_map() {
        let out = detailed_diff_from_object_diff(Some(&ObjectDiff::default()));
        assert!(out.is_empty());
    }

    #[test]
    fn test_top_level_adds_and_deletes() {
        let diff = ObjectDiff {
            adds: PropertyMap::new().with("tags", "x"),
            deletes: PropertyMap::new().with("region", "eu"),
            ..ObjectDiff::default()
        };

        let out = detailed_diff_from_object_diff(Some(&diff));

        assert_eq!(out.len(), 2);
        assert_eq!(out.get("tags"), Some(&PropertyDiff::new(DiffKind::Add)));
        assert_eq!(out.get("region"), Some(&PropertyDiff::new(DiffKind::Delete)));
    }

    #[test]
    fn test_updated_array_index_path() {
        let mut array = ArrayDiff::default();
        array.updates.insert(2, update("x", "y"));

        let mut diff = ObjectDiff::default();
        diff.updates.insert(
            String::from("a"),
            ValueDiff {
                old: PropertyValue::Array(vec![]),
                new: PropertyValue::Array(vec![]),
                object: None,
                array: Some(array),
            },
        );

        let out = detailed_diff_from_object_diff(Some(&diff));

        assert_eq!(out.len(), 1);
        assert_eq!(out.get("a[2]"), Some(&PropertyDiff::new(DiffKind::Update)));
    }

    #[test]
    fn test_array_delete_under_prefix() {
        let mut array = ArrayDiff::default();
        array.deletes.insert(0, PropertyValue::from("allow-all"));
        let mut diff = ObjectDiff::default();
        diff.updates.insert(
            String::from("rules"),
            ValueDiff {
                array: Some(array),
                ..ValueDiff::default()
            },
        );

        let out = detailed_diff_from_object_diff(Some(&diff));
        assert_eq!(out.get("rules[0]"), Some(&PropertyDiff::new(DiffKind::Delete)));
    }

    #[test]
    fn test_nested_object_in_array_path() {
        let olds = PropertyMap::new().with(
            "tags",
            PropertyValue::Array(vec![
                PropertyMap::new().with("name", "a").into(),
                PropertyMap::new().with("name", "b").into(),
            ]),
        );
        let news = PropertyMap::new().with(
            "tags",
            PropertyValue::Array(vec![
                PropertyMap::new().with("name", "a").into(),
                PropertyMap::new().with("name", "c").with("owner", "ops").into(),
            ]),
        );

        let out = detailed_diff_from_object_diff(olds.diff(&news).as_ref());

        assert_eq!(out.len(), 2);
        assert_eq!(out.get("tags[1].name"), Some(&PropertyDiff::new(DiffKind::Update)));
        assert_eq!(out.get("tags[1].owner"), Some(&PropertyDiff::new(DiffKind::Add)));
    }

    #[test]
    fn test_terminal_null_classification() {
        let mut array = ArrayDiff::default();
        array.updates.insert(
            0,
            ValueDiff {
                old: PropertyValue::Null,
                new: PropertyValue::from("x"),
                ..ValueDiff::default()
            },
        );
        array.updates.insert(
            1,
            ValueDiff {
                old: PropertyValue::from("x"),
                new: PropertyValue::Null,
                ..ValueDiff::default()
            },
        );
        let mut diff = ObjectDiff::default();
        diff.updates.insert(
            String::from("l"),
            ValueDiff {
                array: Some(array),
                ..ValueDiff::default()
            },
        );

        let out = detailed_diff_from_object_diff(Some(&diff));
        assert_eq!(out.get("l[0]").map(|d| d.kind), Some(DiffKind::Add));
        assert_eq!(out.get("l[1]").map(|d| d.kind), Some(DiffKind::Delete));
    }

    #[test]
    fn test_replace_from_either_view() {
        let mut result = DiffResult::none();
        assert!(!result.replace());

        result.replace_keys.push(String::from("size"));
        assert!(result.replace());

        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("size"), PropertyDiff::new(DiffKind::UpdateReplace));
        let result = DiffResult {
            changes: DiffChanges::Some,
            detailed_diff: detailed,
            ..DiffResult::default()
        };
        assert!(result.replace());
    }

    #[test]
    fn test_from_detailed_diff_derives_keys() {
        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("tags[0]"), PropertyDiff::new(DiffKind::Add));
        detailed.insert(String::from("tags[1]"), PropertyDiff::new(DiffKind::Delete));
        detailed.insert(String::from("size"), PropertyDiff::new(DiffKind::UpdateReplace));

        let result = DiffResult::from_detailed_diff(detailed, true);

        assert_eq!(result.changes, DiffChanges::Some);
        assert_eq!(result.changed_keys, vec!["size", "tags"]);
        assert_eq!(result.replace_keys, vec!["size"]);
        assert!(result.delete_before_replace);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_validate_detects_disagreement() {
        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("size"), PropertyDiff::new(DiffKind::Update));
        let result = DiffResult {
            changes: DiffChanges::Some,
            replace_keys: vec![String::from("size")],
            detailed_diff: detailed.clone(),
            ..DiffResult::default()
        };
        assert!(result.validate().is_err());

        detailed.insert(String::from("zone"), PropertyDiff::new(DiffKind::UpdateReplace));
        detailed.insert(String::from("size"), PropertyDiff::new(DiffKind::UpdateReplace));
        let result = DiffResult {
            changes: DiffChanges::Some,
            replace_keys: vec![String::from("size")],
            detailed_diff: detailed,
            ..DiffResult::default()
        };
        assert!(result.validate().is_err());

        let result = DiffResult {
            changes: DiffChanges::None,
            changed_keys: vec![String::from("size")],
            ..DiffResult::default()
        };
        assert!(result.validate().is_err());
    }

    #[test]
    fn test_validate_allows_coarse_only_results() {
        let result = DiffResult {
            changes: DiffChanges::Some,
            replace_keys: vec![String::from("size")],
            changed_keys: vec![String::from("size")],
            ..DiffResult::default()
        };
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_ignore_changes_removes_nested_paths() {
        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("tags"), PropertyDiff::new(DiffKind::Update));
        detailed.insert(String::from("tags.env"), PropertyDiff::new(DiffKind::Add));
        detailed.insert(String::from("tags[0]"), PropertyDiff::new(DiffKind::Add));
        detailed.insert(String::from("tagsx"), PropertyDiff::new(DiffKind::Add));
        let mut result = DiffResult::from_detailed_diff(detailed, false);

        result.apply_ignore_changes(&[String::from("tags")]);

        assert_eq!(result.detailed_diff.len(), 1);
        assert!(result.detailed_diff.contains_key("tagsx"));
        assert_eq!(result.changed_keys, vec!["tagsx"]);
        assert_eq!(result.changes, DiffChanges::Some);
    }

    #[test]
    fn test_ignore_everything_means_no_changes() {
        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("size"), PropertyDiff::new(DiffKind::UpdateReplace));
        let mut result = DiffResult::from_detailed_diff(detailed, false);

        result.apply_ignore_changes(&[String::from("size")]);

        assert_eq!(result.changes, DiffChanges::None);
        assert!(!result.replace());
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_ignore_nested_path_clears_coarse_keys() {
        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("tags.env"), PropertyDiff::new(DiffKind::UpdateReplace));
        let mut result = DiffResult::from_detailed_diff(detailed, false);

        result.apply_ignore_changes(&[String::from("tags.env")]);

        assert!(result.detailed_diff.is_empty());
        assert!(result.changed_keys.is_empty());
        assert!(result.replace_keys.is_empty());
        assert_eq!(result.changes, DiffChanges::None);
        assert!(!result.replace());
    }

    #[test]
    fn test_ignore_nested_path_keeps_sibling_changes() {
        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("tags.env"), PropertyDiff::new(DiffKind::UpdateReplace));
        detailed.insert(String::from("tags.team"), PropertyDiff::new(DiffKind::Update));
        let mut result = DiffResult::from_detailed_diff(detailed, false);

        result.apply_ignore_changes(&[String::from("tags.env")]);

        assert_eq!(result.changed_keys, vec!["tags"]);
        assert!(result.replace_keys.is_empty());
        assert_eq!(result.changes, DiffChanges::Some);
        assert!(!result.replace());
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_ignore_keeps_coarse_only_keys() {
        let mut result = DiffResult {
            changes: DiffChanges::Some,
            replace_keys: vec![String::from("zone")],
            changed_keys: vec![String::from("size"), String::from("zone")],
            ..DiffResult::default()
        };

        result.apply_ignore_changes(&[String::from("size"), String::from("zone.primary")]);

        assert_eq!(result.changed_keys, vec!["zone"]);
        assert_eq!(result.replace_keys, vec!["zone"]);
        assert!(result.replace());
    }

    #[test]
    fn test_mark_input_diff() {
        let mut detailed = DetailedDiff::new();
        detailed.insert(String::from("a"), PropertyDiff::new(DiffKind::Add));
        mark_input_diff(&mut detailed, true);
        assert!(detailed.values().all(|d| d.input_diff));
    }

    #[test]
    fn test_top_level_key() {
        assert_eq!(top_level_key("tags[2].name"), "tags");
        assert_eq!(top_level_key("a.b"), "a");
        assert_eq!(top_level_key("size"), "size");
    }
}
