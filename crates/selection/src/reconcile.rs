//! Reconciliation primitives over explicit state.
//!
//! Every function here is deterministic and works on stable keys only; row
//! positions never enter the bookkeeping.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{Catalog, EditBuffer, Item, Overrides, Resolution};

/// Selection implied purely by group membership.
pub fn baseline(item: &Item, selected_groups: &BTreeSet<String>) -> bool {
    item.group().is_some_and(|g| selected_groups.contains(g))
}

/// Resolve the final selection for every record in the catalog.
///
/// manual edit > override > group baseline. Keyless records only ever get
/// their baseline.
pub fn resolve(
    catalog: &Catalog,
    selected_groups: &BTreeSet<String>,
    overrides: &Overrides,
    edits: &EditBuffer,
) -> Resolution {
    let mut flags = Vec::with_capacity(catalog.len());
    let mut by_key = BTreeMap::new();

    for item in catalog.items() {
        let mut selected = baseline(item, selected_groups);
        if let Some(key) = item.stable_key() {
            if let Some(&v) = overrides.get(key) {
                selected = v;
            }
            if let Some(&v) = edits.get(key) {
                selected = v;
            }
            by_key.entry(key.to_string()).or_insert(selected);
        }
        flags.push(selected);
    }

    Resolution { flags, by_key }
}

/// Drop every override that equals its record's baseline. Returns the number
/// of entries removed.
///
/// Entries for keys missing from the catalog are left for [`purge_stale`].
pub fn prune(overrides: &mut Overrides, selected_groups: &BTreeSet<String>, catalog: &Catalog) -> usize {
    let before = overrides.len();
    overrides.retain(|key, value| match catalog.get(key) {
        Some(item) => *value != baseline(item, selected_groups),
        None => true,
    });
    before - overrides.len()
}

/// Fold manual edits into the overrides, then prune.
///
/// The order matters: an edit that restates the baseline must still replace a
/// previous contrary override before the prune removes it.
pub fn commit(
    edits: &EditBuffer,
    overrides: &mut Overrides,
    selected_groups: &BTreeSet<String>,
    catalog: &Catalog,
) -> usize {
    let mut applied = 0;
    for (key, &value) in edits {
        if catalog.contains_key(key) {
            overrides.insert(key.clone(), value);
            applied += 1;
        } else {
            log::debug!("dropping edit for unknown key {key:?}");
        }
    }
    let pruned = prune(overrides, selected_groups, catalog);
    log::debug!("committed {applied} edit(s), pruned {pruned} override(s)");
    applied
}

/// Select or deselect a whole group and forget every per-record exception
/// inside it. Returns the number of overrides cleared.
pub fn on_group_toggle(
    group: &str,
    selected: bool,
    selected_groups: &mut BTreeSet<String>,
    overrides: &mut Overrides,
    catalog: &Catalog,
) -> usize {
    if selected {
        selected_groups.insert(group.to_string());
    } else {
        selected_groups.remove(group);
    }

    let mut cleared = 0;
    for key in catalog.keys_in_group(group) {
        if overrides.remove(key).is_some() {
            cleared += 1;
        }
    }
    cleared
}

/// Force every visible key to `value`. No pruning happens here.
pub fn bulk_set<'a>(
    visible_keys: impl IntoIterator<Item = &'a str>,
    value: bool,
    overrides: &mut Overrides,
) -> usize {
    let mut count = 0;
    for key in visible_keys {
        overrides.insert(key.to_string(), value);
        count += 1;
    }
    count
}

/// Remove every override whose key is not in `valid_keys`. Returns the purged
/// keys.
pub fn purge_stale<'a>(
    overrides: &mut Overrides,
    valid_keys: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let valid: HashSet<&str> = valid_keys.into_iter().collect();
    let stale: Vec<String> = overrides
        .keys()
        .filter(|k| !valid.contains(k.as_str()))
        .cloned()
        .collect();
    for key in &stale {
        overrides.remove(key);
    }
    stale
}

/// Manual edits between two renderings of the visible subset.
///
/// Both views are matched by stable key, so sorting or filtering between the
/// two never mis-attributes a change. Keys present in only one view and
/// keyless rows are ignored.
pub fn diff_edits<'a>(
    before: impl IntoIterator<Item = (Option<&'a str>, bool)>,
    after: impl IntoIterator<Item = (Option<&'a str>, bool)>,
) -> EditBuffer {
    let before: BTreeMap<&str, bool> = before
        .into_iter()
        .filter_map(|(k, v)| k.filter(|k| !k.is_empty()).map(|k| (k, v)))
        .collect();

    let mut edits = EditBuffer::new();
    for (key, value) in after {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            continue;
        };
        if let Some(&old) = before.get(key) {
            if old != value {
                edits.insert(key.to_string(), value);
            }
        }
    }
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn scenario() -> Catalog {
        Catalog::new(vec![
            Item::new("key1", "X"),
            Item::new("key2", "X"),
            Item::new("key3", "Y"),
        ])
    }

    #[test]
    fn group_select_then_manual_deselect() {
        let catalog = scenario();
        let mut selected = BTreeSet::new();
        let mut overrides = Overrides::new();

        on_group_toggle("X", true, &mut selected, &mut overrides, &catalog);
        let r = resolve(&catalog, &selected, &overrides, &EditBuffer::new());
        assert_eq!(r.selected_count(), 2);

        let mut edits = EditBuffer::new();
        edits.insert("key1".into(), false);
        commit(&edits, &mut overrides, &selected, &catalog);

        assert_eq!(overrides, Overrides::from([("key1".to_string(), false)]));
        let r = resolve(&catalog, &selected, &overrides, &EditBuffer::new());
        assert_eq!(r.is_selected("key1"), Some(false));
        assert_eq!(r.is_selected("key2"), Some(true));
        assert_eq!(r.is_selected("key3"), Some(false));
    }

    #[test]
    fn manual_edit_beats_override() {
        let catalog = scenario();
        let overrides = Overrides::from([("key3".to_string(), true)]);
        let edits = EditBuffer::from([("key3".to_string(), false)]);
        let r = resolve(&catalog, &BTreeSet::new(), &overrides, &edits);
        assert_eq!(r.is_selected("key3"), Some(false));
    }

    #[test]
    fn commit_applies_before_pruning() {
        let catalog = scenario();
        let selected = groups(&["X"]);
        // Stored exception says deselected; the user re-selects it.
        let mut overrides = Overrides::from([("key1".to_string(), false)]);
        let edits = EditBuffer::from([("key1".to_string(), true)]);

        commit(&edits, &mut overrides, &selected, &catalog);
        assert!(overrides.is_empty(), "re-selection matches baseline and must be pruned");

        let r = resolve(&catalog, &selected, &overrides, &EditBuffer::new());
        assert_eq!(r.is_selected("key1"), Some(true));
    }

    #[test]
    fn commit_ignores_unknown_keys() {
        let catalog = scenario();
        let mut overrides = Overrides::new();
        let edits = EditBuffer::from([("ghost".to_string(), true)]);
        assert_eq!(commit(&edits, &mut overrides, &BTreeSet::new(), &catalog), 0);
        assert!(overrides.is_empty());
    }

    #[test]
    fn group_toggle_clears_only_that_group() {
        let catalog = scenario();
        let mut selected = BTreeSet::new();
        let mut overrides = Overrides::from([
            ("key1".to_string(), true),
            ("key3".to_string(), true),
        ]);

        let cleared = on_group_toggle("X", false, &mut selected, &mut overrides, &catalog);
        assert_eq!(cleared, 1);
        assert_eq!(overrides, Overrides::from([("key3".to_string(), true)]));
    }

    #[test]
    fn bulk_set_does_not_prune() {
        let catalog = scenario();
        let selected = groups(&["X"]);
        let mut overrides = Overrides::new();

        bulk_set(["key1", "key2"], true, &mut overrides);
        assert_eq!(overrides.len(), 2);

        let r = resolve(&catalog, &selected, &overrides, &EditBuffer::new());
        assert_eq!(r.selected_count(), 2);

        // The next prune pass removes the redundant entries without changing the result.
        assert_eq!(prune(&mut overrides, &selected, &catalog), 2);
        let after = resolve(&catalog, &selected, &overrides, &EditBuffer::new());
        assert_eq!(r, after);
    }

    #[test]
    fn purge_drops_missing_keys() {
        let mut overrides = Overrides::from([
            ("a".to_string(), true),
            ("gone".to_string(), false),
        ]);
        let purged = purge_stale(&mut overrides, ["a", "b"]);
        assert_eq!(purged, vec!["gone".to_string()]);
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn keyless_records_get_baseline_only() {
        let catalog = Catalog::new(vec![Item::keyless("X"), Item::new("k", "X")]);
        let overrides = Overrides::from([("k".to_string(), false)]);
        let r = resolve(&catalog, &groups(&["X"]), &overrides, &EditBuffer::new());
        assert_eq!(r.flags, vec![true, false]);
        assert_eq!(r.by_key.len(), 1);
    }

    #[test]
    fn diff_is_keyed_not_positional() {
        // Same rows, but the "after" view was re-sorted.
        let before = [(Some("a"), false), (Some("b"), true), (Some("c"), false)];
        let after = [(Some("c"), true), (Some("b"), true), (Some("a"), false)];
        let edits = diff_edits(before, after);
        assert_eq!(edits, EditBuffer::from([("c".to_string(), true)]));
    }

    #[test]
    fn diff_ignores_keyless_and_new_rows() {
        let before = [(None, false), (Some("a"), false)];
        let after = [(None, true), (Some("a"), false), (Some("z"), true)];
        assert!(diff_edits(before, after).is_empty());
    }
}
