use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single record as the engine sees it: its stable key and its group.
///
/// An empty key is treated the same as a missing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: Option<String>,
    pub group: Option<String>,
}

impl Item {
    pub fn new(key: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            group: Some(group.into()),
        }
    }

    /// A record that cannot be tracked individually.
    pub fn keyless(group: impl Into<String>) -> Self {
        Self {
            key: None,
            group: Some(group.into()),
        }
    }

    pub fn stable_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

/// Stored per-record deviations from the group baseline, keyed by stable key.
pub type Overrides = BTreeMap<String, bool>;

/// Manual edits from the current interaction, not yet committed to overrides.
pub type EditBuffer = BTreeMap<String, bool>;

/// The full record set for one dataset load, in dataset order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    by_key: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(items: Vec<Item>) -> Self {
        let mut by_key = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if let Some(key) = item.stable_key() {
                // Keys are validated unique upstream; keep the first on a slip.
                by_key.entry(key.to_string()).or_insert(idx);
            }
        }
        Self { items, by_key }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.by_key.get(key).map(|&idx| &self.items[idx])
    }

    /// Stable keys of every trackable record.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(Item::stable_key)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.items.iter().any(|item| item.group() == Some(group))
    }

    /// Stable keys of every trackable record in `group`.
    pub fn keys_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.items
            .iter()
            .filter(move |item| item.group() == Some(group))
            .filter_map(Item::stable_key)
    }
}

/// Identity of a loaded dataset: originating file name(s) plus row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub sources: Vec<String>,
    pub rows: usize,
}

impl Fingerprint {
    pub fn new<S: Into<String>>(sources: impl IntoIterator<Item = S>, rows: usize) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            rows,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Final per-record selection for one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// One flag per catalog item, in catalog order.
    pub flags: Vec<bool>,
    /// Stable key → selected. Keyless records are not listed here.
    pub by_key: BTreeMap<String, bool>,
}

impl Resolution {
    pub fn is_selected(&self, key: &str) -> Option<bool> {
        self.by_key.get(key).copied()
    }

    pub fn selected_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Catalog positions of selected records, in catalog order.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(idx, &f)| f.then_some(idx))
            .collect()
    }
}
