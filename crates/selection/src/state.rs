//! Session-owned selection state and its transitions.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::SelectionError;
use crate::model::{Catalog, EditBuffer, Fingerprint, Overrides, Resolution};
use crate::reconcile::{bulk_set, commit, on_group_toggle, prune, purge_stale, resolve};

/// A user interaction reported back by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Group checkbox changed.
    ToggleGroup { group: String, selected: bool },
    /// "Select/deselect visible" (or "all" when nothing is filtered).
    SetVisible { keys: Vec<String>, selected: bool },
    /// Per-record checkbox changed; buffered until `ApplyEdits`.
    Edit { key: String, selected: bool },
    /// Commit the edit buffer into the overrides.
    ApplyEdits,
    /// Throw the edit buffer away.
    DiscardEdits,
}

/// How a dataset load related to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// First dataset of the session.
    Fresh,
    /// Different fingerprint: everything was cleared.
    Reset,
    /// Same fingerprint: state kept, stale overrides purged.
    Reloaded { purged: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub selected: usize,
    pub total: usize,
    pub groups: Vec<String>,
    pub overrides: usize,
    pub pending_edits: usize,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    fingerprint: Option<Fingerprint>,
    selected_groups: BTreeSet<String>,
    overrides: Overrides,
    edits: EditBuffer,
    version: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn selected_groups(&self) -> &BTreeSet<String> {
        &self.selected_groups
    }

    pub fn is_group_selected(&self, group: &str) -> bool {
        self.selected_groups.contains(group)
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn edits(&self) -> &EditBuffer {
        &self.edits
    }

    /// Bumped on every change of the baseline or the committed overrides.
    /// Never decreases, not even across a reset.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register a (re)loaded dataset. Must run before any resolution on it.
    pub fn load(&mut self, fingerprint: Fingerprint, catalog: &Catalog) -> LoadOutcome {
        let outcome = match &self.fingerprint {
            None => LoadOutcome::Fresh,
            Some(previous) if *previous != fingerprint => LoadOutcome::Reset,
            Some(_) => LoadOutcome::Reloaded { purged: 0 },
        };
        if outcome == LoadOutcome::Reset {
            log::info!(
                "new dataset {:?} ({} rows), resetting selection",
                fingerprint.sources,
                fingerprint.rows
            );
            self.reset();
        }
        self.fingerprint = Some(fingerprint);

        let purged = self.purge(catalog);
        match outcome {
            LoadOutcome::Reloaded { .. } => LoadOutcome::Reloaded { purged },
            other => other,
        }
    }

    /// Apply one interaction.
    pub fn apply(&mut self, event: SelectionEvent, catalog: &Catalog) -> Result<(), SelectionError> {
        match event {
            SelectionEvent::ToggleGroup { group, selected } => {
                if !catalog.has_group(&group) {
                    return Err(SelectionError::UnknownGroup(group));
                }
                let cleared = on_group_toggle(
                    &group,
                    selected,
                    &mut self.selected_groups,
                    &mut self.overrides,
                    catalog,
                );
                log::debug!("group {group:?} -> {selected}, cleared {cleared} override(s)");
                self.invalidate();
            }
            SelectionEvent::SetVisible { keys, selected } => {
                let count = bulk_set(keys.iter().map(String::as_str), selected, &mut self.overrides);
                log::debug!("set {count} visible record(s) -> {selected}");
                self.invalidate();
            }
            SelectionEvent::Edit { key, selected } => {
                if !catalog.contains_key(&key) {
                    return Err(SelectionError::UnknownKey(key));
                }
                self.edits.insert(key, selected);
            }
            SelectionEvent::ApplyEdits => {
                if !self.edits.is_empty() {
                    commit(&self.edits, &mut self.overrides, &self.selected_groups, catalog);
                    self.invalidate();
                }
            }
            SelectionEvent::DiscardEdits => self.edits.clear(),
        }
        Ok(())
    }

    /// Resolution including any pending manual edits.
    pub fn resolve(&self, catalog: &Catalog) -> Resolution {
        resolve(catalog, &self.selected_groups, &self.overrides, &self.edits)
    }

    /// Drop overrides that coincide with the baseline. Returns the number removed.
    pub fn finalize(&mut self, catalog: &Catalog) -> usize {
        prune(&mut self.overrides, &self.selected_groups, catalog)
    }

    /// One full pass: purge stale keys, resolve, then prune.
    ///
    /// The returned resolution is the same one a pass without the prune would
    /// produce.
    pub fn refresh(&mut self, catalog: &Catalog) -> Resolution {
        self.purge(catalog);
        let resolution = self.resolve(catalog);
        self.finalize(catalog);
        resolution
    }

    pub fn summary(&self, catalog: &Catalog) -> SelectionSummary {
        SelectionSummary {
            selected: self.resolve(catalog).selected_count(),
            total: catalog.len(),
            groups: self.selected_groups.iter().cloned().collect(),
            overrides: self.overrides.len(),
            pending_edits: self.edits.len(),
            version: self.version,
        }
    }

    fn purge(&mut self, catalog: &Catalog) -> usize {
        let purged = purge_stale(&mut self.overrides, catalog.keys());
        self.edits.retain(|key, _| catalog.contains_key(key));
        if !purged.is_empty() {
            log::debug!("purged {} stale override(s)", purged.len());
        }
        purged.len()
    }

    fn reset(&mut self) {
        self.selected_groups.clear();
        self.overrides.clear();
        self.invalidate();
    }

    /// Any transient edit refers to the old baseline once this runs.
    fn invalidate(&mut self) {
        self.version += 1;
        self.edits.clear();
    }
}
