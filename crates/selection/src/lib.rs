//! `labelgen-selection` — selection-state reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded items (stable key + group), returns
//! resolved per-item selections. No CLI or IO dependencies.
//!
//! Precedence, lowest to highest: group baseline → stored override →
//! uncommitted manual edit.

pub mod error;
pub mod model;
pub mod reconcile;
pub mod state;

pub use error::SelectionError;
pub use model::{Catalog, EditBuffer, Fingerprint, Item, Overrides, Resolution};
pub use reconcile::{bulk_set, commit, diff_edits, on_group_toggle, prune, purge_stale, resolve};
pub use state::{LoadOutcome, SelectionEvent, SelectionState, SelectionSummary};
