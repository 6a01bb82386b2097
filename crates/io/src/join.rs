//! Two-file mode: attach the mapped column (barcodes) from a secondary file
//! to every primary record by a shared key.

use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::DataError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// Left join `primary` with `secondary` on `key`, copying `mapped` across.
///
/// When the secondary has several rows for one key the first wins. Rows
/// without a match keep their own `mapped` value if the primary has that
/// column, otherwise get `""`. A row counts as matched when its final
/// `mapped` value is non-empty.
pub fn join(
    mut primary: Dataset,
    secondary: &Dataset,
    key: &str,
    mapped: &str,
) -> Result<(Dataset, JoinStats), DataError> {
    if !primary.has_column(key) {
        return Err(DataError::JoinColumn {
            source: primary.source_label(),
            column: key.to_string(),
        });
    }
    for column in [key, mapped] {
        if !secondary.has_column(column) {
            return Err(DataError::JoinColumn {
                source: secondary.source_label(),
                column: column.to_string(),
            });
        }
    }

    let mut lookup: HashMap<&str, &str> = HashMap::with_capacity(secondary.len());
    let mut shadowed = 0usize;
    for record in &secondary.records {
        let k = record.value(key).trim();
        if k.is_empty() {
            continue;
        }
        if lookup.contains_key(k) {
            shadowed += 1;
        } else {
            lookup.insert(k, record.value(mapped).trim());
        }
    }
    if shadowed > 0 {
        log::warn!(
            "{}: {shadowed} row(s) repeat an earlier '{key}' and were ignored",
            secondary.source_label()
        );
    }

    let mut stats = JoinStats {
        total: primary.len(),
        ..JoinStats::default()
    };
    for record in &mut primary.records {
        let found = lookup.get(record.value(key).trim()).copied();
        let value = match found {
            Some(v) => v.to_string(),
            None => record.value(mapped).to_string(),
        };
        if value.trim().is_empty() {
            stats.unmatched += 1;
        } else {
            stats.matched += 1;
        }
        record.set(mapped, value);
    }

    if !primary.has_column(mapped) {
        primary.headers.push(mapped.to_string());
    }
    primary.sources.extend(secondary.sources.iter().cloned());

    log::info!(
        "join on '{key}': {} of {} row(s) matched",
        stats.matched,
        stats.total
    );
    Ok((primary, stats))
}
