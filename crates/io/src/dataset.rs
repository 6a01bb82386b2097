//! Record Store: tabular rows exposed as keyed product records.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use labelgen_selection::{Catalog, Fingerprint, Item};

use crate::error::{DataError, DuplicateKey};

/// Default stable key column.
pub const KEY_FIELD: &str = "Barcode";
/// Stable key column used when the preferred key column is absent.
pub const FALLBACK_KEY_FIELD: &str = "Code";
pub const GROUP_FIELD: &str = "Group";
/// Columns matched by [`Dataset::search`].
pub const SEARCH_FIELDS: &[&str] = &["Code", "Desc"];

/// Required columns when everything comes from one file, besides the
/// stable key column.
pub const SINGLE_FILE_COLUMNS: &[&str] = &["Code", "Desc", "Color", "Size", "Group"];
/// Required columns of the product file in two-file mode, besides the
/// join key, which the join itself checks on both files.
pub const PRODUCT_COLUMNS: &[&str] = &["Desc", "Color", "Size", "Group"];

/// Raw header + rows as read from a file, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Where and how to read one data file.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Excel sheet name; first sheet when `None`.
    pub sheet: Option<String>,
    /// CSV delimiter; sniffed when `None`.
    pub separator: Option<u8>,
    /// CSV encoding label (e.g. `utf-8`, `latin1`); UTF-8 when `None`.
    pub encoding: Option<String>,
}

/// One product row. Missing cells read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: HashMap<String, String>,
}

impl Record {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Field value, `""` when the field does not exist.
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.values
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Originating file name(s), in load order.
    pub sources: Vec<String>,
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    /// Preferred stable key column; see [`Dataset::key_field`].
    key_field: String,
}

impl Dataset {
    /// Build records from a raw table. Rows whose cells are all empty are
    /// skipped; short rows are padded with empty values.
    pub fn from_table(source: impl Into<String>, table: Table) -> Self {
        let source = source.into();
        let mut headers: Vec<String> = Vec::with_capacity(table.headers.len());
        for h in table.headers {
            let h = h.trim().to_string();
            if headers.contains(&h) {
                log::warn!("{source}: duplicate column '{h}', keeping the first one");
            }
            headers.push(h);
        }

        let mut records = Vec::with_capacity(table.rows.len());
        for row in table.rows {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            let mut values = HashMap::with_capacity(headers.len());
            for (idx, header) in headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let cell = row.get(idx).cloned().unwrap_or_default();
                values.entry(header.clone()).or_insert(cell);
            }
            records.push(Record::new(values));
        }

        let mut unique_headers = Vec::with_capacity(headers.len());
        for h in headers {
            if !h.is_empty() && !unique_headers.contains(&h) {
                unique_headers.push(h);
            }
        }

        Self {
            sources: vec![source],
            headers: unique_headers,
            records,
            key_field: KEY_FIELD.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Display name for error messages: the joined source names.
    pub fn source_label(&self) -> String {
        self.sources.join(" + ")
    }

    /// Prefer `field` as the stable key column (the configured mapped field).
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    /// The column holding the stable key: the preferred column (`Barcode`
    /// unless configured otherwise) when present, else `Code`.
    pub fn key_field(&self) -> &str {
        let preferred = if self.key_field.is_empty() {
            KEY_FIELD
        } else {
            self.key_field.as_str()
        };
        if self.has_column(preferred) {
            preferred
        } else {
            FALLBACK_KEY_FIELD
        }
    }

    /// Stable key of a record, `None` when empty.
    pub fn key_of<'a>(&self, record: &'a Record) -> Option<&'a str> {
        let key = record.value(self.key_field()).trim();
        (!key.is_empty()).then_some(key)
    }

    /// Identity of this load: source names plus row count.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.sources.iter().cloned(), self.records.len())
    }

    /// The selection engine's view of the records, in dataset order.
    pub fn catalog(&self) -> Catalog {
        let items = self
            .records
            .iter()
            .map(|r| Item {
                key: self.key_of(r).map(str::to_string),
                group: r.get(GROUP_FIELD).map(str::to_string),
            })
            .collect();
        Catalog::new(items)
    }

    /// Keep only the first `limit` records.
    pub fn truncate(&mut self, limit: usize) {
        self.records.truncate(limit);
    }

    /// Fail listing every required column that is absent.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), DataError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::MissingColumns {
                source: self.source_label(),
                columns: missing,
            })
        }
    }

    /// Stable keys must exist, be unique and be non-empty.
    ///
    /// Duplicates are reported first, each with every row it appears on;
    /// then rows with an empty key.
    pub fn validate_keys(&self) -> Result<(), DataError> {
        let field = self.key_field();
        self.require_columns(&[field])?;

        let mut rows_by_key: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut empty = Vec::new();
        for (idx, record) in self.records.iter().enumerate() {
            match self.key_of(record) {
                Some(key) => rows_by_key.entry(key).or_default().push(idx + 1),
                None => empty.push(idx + 1),
            }
        }

        let duplicates: Vec<DuplicateKey> = rows_by_key
            .into_iter()
            .filter(|(_, rows)| rows.len() > 1)
            .map(|(key, rows)| DuplicateKey {
                key: key.to_string(),
                rows,
            })
            .collect();

        if !duplicates.is_empty() {
            return Err(DataError::DuplicateKeys {
                field: field.to_string(),
                duplicates,
            });
        }
        if !empty.is_empty() {
            return Err(DataError::EmptyKeys {
                field: field.to_string(),
                rows: empty,
            });
        }
        Ok(())
    }

    /// Groups with their record counts, largest first, then by name.
    pub fn group_counts(&self) -> Vec<(String, usize)> {
        if !self.has_column(GROUP_FIELD) {
            return Vec::new();
        }
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            *counts.entry(record.value(GROUP_FIELD)).or_default() += 1;
        }
        let mut counts: Vec<(String, usize)> =
            counts.into_iter().map(|(g, n)| (g.to_string(), n)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Indices of records whose `Code` or `Desc` contains `query`
    /// (case-insensitive, literal). An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<usize> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return (0..self.records.len()).collect();
        }
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                SEARCH_FIELDS
                    .iter()
                    .any(|f| r.value(f).to_lowercase().contains(&needle))
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Load a `.csv`/`.tsv` or Excel file into a dataset.
pub fn load(path: &Path, options: &SourceOptions) -> Result<Dataset, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" => crate::csv::read_table(path, options.separator, options.encoding.as_deref())?,
        "tsv" => crate::csv::read_table(path, Some(options.separator.unwrap_or(b'\t')), options.encoding.as_deref())?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => crate::xlsx::read_table(path, options.sheet.as_deref())?,
        other => {
            return Err(DataError::UnsupportedFormat(if other.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{other}")
            }))
        }
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let dataset = Dataset::from_table(name, table);
    log::info!(
        "loaded {} record(s) with {} column(s) from {}",
        dataset.len(),
        dataset.headers.len(),
        path.display()
    );
    Ok(dataset)
}
