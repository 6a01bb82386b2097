//! Loading the product data in either input mode.

use std::path::PathBuf;

use crate::dataset::{self, Dataset, SourceOptions, PRODUCT_COLUMNS, SINGLE_FILE_COLUMNS};
use crate::error::DataError;
use crate::join::{join, JoinStats};

/// One product file, or a product file plus an EAN mapping file.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub data: PathBuf,
    pub ean: Option<PathBuf>,
    pub options: SourceOptions,
    /// Column shared by both files in two-file mode.
    pub join_key: String,
    /// Column copied from the EAN file.
    pub mapped_field: String,
    /// Require the product columns and valid stable keys. Off for batch
    /// generation, where every row is labelled and only the template
    /// decides which columns matter.
    pub strict: bool,
}

impl InputSpec {
    pub fn single(data: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            ean: None,
            options: SourceOptions::default(),
            join_key: "Code".to_string(),
            mapped_field: dataset::KEY_FIELD.to_string(),
            strict: true,
        }
    }

    pub fn with_ean(mut self, ean: impl Into<PathBuf>) -> Self {
        self.ean = Some(ean.into());
        self
    }
}

/// Products ready for selection, with join statistics in two-file mode.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub dataset: Dataset,
    pub join: Option<JoinStats>,
}

impl LoadedInput {
    /// Stable keys must be unique and non-empty. An empty dataset passes.
    pub fn validate_keys(&self) -> Result<(), DataError> {
        if self.dataset.is_empty() {
            return Ok(());
        }
        self.dataset.validate_keys()
    }
}

/// Load, check required columns and join if needed. Stable keys are not
/// validated, so callers can report the join before [`LoadedInput::validate_keys`].
///
/// The join key and mapped column are checked by the join on both files.
/// Non-strict loads skip the column checks on the product data.
pub fn load_joined(spec: &InputSpec) -> Result<LoadedInput, DataError> {
    let primary = dataset::load(&spec.data, &spec.options)?;

    let (dataset, join_stats) = match &spec.ean {
        None => {
            if spec.strict {
                let mut required: Vec<&str> = SINGLE_FILE_COLUMNS.to_vec();
                required.push(spec.mapped_field.as_str());
                primary.require_columns(&required)?;
            }
            (primary, None)
        }
        Some(ean_path) => {
            if spec.strict {
                primary.require_columns(PRODUCT_COLUMNS)?;
            }
            // the EAN file is nearly always a plain sheet, sheet selection applies to the product file only
            let ean_options = SourceOptions {
                sheet: None,
                ..spec.options.clone()
            };
            let ean = dataset::load(ean_path, &ean_options)?;
            let (joined, stats) = join(primary, &ean, &spec.join_key, &spec.mapped_field)?;
            (joined, Some(stats))
        }
    };

    Ok(LoadedInput {
        dataset: dataset.with_key_field(&spec.mapped_field),
        join: join_stats,
    })
}

/// [`load_joined`], then validate stable keys when strict.
///
/// Keys are validated before anything is returned so that no selection work
/// starts on a dataset with duplicate or empty keys.
pub fn load_input(spec: &InputSpec) -> Result<LoadedInput, DataError> {
    let loaded = load_joined(spec)?;
    if spec.strict {
        loaded.validate_keys()?;
    }
    Ok(loaded)
}
