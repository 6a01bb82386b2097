use std::fmt;
use std::path::PathBuf;

/// Broad category of a [`DataError`], used by front-ends to pick an exit code
/// and decide how far the current action got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing file, unsupported format, unreadable content, missing columns.
    Input,
    /// Duplicate or empty stable keys.
    Keys,
    /// A join key or mapped column is absent from one of the sources.
    Join,
    /// Failure while writing labels or building the archive.
    Generation,
}

/// A stable key that appears on more than one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub key: String,
    /// 1-based data row numbers (header excluded).
    pub rows: Vec<usize>,
}

#[derive(Debug)]
pub enum DataError {
    NotFound(PathBuf),
    UnsupportedFormat(String),
    UnsupportedEncoding(String),
    Read { path: String, message: String },
    SheetNotFound { sheet: String, available: Vec<String> },
    MissingColumns { source: String, columns: Vec<String> },
    DuplicateKeys { field: String, duplicates: Vec<DuplicateKey> },
    EmptyKeys { field: String, rows: Vec<usize> },
    JoinColumn { source: String, column: String },
    Write { path: String, message: String },
    Archive(String),
}

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_)
            | Self::UnsupportedFormat(_)
            | Self::UnsupportedEncoding(_)
            | Self::Read { .. }
            | Self::SheetNotFound { .. }
            | Self::MissingColumns { .. } => ErrorKind::Input,
            Self::DuplicateKeys { .. } | Self::EmptyKeys { .. } => ErrorKind::Keys,
            Self::JoinColumn { .. } => ErrorKind::Join,
            Self::Write { .. } | Self::Archive(_) => ErrorKind::Generation,
        }
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Self::UnsupportedFormat(ext) => {
                write!(f, "unsupported data format '{ext}' (use .xlsx, .xls, .xlsb, .ods, .csv or .tsv)")
            }
            Self::UnsupportedEncoding(label) => write!(f, "unknown text encoding '{label}'"),
            Self::Read { path, message } => write!(f, "cannot read {path}: {message}"),
            Self::SheetNotFound { sheet, available } => {
                write!(f, "sheet '{sheet}' not found (available: {})", available.join(", "))
            }
            Self::MissingColumns { source, columns } => {
                write!(f, "{source}: missing required column(s): {}", columns.join(", "))
            }
            Self::DuplicateKeys { field, duplicates } => {
                writeln!(f, "{} duplicate '{field}' value(s):", duplicates.len())?;
                for dup in duplicates {
                    let rows: Vec<String> = dup.rows.iter().map(|r| r.to_string()).collect();
                    writeln!(f, "  {:?} on rows {}", dup.key, rows.join(", "))?;
                }
                Ok(())
            }
            Self::EmptyKeys { field, rows } => {
                let shown: Vec<String> = rows.iter().take(20).map(|r| r.to_string()).collect();
                write!(f, "{} row(s) without '{field}': {}", rows.len(), shown.join(", "))?;
                if rows.len() > 20 {
                    write!(f, ", ... and {} more", rows.len() - 20)?;
                }
                Ok(())
            }
            Self::JoinColumn { source, column } => {
                write!(f, "column '{column}' not found in {source}")
            }
            Self::Write { path, message } => write!(f, "cannot write {path}: {message}"),
            Self::Archive(msg) => write!(f, "archive error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {}
