//! Label generation and packaging: one filled template per record, written
//! either to a directory or into an in-memory zip.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::dataset::Record;
use crate::error::DataError;
use crate::filename::build_filename;
use crate::template::fill;

/// One generated label file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub filename: String,
    pub content: String,
}

/// Fill `template` for each record (up to `limit`) and name the results.
/// A limit of 0 means no limit.
///
/// Ordinals for `{i}` are 1-based positions in `records`. Names that collide
/// get `_2`, `_3`, ... before the extension.
pub fn generate_labels<'a>(
    template: &str,
    records: impl IntoIterator<Item = &'a Record>,
    pattern: &str,
    limit: Option<usize>,
) -> Vec<Label> {
    let limit = limit.filter(|&n| n > 0).unwrap_or(usize::MAX);
    let mut labels = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();

    for (idx, record) in records.into_iter().take(limit).enumerate() {
        let name = build_filename(pattern, record, idx + 1);
        let filename = unique_name(&name, &taken);
        if filename != name {
            log::debug!("filename {name} already used, writing {filename}");
        }
        taken.insert(filename.clone());
        labels.push(Label {
            filename,
            content: fill(template, record),
        });
    }
    labels
}

fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    (2..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Name of the download archive for `count` labels.
pub fn archive_name(count: usize) -> String {
    format!("dymo_labels_{count}.zip")
}

/// Build a deflate-compressed zip of all labels in memory.
pub fn package(labels: &[Label]) -> Result<Vec<u8>, DataError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for label in labels {
        zip.start_file(label.filename.as_str(), options)
            .map_err(|e| DataError::Archive(format!("{}: {e}", label.filename)))?;
        zip.write_all(label.content.as_bytes())
            .map_err(|e| DataError::Archive(format!("{}: {e}", label.filename)))?;
    }

    let cursor = zip.finish().map_err(|e| DataError::Archive(e.to_string()))?;
    let bytes = cursor.into_inner();
    log::info!("packaged {} label(s) into {} bytes", labels.len(), bytes.len());
    Ok(bytes)
}

/// Write each label as its own file under `out_dir`, creating it if needed.
pub fn write_labels(out_dir: &Path, labels: &[Label]) -> Result<Vec<PathBuf>, DataError> {
    std::fs::create_dir_all(out_dir).map_err(|e| DataError::Write {
        path: out_dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut written = Vec::with_capacity(labels.len());
    for label in labels {
        let path = out_dir.join(&label.filename);
        std::fs::write(&path, label.content.as_bytes()).map_err(|e| DataError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        written.push(path);
    }
    Ok(written)
}
