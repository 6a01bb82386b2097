//! DYMO label templates: `{{Field}}` placeholders inside label XML.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use quick_xml::escape::partial_escape;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::dataset::Record;
use crate::error::DataError;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"))
}

/// Outcome of checking a template against the dataset's columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateReport {
    /// Distinct placeholder names in order of first appearance.
    pub placeholders: Vec<String>,
    pub columns: Vec<String>,
    /// Placeholders with no matching column, sorted.
    pub missing: Vec<String>,
    /// Columns no placeholder refers to, sorted.
    pub unused: Vec<String>,
    pub is_valid: bool,
}

/// Read a `.dymo` template as text.
pub fn read_template(path: &Path) -> Result<String, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| DataError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    // DYMO Connect writes UTF-8, sometimes with a BOM
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for caps in placeholder_re().captures_iter(template) {
        let name = &caps[1];
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
    names
}

/// Compare placeholders with the available columns. With no columns (empty
/// data) every placeholder is missing.
pub fn validate(template: &str, columns: &[String]) -> TemplateReport {
    let placeholders = extract_placeholders(template);
    let placeholder_set: BTreeSet<&str> = placeholders.iter().map(String::as_str).collect();
    let column_set: BTreeSet<&str> = columns.iter().map(String::as_str).collect();

    let missing: Vec<String> = placeholder_set
        .difference(&column_set)
        .map(|s| s.to_string())
        .collect();
    let unused: Vec<String> = column_set
        .difference(&placeholder_set)
        .map(|s| s.to_string())
        .collect();

    TemplateReport {
        is_valid: missing.is_empty(),
        placeholders,
        columns: columns.to_vec(),
        missing,
        unused,
    }
}

/// Substitute every placeholder whose field exists in `record` with the
/// XML-escaped value. Unknown placeholders are left as they are.
pub fn fill(template: &str, record: &Record) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| match record.get(&caps[1]) {
            Some(value) => partial_escape(value).into_owned(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
