// Excel import (xlsx, xls, xlsb, ods) into a header + rows table
//
// Every cell is read as text; the first row of the sheet is the header.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::dataset::Table;
use crate::error::DataError;

/// Read one sheet (`sheet = None` → first sheet).
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, DataError> {
    let read_err = |message: String| DataError::Read {
        path: path.display().to_string(),
        message,
    };

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| read_err(format!("failed to open Excel file: {e}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| DataError::SheetNotFound {
                sheet: wanted.to_string(),
                available: sheet_names.clone(),
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| read_err("Excel file contains no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| read_err(format!("failed to read sheet '{sheet_name}': {e}")))?;
    log::debug!("{}: sheet '{}' is {:?}", path.display(), sheet_name, range.get_size());

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let rows = rows.map(|r| r.iter().map(cell_to_string).collect()).collect();

    Ok(Table { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => format_number(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        // Date serials stay numeric; labels only need codes and text.
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Integers without decimals, so numeric barcodes keep their digits.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
