// CSV/TSV import into a header + rows table

use std::path::Path;

use crate::dataset::Table;
use crate::error::DataError;

/// Read a delimited text file. `delimiter = None` sniffs it; `encoding = None`
/// means UTF-8 with a Windows-1252 fallback.
pub fn read_table(path: &Path, delimiter: Option<u8>, encoding: Option<&str>) -> Result<Table, DataError> {
    let content = read_file_decoded(path, encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    log::debug!("{}: delimiter {:?}", path.display(), delimiter as char);
    parse_table(&content, delimiter).map_err(|message| DataError::Read {
        path: path.display().to_string(),
        message,
    })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        // More consistent lines wins; more columns breaks ties
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read a file as text. With no explicit encoding, UTF-8 is tried first and
/// Windows-1252 (common for Excel-exported CSVs) is the fallback.
pub fn read_file_decoded(path: &Path, encoding: Option<&str>) -> Result<String, DataError> {
    let bytes = std::fs::read(path).map_err(|e| DataError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let label = encoding.map(str::trim).filter(|l| !l.is_empty());
    let explicit = match label {
        Some(l) => Some(
            encoding_rs::Encoding::for_label(l.as_bytes())
                .ok_or_else(|| DataError::UnsupportedEncoding(l.to_string()))?,
        ),
        None => None,
    };

    match explicit {
        Some(enc) if enc != encoding_rs::UTF_8 => {
            let (decoded, _, had_errors) = enc.decode(&bytes);
            if had_errors {
                log::warn!("{}: invalid {} sequences replaced", path.display(), enc.name());
            }
            Ok(decoded.into_owned())
        }
        _ => match String::from_utf8(bytes) {
            Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
            Err(e) => {
                log::warn!("{}: not valid UTF-8, decoding as Windows-1252", path.display());
                let bytes = e.into_bytes();
                let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
                Ok(decoded.into_owned())
            }
        },
    }
}

/// Parse delimited text whose first record is the header row.
pub fn parse_table(content: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("line {}: {}", idx + 2, e))?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Code;Desc;Group\nA1;Hat;HATS\nA2;Sock;SOCKS\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Code,Desc,Group\nA1,Hat,HATS\nA2,Sock,SOCKS\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Code\tDesc\tGroup\nA1\tHat\tHATS\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Code;Desc;Group\nA1;\"Hat, wool\";HATS\nA2;\"Sock\";SOCKS\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_parse_short_rows_are_kept() {
        let table = parse_table("Code,Desc,Group\nA1,Hat\n", b',').unwrap();
        assert_eq!(table.headers, vec!["Code", "Desc", "Group"]);
        assert_eq!(table.rows, vec![vec!["A1".to_string(), "Hat".to_string()]]);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Maglia blù" with 0xF9 for ù
        fs::write(&path, b"Code,Desc\nA1,Maglia bl\xf9\n").unwrap();

        let table = read_table(&path, None, None).unwrap();
        assert_eq!(table.rows[0][1], "Maglia blù");
    }

    #[test]
    fn test_explicit_encoding_label() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        fs::write(&path, b"Code;Desc\nA1;Caf\xe9\n").unwrap();

        let table = read_table(&path, Some(b';'), Some("latin1")).unwrap();
        assert_eq!(table.rows[0][1], "Café");
    }

    #[test]
    fn test_unknown_encoding_label() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "Code\nA1\n").unwrap();

        let err = read_table(&path, None, Some("klingon")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedEncoding(_)));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Code,Desc\nA1,Hat\n").unwrap();

        let table = read_table(&path, None, None).unwrap();
        assert_eq!(table.headers[0], "Code");
    }
}
