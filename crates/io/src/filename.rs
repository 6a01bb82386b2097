//! Output file names from a `{Field}` pattern such as `{Code}_{Color}_{Size}.dymo`.

use std::sync::OnceLock;

use regex::Regex;

use crate::dataset::Record;

pub const DEFAULT_PATTERN: &str = "{Code}_{Color}_{Size}.dymo";

const MAX_FILENAME_CHARS: usize = 180;

/// Render `pattern` for one record and sanitize the result.
///
/// `{i}` is the 1-based `ordinal` unless the record has its own `i` field.
/// `{{` and `}}` are literal braces. A field the record lacks, or a malformed
/// pattern, yields `label_<ordinal>.dymo`.
pub fn build_filename(pattern: &str, record: &Record, ordinal: usize) -> String {
    let name = render(pattern, record, ordinal).unwrap_or_else(|| {
        log::debug!("filename pattern {pattern:?} not applicable to row {ordinal}");
        format!("label_{ordinal}.dymo")
    });
    sanitize(&name)
}

fn render(pattern: &str, record: &Record, ordinal: usize) -> Option<String> {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        '{' => return None,
                        ch => field.push(ch),
                    }
                }
                match record.get(&field) {
                    Some(value) => out.push_str(value),
                    None if field == "i" => out.push_str(&ordinal.to_string()),
                    None => return None,
                }
            }
            // stray closing brace
            '}' => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}

fn unsafe_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\-. ]+").expect("filename pattern is valid"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Make `name` safe as a file name inside an archive or directory.
pub fn sanitize(name: &str) -> String {
    let s = name.trim().replace(['/', '\\', ':'], "-");
    let s = unsafe_run_re().replace_all(&s, "-");
    let s = whitespace_re().replace_all(&s, "_");
    let s: String = s.chars().take(MAX_FILENAME_CHARS).collect();
    if s.is_empty() {
        "label".to_string()
    } else {
        s
    }
}
