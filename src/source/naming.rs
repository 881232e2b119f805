//! Turning header fields and file names into table and column names.

use std::collections::HashSet;
use std::path::Path;

/// Lower-case, collapse anything that is not ASCII alphanumeric into `_`,
/// and make sure the result does not start with a digit.
///
/// Returns `None` when nothing usable is left.
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        return None;
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    Some(out)
}

/// Normalize a header row into unique column names.
///
/// Empty fields become `col_<position>` (1-based); repeated names get a
/// `_<n>` suffix.
pub fn normalize_columns<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(fields.len());

    for (idx, field) in fields.iter().enumerate() {
        let base =
            normalize_identifier(field.as_ref()).unwrap_or_else(|| format!("col_{}", idx + 1));
        let mut name = base.clone();
        let mut suffix = 2;
        while !seen.insert(name.clone()) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        columns.push(name);
    }

    columns
}

/// Default table name for an input file: its normalized stem.
pub fn table_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(normalize_identifier)
}
