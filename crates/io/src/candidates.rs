//! Candidate identifier sources: a spreadsheet column or a delimited text
//! file with a header row.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::atomic::AtomicFile;
use crate::error::IoError;

/// Header used by the synthetic generator and the usual candidate extracts.
pub const DEFAULT_CANDIDATE_COLUMN: &str = "ds_cnpj_usuf";

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Does the extension look like a workbook calamine can open?
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SPREADSHEET_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Load every non-empty value of `column`, as text, in file order.
///
/// Workbooks use `sheet` (or the first sheet); other files are read as
/// delimited text with the delimiter sniffed from the first lines.
pub fn load_candidates(path: &Path, column: &str, sheet: Option<&str>) -> Result<Vec<String>, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    if is_spreadsheet(path) {
        load_from_workbook(path, column, sheet)
    } else {
        load_from_text(path, column)
    }
}

fn load_from_workbook(path: &Path, column: &str, sheet: Option<&str>) -> Result<Vec<String>, IoError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IoError::spreadsheet(path, e))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IoError::spreadsheet(path, "workbook contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::spreadsheet(path, format!("sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| missing(path, column))?;
    let idx = header
        .iter()
        .position(|cell| cell_text(cell).trim() == column)
        .ok_or_else(|| missing(path, column))?;

    let mut values = Vec::new();
    for row in rows {
        if let Some(cell) = row.get(idx) {
            let text = cell_text(cell);
            if !text.trim().is_empty() {
                values.push(text);
            }
        }
    }
    Ok(values)
}

/// Render a cell as the text a user typed.
///
/// Whole numbers print without a fractional part or exponent, so a CNPJ
/// stored as a number comes back as its digits.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e16 => format!("{:.0}", f),
        other => other.to_string(),
    }
}

fn load_from_text(path: &Path, column: &str) -> Result<Vec<String>, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| csv_error(path, e))?;
    let idx = headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == column)
        .ok_or_else(|| missing(path, column))?;

    let mut values = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        if let Some(value) = record.get(idx) {
            if !value.trim().is_empty() {
                values.push(value.to_string());
            }
        }
    }
    Ok(values)
}

/// Write a one-column candidate file with a header row.
pub fn write_candidates<S: AsRef<str>>(path: &Path, column: &str, ids: &[S]) -> Result<(), IoError> {
    let file = AtomicFile::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record([column]).map_err(|e| csv_error(path, e))?;
    for id in ids {
        writer.write_record([id.as_ref()]).map_err(|e| csv_error(path, e))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| IoError::from_io(path, e.into_error()))?;
    file.commit()?;
    Ok(())
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// Single-column files produce one field for every candidate; they fall back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

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

        // Must produce >1 field on the header line to be viable
        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252).
fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path).map_err(|e| IoError::from_io(path, e))?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn missing(path: &Path, column: &str) -> IoError {
    IoError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
}

fn csv_error(path: &Path, err: csv::Error) -> IoError {
    IoError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
