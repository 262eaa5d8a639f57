//! Match export: one sheet (or CSV), header row plus one row per record.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use cnpj_core::CompanyRecord;

use crate::atomic::{write_atomic, AtomicFile};
use crate::error::IoError;

/// Excel's hard row limit, header included.
pub const XLSX_MAX_ROWS: usize = 1_048_576;

const SHEET_NAME: &str = "Sheet1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// Infer from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            _ => Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext,
            }),
        }
    }
}

/// Write `records` under a `headers` row. The destination only changes once
/// the whole file is ready.
pub fn export_matches(
    path: &Path,
    headers: [&str; 2],
    records: &[CompanyRecord],
) -> Result<ExportFormat, IoError> {
    let format = ExportFormat::from_path(path)?;
    match format {
        ExportFormat::Xlsx => export_xlsx(path, headers, records)?,
        ExportFormat::Csv => export_csv(path, headers, records)?,
    }
    log::debug!("exported {} rows to {}", records.len(), path.display());
    Ok(format)
}

fn export_xlsx(path: &Path, headers: [&str; 2], records: &[CompanyRecord]) -> Result<(), IoError> {
    if records.len() + 1 > XLSX_MAX_ROWS {
        return Err(IoError::TooManyRows {
            path: path.to_path_buf(),
            rows: records.len(),
            limit: XLSX_MAX_ROWS - 1,
        });
    }

    let xl = |e: rust_xlsxwriter::XlsxError| IoError::spreadsheet(path, e);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME).map_err(xl)?;

    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &bold)
            .map_err(xl)?;
    }

    // Every value is text: identifiers must not turn into numbers
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, &record.identifier).map_err(xl)?;
        worksheet.write_string(row, 1, &record.legal_name).map_err(xl)?;
    }

    worksheet.set_column_width(0, 18).map_err(xl)?;
    worksheet.set_column_width(1, 60).map_err(xl)?;

    let bytes = workbook.save_to_buffer().map_err(xl)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

fn export_csv(path: &Path, headers: [&str; 2], records: &[CompanyRecord]) -> Result<(), IoError> {
    let csv_err = |e: csv::Error| IoError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let file = AtomicFile::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(headers).map_err(csv_err)?;
    for record in records {
        writer
            .write_record([record.identifier.as_str(), record.legal_name.as_str()])
            .map_err(csv_err)?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| IoError::from_io(path, e.into_error()))?;
    file.commit()?;
    Ok(())
}
