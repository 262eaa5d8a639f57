//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts that drive the pipeline rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args; emitted by clap)              |
//! | 3    | Config file unreadable, unparsable or invalid            |
//! | 4    | Input file or directory not found                        |
//! | 5    | Schema mismatch (field count, missing column)            |
//! | 6    | Text not decodable in the configured encoding            |
//! | 7    | Other read/write failure (disk, Parquet, workbook)       |
//! | 8    | Export rejected (unsupported format, too many rows)      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `pipeline_exit_code`

use cnpj_io::IoError;
use cnpj_pipeline::PipelineError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments. clap exits with this on its own.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Config cannot be read, parsed or validated; also impossible
/// `generate` requests.
pub const EXIT_CONFIG: u8 = 3;

/// Input directory, candidate file or columnar store missing.
pub const EXIT_NOT_FOUND: u8 = 4;

/// A raw row with the wrong field count, or a columnar file without the
/// configured identifier/name column.
pub const EXIT_SCHEMA: u8 = 5;

/// Raw text not valid in `ingest.encoding`.
pub const EXIT_ENCODING: u8 = 6;

/// Any other IO failure.
pub const EXIT_IO: u8 = 7;

/// Export path has an unknown extension or the result does not fit.
pub const EXIT_EXPORT: u8 = 8;

/// Map a pipeline error to its exit code.
pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::ConfigParse(_) | PipelineError::ConfigValidation(_) => EXIT_CONFIG,
        PipelineError::Generate(_) => EXIT_CONFIG,
        PipelineError::MissingDirectory(_) => EXIT_NOT_FOUND,
        PipelineError::Io(io) => match io {
            IoError::NotFound(_) => EXIT_NOT_FOUND,
            IoError::FieldCount { .. } | IoError::MissingColumn { .. } => EXIT_SCHEMA,
            IoError::Encoding { .. } => EXIT_ENCODING,
            IoError::UnsupportedFormat { .. } | IoError::TooManyRows { .. } => EXIT_EXPORT,
            IoError::Io { .. } | IoError::Parquet { .. } | IoError::Spreadsheet { .. } => EXIT_IO,
        },
    }
}
