use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum IoError {
    /// Input file or directory does not exist.
    NotFound(PathBuf),
    /// Any other filesystem failure (permissions, disk full, ...).
    Io { path: PathBuf, message: String },
    /// Field bytes that do not decode with the configured encoding.
    Encoding { path: PathBuf, line: u64, encoding: &'static str },
    /// Row with a different number of fields than the fixed schema.
    FieldCount { path: PathBuf, line: u64, expected: usize, found: usize },
    /// Required column absent from a header or columnar schema.
    MissingColumn { path: PathBuf, column: String },
    /// Parquet/Arrow read or write failure.
    Parquet { path: PathBuf, message: String },
    /// Spreadsheet read or write failure.
    Spreadsheet { path: PathBuf, message: String },
    /// Export extension we cannot write.
    UnsupportedFormat { path: PathBuf, extension: String },
    /// More rows than the target format can hold.
    TooManyRows { path: PathBuf, rows: usize, limit: usize },
}

impl IoError {
    /// Map a `std::io::Error`, keeping "not found" distinct.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io { path: path.to_path_buf(), message: err.to_string() }
        }
    }

    pub fn parquet(path: &Path, err: impl fmt::Display) -> Self {
        Self::Parquet { path: path.to_path_buf(), message: err.to_string() }
    }

    pub fn spreadsheet(path: &Path, err: impl fmt::Display) -> Self {
        Self::Spreadsheet { path: path.to_path_buf(), message: err.to_string() }
    }

    /// File the error is about.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) => path,
            Self::Io { path, .. }
            | Self::Encoding { path, .. }
            | Self::FieldCount { path, .. }
            | Self::MissingColumn { path, .. }
            | Self::Parquet { path, .. }
            | Self::Spreadsheet { path, .. }
            | Self::UnsupportedFormat { path, .. }
            | Self::TooManyRows { path, .. } => path,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "{}: not found", path.display()),
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Encoding { path, line, encoding } => {
                write!(f, "{}: line {line}: invalid {encoding} text", path.display())
            }
            Self::FieldCount { path, line, expected, found } => write!(
                f,
                "{}: line {line}: expected {expected} fields, found {found}",
                path.display()
            ),
            Self::MissingColumn { path, column } => {
                write!(f, "{}: missing column '{column}'", path.display())
            }
            Self::Parquet { path, message } => {
                write!(f, "{}: parquet error: {message}", path.display())
            }
            Self::Spreadsheet { path, message } => {
                write!(f, "{}: spreadsheet error: {message}", path.display())
            }
            Self::UnsupportedFormat { path, extension } => write!(
                f,
                "{}: unsupported export format '{extension}' (expected xlsx or csv)",
                path.display()
            ),
            Self::TooManyRows { path, rows, limit } => write!(
                f,
                "{}: {rows} rows exceed the format limit of {limit}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for IoError {}
