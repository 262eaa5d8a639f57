// File I/O: raw extracts in, Parquet in between, spreadsheets out

pub mod atomic;
pub mod candidates;
pub mod columnar;
pub mod error;
pub mod export;
pub mod raw;

pub use candidates::{load_candidates, write_candidates, DEFAULT_CANDIDATE_COLUMN};
pub use columnar::{columnar_file_name, is_combined_file, list_columnar_files, ColumnarReader, ColumnarWriter};
pub use error::IoError;
pub use export::{export_matches, ExportFormat};
pub use raw::{RawFormat, RawReader, RawRow, TextEncoding};
