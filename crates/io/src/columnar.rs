//! Parquet store for projected registry rows.
//!
//! Every column is nullable UTF-8 text; identifiers are never typed as
//! numbers so leading zeros survive. Empty source fields are stored as nulls.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::builder::StringBuilder;
use arrow_array::{Array, ArrayRef, LargeStringArray, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema as ArrowSchema, SchemaRef};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::Compression;
use parquet::file::metadata::{FileMetaData, KeyValue};
use parquet::file::properties::WriterProperties;

use cnpj_core::CompanyRecord;

use crate::atomic::AtomicFile;
use crate::error::IoError;

/// Rows buffered per record batch, on write and on read.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

pub const COLUMNAR_EXTENSION: &str = "parquet";

/// Footer key marking a file that repeats the rows of its sibling files.
pub const COMBINED_KEY: &str = "cnpj.combined";

/// Output name for a raw source: dots become underscores, then `.parquet`.
///
/// `K3241.K03200Y0.D40113.EMPRECSV` -> `K3241_K03200Y0_D40113_EMPRECSV.parquet`
pub fn columnar_file_name(source_name: &str) -> String {
    format!("{}.{COLUMNAR_EXTENSION}", source_name.replace('.', "_"))
}

/// Parquet files directly under `dir`, sorted by file name.
pub fn list_columnar_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    let entries = fs::read_dir(dir).map_err(|e| IoError::from_io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IoError::from_io(dir, e))?;
        let path = entry.path();
        let is_parquet = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(COLUMNAR_EXTENSION));
        if is_parquet && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Does the footer of `path` carry [`COMBINED_KEY`]? Only the footer is read.
pub fn is_combined_file(path: &Path) -> Result<bool, IoError> {
    let file = File::open(path).map_err(|e| IoError::from_io(path, e))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| IoError::parquet(path, e))?;
    Ok(has_combined_key(builder.metadata().file_metadata()))
}

fn has_combined_key(metadata: &FileMetaData) -> bool {
    metadata
        .key_value_metadata()
        .is_some_and(|kv| kv.iter().any(|e| e.key == COMBINED_KEY && e.value.as_deref() == Some("true")))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

pub struct ColumnarWriter {
    path: PathBuf,
    schema: SchemaRef,
    builders: Vec<StringBuilder>,
    buffered: usize,
    batch_size: usize,
    rows: u64,
    writer: ArrowWriter<AtomicFile>,
}

impl ColumnarWriter {
    /// Start a file with one text column per name. Nothing appears at `path`
    /// until `finish()` succeeds.
    pub fn create(path: &Path, columns: &[String], batch_size: usize) -> Result<Self, IoError> {
        Self::create_with(path, columns, batch_size, false)
    }

    /// Like `create`, but the footer carries [`COMBINED_KEY`] so readers can
    /// tell this file apart from the per-source files it duplicates.
    pub fn create_combined(path: &Path, columns: &[String], batch_size: usize) -> Result<Self, IoError> {
        Self::create_with(path, columns, batch_size, true)
    }

    fn create_with(path: &Path, columns: &[String], batch_size: usize, combined: bool) -> Result<Self, IoError> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|name| Field::new(name.as_str(), DataType::Utf8, true))
            .collect();
        let schema: SchemaRef = Arc::new(ArrowSchema::new(fields));

        let metadata = combined.then(|| vec![KeyValue::new(COMBINED_KEY.to_string(), "true".to_string())]);
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_key_value_metadata(metadata)
            .build();

        let file = AtomicFile::create(path)?;
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
            .map_err(|e| IoError::parquet(path, e))?;

        let batch_size = batch_size.max(1);
        Ok(Self {
            path: path.to_path_buf(),
            schema,
            builders: columns.iter().map(|_| StringBuilder::new()).collect(),
            buffered: 0,
            batch_size,
            rows: 0,
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append one row; `fields` must have one value per column.
    pub fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), IoError> {
        if fields.len() != self.builders.len() {
            return Err(IoError::Parquet {
                path: self.path.clone(),
                message: format!(
                    "row has {} values for {} columns",
                    fields.len(),
                    self.builders.len()
                ),
            });
        }

        for (builder, value) in self.builders.iter_mut().zip(fields) {
            let value = value.as_ref();
            if value.is_empty() {
                builder.append_null();
            } else {
                builder.append_value(value);
            }
        }

        self.buffered += 1;
        self.rows += 1;
        if self.buffered >= self.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<(), IoError> {
        if self.buffered == 0 {
            return Ok(());
        }
        let columns: Vec<ArrayRef> = self
            .builders
            .iter_mut()
            .map(|b| Arc::new(b.finish()) as ArrayRef)
            .collect();
        let batch = RecordBatch::try_new(self.schema.clone(), columns)
            .map_err(|e| IoError::parquet(&self.path, e))?;
        self.writer
            .write(&batch)
            .map_err(|e| IoError::parquet(&self.path, e))?;
        self.buffered = 0;
        Ok(())
    }

    /// Write the footer and move the file into place. Returns the row count.
    pub fn finish(mut self) -> Result<u64, IoError> {
        self.flush_batch()?;
        let rows = self.rows;
        let path = self.path;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| IoError::parquet(&path, e))?;
        file.commit()?;
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

struct CurrentBatch {
    identifiers: ArrayRef,
    names: ArrayRef,
    len: usize,
    pos: usize,
}

/// Streams `CompanyRecord`s out of a columnar file, one batch in memory.
pub struct ColumnarReader {
    path: PathBuf,
    identifier_column: String,
    name_column: String,
    num_rows: u64,
    combined: bool,
    batches: ParquetRecordBatchReader,
    current: Option<CurrentBatch>,
    failed: bool,
}

impl ColumnarReader {
    /// Open `path`, reading only `identifier_column` and `name_column`.
    pub fn open(path: &Path, identifier_column: &str, name_column: &str) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|e| IoError::from_io(path, e))?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| IoError::parquet(path, e))?;

        let schema = builder.schema().clone();
        let id_idx = text_column_index(path, &schema, identifier_column)?;
        let name_idx = text_column_index(path, &schema, name_column)?;

        let num_rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
        let combined = has_combined_key(builder.metadata().file_metadata());
        let mask = ProjectionMask::roots(builder.parquet_schema(), [id_idx, name_idx]);
        let batches = builder
            .with_projection(mask)
            .with_batch_size(DEFAULT_BATCH_SIZE)
            .build()
            .map_err(|e| IoError::parquet(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            identifier_column: identifier_column.to_string(),
            name_column: name_column.to_string(),
            num_rows,
            combined,
            batches,
            current: None,
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Written by [`ColumnarWriter::create_combined`].
    pub fn is_combined(&self) -> bool {
        self.combined
    }

    /// Row count from the file footer.
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    /// Next record in file order. Null identifiers and names read as empty.
    pub fn next_record(&mut self) -> Result<Option<CompanyRecord>, IoError> {
        loop {
            if let Some(cur) = self.current.as_mut() {
                if cur.pos < cur.len {
                    let i = cur.pos;
                    cur.pos += 1;
                    return Ok(Some(CompanyRecord::new(
                        string_at(&cur.identifiers, i).unwrap_or_default(),
                        string_at(&cur.names, i).unwrap_or_default(),
                    )));
                }
            }

            let batch = match self.batches.next() {
                Some(batch) => batch.map_err(|e| IoError::parquet(&self.path, e))?,
                None => return Ok(None),
            };
            self.current = Some(self.load_batch(&batch)?);
        }
    }

    fn load_batch(&self, batch: &RecordBatch) -> Result<CurrentBatch, IoError> {
        let column = |name: &str| {
            batch.column_by_name(name).cloned().ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
        };
        Ok(CurrentBatch {
            identifiers: column(&self.identifier_column)?,
            names: column(&self.name_column)?,
            len: batch.num_rows(),
            pos: 0,
        })
    }
}

impl Iterator for ColumnarReader {
    type Item = Result<CompanyRecord, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_record().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

fn text_column_index(path: &Path, schema: &ArrowSchema, name: &str) -> Result<usize, IoError> {
    let idx = schema.index_of(name).map_err(|_| IoError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })?;
    match schema.field(idx).data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => Ok(idx),
        other => Err(IoError::Parquet {
            path: path.to_path_buf(),
            message: format!("column '{name}' is {other}, expected text"),
        }),
    }
}

fn string_at(array: &ArrayRef, i: usize) -> Option<&str> {
    if array.is_null(i) {
        return None;
    }
    if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        return Some(a.value(i));
    }
    array
        .as_any()
        .downcast_ref::<LargeStringArray>()
        .map(|a| a.value(i))
}
