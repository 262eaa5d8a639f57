//! Headerless, delimited registry extracts in a legacy single-byte encoding.
//!
//! Rows are split on raw bytes first and each field is decoded afterwards.
//! The delimiter and quote are ASCII, so this is exact for Latin-1 and
//! UTF-8 alike, and it lets us stream a file without decoding it up front.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::error::IoError;

/// Text encoding of a raw extract.
///
/// Latin-1 is kept apart from encoding_rs, which maps every Latin-1 label to
/// windows-1252 and so turns bytes 0x80-0x9F into punctuation. Here each
/// byte decodes to the code point of the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1,
    Other(&'static Encoding),
}

/// WHATWG labels that name ISO-8859-1.
const LATIN1_LABELS: &[&str] = &[
    "latin1",
    "l1",
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "iso-ir-100",
    "csisolatin1",
    "ibm819",
    "cp819",
];

impl TextEncoding {
    /// Resolve an encoding label (`latin1`, `iso-8859-1`, `utf-8`, ...).
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            return Some(Self::Latin1);
        }
        Encoding::for_label(label.as_bytes()).map(Self::Other)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Latin1 => "ISO-8859-1",
            Self::Other(encoding) => encoding.name(),
        }
    }

    /// `None` when `bytes` is not valid in this encoding. Latin-1 never fails.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            Self::Other(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
        }
    }
}

/// How a raw extract is laid out on disk.
#[derive(Debug, Clone, Copy)]
pub struct RawFormat {
    pub delimiter: u8,
    pub encoding: TextEncoding,
    /// Every row must have exactly this many fields.
    pub field_count: usize,
}

impl RawFormat {
    pub fn new(delimiter: u8, encoding: TextEncoding, field_count: usize) -> Self {
        Self { delimiter, encoding, field_count }
    }
}

/// One decoded row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line where the row starts.
    pub line: u64,
    pub fields: Vec<String>,
}

pub struct RawReader {
    path: PathBuf,
    format: RawFormat,
    reader: csv::Reader<BufReader<File>>,
    record: csv::ByteRecord,
    failed: bool,
}

impl RawReader {
    pub fn open(path: &Path, format: RawFormat) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|e| IoError::from_io(path, e))?;
        let reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(file));

        Ok(Self {
            path: path.to_path_buf(),
            format,
            reader,
            record: csv::ByteRecord::new(),
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next row. `Ok(None)` at end of file.
    pub fn next_row(&mut self) -> Result<Option<RawRow>, IoError> {
        let more = self.reader.read_byte_record(&mut self.record).map_err(|e| IoError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        if !more {
            return Ok(None);
        }

        let line = self.record.position().map(|p| p.line()).unwrap_or(0);

        if self.record.len() != self.format.field_count {
            return Err(IoError::FieldCount {
                path: self.path.clone(),
                line,
                expected: self.format.field_count,
                found: self.record.len(),
            });
        }

        let mut fields = Vec::with_capacity(self.record.len());
        for bytes in self.record.iter() {
            let text = self.format.encoding.decode(bytes).ok_or_else(|| IoError::Encoding {
                path: self.path.clone(),
                line,
                encoding: self.format.encoding.name(),
            })?;
            fields.push(text);
        }

        Ok(Some(RawRow { line, fields }))
    }
}

impl Iterator for RawReader {
    type Item = Result<RawRow, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_row().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}
