use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cnpj_core::{Schema, DEFAULT_PROJECTION};
use cnpj_io::{ExportFormat, TextEncoding, DEFAULT_CANDIDATE_COLUMN};

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Paths and layouts for every stage. Each section has defaults, so an empty
/// file is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub lookup: LookupConfig,
    pub generate: GenerateConfig,
}

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| PipelineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, validate and resolve relative paths against the file's directory.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let input = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigParse(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml(&input)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    /// Make every relative path relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.ingest.input_dir,
            &mut self.ingest.output_dir,
            &mut self.lookup.candidates,
            &mut self.lookup.columnar_dir,
            &mut self.lookup.export,
            &mut self.generate.output,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.ingest.validate()?;
        self.lookup.validate()?;
        self.generate.validate()?;

        if self.lookup.columnar_dir == self.ingest.output_dir {
            check_lookup_columns(&self.ingest, &self.lookup)?;
        }
        Ok(())
    }

    /// The lookup section pointed at ingest's output, as a full run reads it.
    pub fn chained_lookup(&self) -> Result<LookupConfig, PipelineError> {
        if self.lookup.columnar_dir != self.ingest.output_dir {
            log::warn!(
                "lookup.columnar_dir ({}) differs from ingest.output_dir; scanning {}",
                self.lookup.columnar_dir.display(),
                self.ingest.output_dir.display()
            );
        }
        let lookup = LookupConfig {
            columnar_dir: self.ingest.output_dir.clone(),
            ..self.lookup.clone()
        };
        check_lookup_columns(&self.ingest, &lookup)?;
        Ok(lookup)
    }

    /// Combined file name to skip (or use) during lookup.
    pub fn combined_file(&self) -> Option<&str> {
        self.ingest.combined_file.as_deref()
    }
}

/// Lookup reads what ingest wrote: its columns must survive projection.
fn check_lookup_columns(ingest: &IngestConfig, lookup: &LookupConfig) -> Result<(), PipelineError> {
    let columns = ingest.projected_columns();
    for column in [&lookup.identifier_column, &lookup.name_column] {
        if !columns.contains(column) {
            return Err(PipelineError::ConfigValidation(format!(
                "lookup column '{column}' is not written by ingest (columns: {})",
                columns.join(", ")
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Directory of raw extracts; every regular file in it is converted.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub delimiter: String,
    /// Encoding label (`latin1`, `utf-8`, ...).
    pub encoding: String,
    /// Column names, in file order. Sources carry no header row.
    pub schema: Schema,
    /// Columns to keep. Empty keeps the whole schema.
    pub projection: Vec<String>,
    /// Also write every projected row to this file in `output_dir`.
    pub combined_file: Option<String>,
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            delimiter: ";".into(),
            encoding: "latin1".into(),
            schema: Schema::default(),
            projection: DEFAULT_PROJECTION.iter().map(|s| s.to_string()).collect(),
            combined_file: None,
            batch_size: cnpj_io::columnar::DEFAULT_BATCH_SIZE,
        }
    }
}

impl IngestConfig {
    pub fn delimiter_byte(&self) -> Result<u8, PipelineError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() && *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(*b),
            _ => Err(PipelineError::ConfigValidation(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ))),
        }
    }

    pub fn encoding(&self) -> Result<TextEncoding, PipelineError> {
        TextEncoding::for_label(&self.encoding).ok_or_else(|| {
            PipelineError::ConfigValidation(format!("unknown encoding '{}'", self.encoding))
        })
    }

    /// Columns written to the columnar files.
    pub fn projected_columns(&self) -> Vec<String> {
        if self.projection.is_empty() {
            self.schema.columns().to_vec()
        } else {
            self.projection.clone()
        }
    }

    /// Schema positions of `projected_columns()`.
    pub fn projection_indices(&self) -> Result<Vec<usize>, PipelineError> {
        self.projected_columns()
            .iter()
            .map(|name| {
                self.schema.index_of(name).ok_or_else(|| {
                    PipelineError::ConfigValidation(format!(
                        "projection column '{name}' is not in the schema"
                    ))
                })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.delimiter_byte()?;
        self.encoding()?;

        if self.schema.is_empty() {
            return Err(PipelineError::ConfigValidation("ingest.schema is empty".into()));
        }
        if let Some(dup) = self.schema.first_duplicate() {
            return Err(PipelineError::ConfigValidation(format!(
                "ingest.schema lists '{dup}' twice"
            )));
        }
        let indices = self.projection_indices()?;
        let mut seen = indices.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != indices.len() {
            return Err(PipelineError::ConfigValidation(
                "ingest.projection lists a column twice".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::ConfigValidation("ingest.batch_size must be > 0".into()));
        }
        if self.input_dir == self.output_dir {
            return Err(PipelineError::ConfigValidation(
                "ingest.input_dir and ingest.output_dir must differ".into(),
            ));
        }
        if let Some(name) = &self.combined_file {
            let path = Path::new(name);
            let is_plain_name = path.file_name().map(|f| f == path.as_os_str()).unwrap_or(false);
            let is_parquet = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(cnpj_io::columnar::COLUMNAR_EXTENSION));
            if !is_plain_name || !is_parquet {
                return Err(PipelineError::ConfigValidation(format!(
                    "ingest.combined_file must be a bare file name ending in .parquet, got '{name}'"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    /// Spreadsheet or delimited text holding the candidate identifiers.
    pub candidates: PathBuf,
    pub candidate_column: String,
    /// Workbook sheet; the first sheet when absent.
    pub sheet: Option<String>,
    pub columnar_dir: PathBuf,
    pub identifier_column: String,
    pub name_column: String,
    /// Strip punctuation from candidates (`11.222.333/0001-81`).
    pub digits_only: bool,
    /// Scan only the combined file instead of the per-source files.
    pub use_combined: bool,
    /// `.xlsx` or `.csv`.
    pub export: PathBuf,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            candidates: PathBuf::from("cnpj/cnpjs.csv"),
            candidate_column: DEFAULT_CANDIDATE_COLUMN.into(),
            sheet: None,
            columnar_dir: PathBuf::from("output"),
            identifier_column: DEFAULT_PROJECTION[0].into(),
            name_column: DEFAULT_PROJECTION[1].into(),
            digits_only: false,
            use_combined: false,
            export: PathBuf::from("nome_cnpj.xlsx"),
        }
    }
}

impl LookupConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (key, value) in [
            ("candidate_column", &self.candidate_column),
            ("identifier_column", &self.identifier_column),
            ("name_column", &self.name_column),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::ConfigValidation(format!("lookup.{key} is empty")));
            }
        }
        ExportFormat::from_path(&self.export)
            .map_err(|e| PipelineError::ConfigValidation(format!("lookup.export: {e}")))?;
        Ok(())
    }

    /// Header row of the export.
    pub fn export_headers(&self) -> [&str; 2] {
        [self.identifier_column.as_str(), self.name_column.as_str()]
    }
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    pub output: PathBuf,
    pub column: String,
    pub count: usize,
    /// Fixed seed for reproducible files; random when absent.
    pub seed: Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("cnpj/cnpjs.csv"),
            column: DEFAULT_CANDIDATE_COLUMN.into(),
            count: 10_000,
            seed: None,
        }
    }
}

impl GenerateConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.count == 0 {
            return Err(PipelineError::ConfigValidation("generate.count must be > 0".into()));
        }
        if self.count > crate::generate::MAX_GENERATED {
            return Err(PipelineError::ConfigValidation(format!(
                "generate.count must be <= {}",
                crate::generate::MAX_GENERATED
            )));
        }
        if self.column.trim().is_empty() {
            return Err(PipelineError::ConfigValidation("generate.column is empty".into()));
        }
        Ok(())
    }
}
