use std::path::PathBuf;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

/// One columnar file written by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub rows: u64,
    /// BLAKE3 of the written file; equal digests mean byte-identical output.
    pub blake3: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_at: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub columns: Vec<String>,
    pub files: Vec<IngestedFile>,
    pub combined: Option<IngestedFile>,
    pub total_rows: u64,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub rows: u64,
    pub matched: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupReport {
    pub run_at: String,
    pub candidates: PathBuf,
    /// Non-empty candidate values read.
    pub candidate_count: usize,
    /// Distinct roots after collapsing duplicates.
    pub root_count: usize,
    pub files: Vec<ScannedFile>,
    pub rows_scanned: u64,
    pub matched: usize,
    pub export: PathBuf,
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub output: PathBuf,
    pub count: usize,
    pub seed: Option<u64>,
}
