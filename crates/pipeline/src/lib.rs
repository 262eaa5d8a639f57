//! Registry pipeline: raw extracts -> Parquet -> root filter -> spreadsheet.
//!
//! Each stage takes its own config section and a [`Progress`] observer, so
//! the stages can run alone or chained by [`run_pipeline`].

pub mod config;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod lookup;
pub mod model;
pub mod progress;

pub use config::{GenerateConfig, IngestConfig, LookupConfig, PipelineConfig};
pub use error::PipelineError;
pub use generate::{generate_identifiers, run_generate};
pub use ingest::run_ingest;
pub use lookup::{collect_matches, is_match, load_root_set, lookup_files, run_lookup, MatchSet};
pub use model::{GenerateReport, IngestReport, IngestedFile, LookupReport, ScannedFile};
pub use progress::Progress;

use serde::Serialize;

/// Both stage reports of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub ingest: IngestReport,
    pub lookup: LookupReport,
}

/// Ingest, then look up against what was just written.
///
/// Lookup scans `ingest.output_dir`, whatever `lookup.columnar_dir` says.
pub fn run_pipeline(config: &PipelineConfig, progress: &mut dyn Progress) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    let lookup_config = config.chained_lookup()?;
    let ingest = run_ingest(&config.ingest, progress)?;
    let lookup = run_lookup(&lookup_config, config.combined_file(), progress)?;
    Ok(PipelineReport { ingest, lookup })
}
