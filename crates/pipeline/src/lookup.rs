//! Filter the columnar store down to companies whose root was asked for.

use std::path::{Path, PathBuf};

use cnpj_core::{normalize_identifier, CompanyRecord, RootSet};
use cnpj_io::{export_matches, is_combined_file, list_columnar_files, load_candidates, ColumnarReader};

use crate::config::LookupConfig;
use crate::error::PipelineError;
use crate::model::{LookupReport, ScannedFile};
use crate::progress::{Progress, ROW_STEP};

/// Candidate roots plus how many non-empty candidates produced them.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub count: usize,
    pub roots: RootSet,
}

/// Read the candidate file and collapse it to a root set.
///
/// Values that normalize to nothing are skipped; the empty root would
/// otherwise match every blank identifier.
pub fn load_root_set(config: &LookupConfig) -> Result<Candidates, PipelineError> {
    let raw = load_candidates(&config.candidates, &config.candidate_column, config.sheet.as_deref())?;

    let mut candidates = Candidates::default();
    for value in &raw {
        let id = normalize_identifier(value, config.digits_only);
        if id.is_empty() {
            continue;
        }
        candidates.count += 1;
        candidates.roots.insert_identifier(&id);
    }
    log::info!(
        "{} candidate(s) from {} -> {} distinct root(s)",
        candidates.count,
        config.candidates.display(),
        candidates.roots.len()
    );
    Ok(candidates)
}

/// Columnar files to scan, in discovery order.
///
/// A combined file repeats the rows of every other file, so it is either the
/// only input or no input. It is recognised by name when `combined_file` is
/// given and by its footer mark otherwise.
pub fn lookup_files(config: &LookupConfig, combined_file: Option<&str>) -> Result<Vec<PathBuf>, PipelineError> {
    if !config.columnar_dir.is_dir() {
        return Err(PipelineError::MissingDirectory(config.columnar_dir.clone()));
    }

    let mut per_source = Vec::new();
    let mut combined = Vec::new();
    for path in list_columnar_files(&config.columnar_dir)? {
        let named = combined_file.is_some_and(|name| path.file_name().is_some_and(|n| n == name));
        if named || is_combined_file(&path)? {
            combined.push(path);
        } else {
            per_source.push(path);
        }
    }

    if !config.use_combined {
        if !combined.is_empty() {
            log::debug!("skipping {} combined file(s)", combined.len());
        }
        return Ok(per_source);
    }

    if let Some(name) = combined_file {
        return Ok(vec![config.columnar_dir.join(name)]);
    }
    match combined.len() {
        1 => Ok(combined),
        0 => Err(PipelineError::ConfigValidation(format!(
            "lookup.use_combined is set but {} holds no combined file",
            config.columnar_dir.display()
        ))),
        n => Err(PipelineError::ConfigValidation(format!(
            "lookup.use_combined is set but {} holds {n} combined files; set ingest.combined_file",
            config.columnar_dir.display()
        ))),
    }
}

/// Membership is decided on the root alone; the rest of the identifier is
/// ignored.
pub fn is_match(record: &CompanyRecord, roots: &RootSet) -> bool {
    roots.contains_root_of(&record.identifier)
}

/// Matched records in file order, then row order, plus per-file counts.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    pub records: Vec<CompanyRecord>,
    pub files: Vec<ScannedFile>,
}

impl MatchSet {
    pub fn rows_scanned(&self) -> u64 {
        self.files.iter().map(|f| f.rows).sum()
    }
}

/// Stream every file through [`is_match`]. Nothing is written.
pub fn collect_matches(
    files: &[PathBuf],
    config: &LookupConfig,
    roots: &RootSet,
    progress: &mut dyn Progress,
) -> Result<MatchSet, PipelineError> {
    let mut set = MatchSet::default();
    progress.stage("lookup", files.len());

    for path in files {
        let name = display_name(path);
        let mut reader = ColumnarReader::open(path, &config.identifier_column, &config.name_column)?;
        progress.file_started(&name, Some(reader.num_rows()));

        let mut rows = 0u64;
        let mut matched = 0u64;
        while let Some(record) = reader.next_record()? {
            rows += 1;
            if rows % ROW_STEP == 0 {
                progress.rows(ROW_STEP);
            }
            if is_match(&record, roots) {
                matched += 1;
                set.records.push(record);
            }
        }
        progress.rows(rows % ROW_STEP);
        progress.file_finished(&name, rows);

        log::info!("{}: {} of {} rows matched", path.display(), matched, rows);
        set.files.push(ScannedFile {
            path: path.clone(),
            rows,
            matched,
        });
    }

    progress.stage_finished("lookup");
    Ok(set)
}

/// Load candidates, filter every columnar file, then export.
///
/// The export is only written once every file was read without error.
pub fn run_lookup(
    config: &LookupConfig,
    combined_file: Option<&str>,
    progress: &mut dyn Progress,
) -> Result<LookupReport, PipelineError> {
    config.validate()?;

    let candidates = load_root_set(config)?;
    let files = lookup_files(config, combined_file)?;
    if files.is_empty() {
        log::warn!("no columnar files in {}", config.columnar_dir.display());
    }

    let set = collect_matches(&files, config, &candidates.roots, progress)?;
    let rows_scanned = set.rows_scanned();

    export_matches(&config.export, config.export_headers(), &set.records)?;
    log::info!(
        "exported {} matching row(s) to {}",
        set.records.len(),
        config.export.display()
    );

    Ok(LookupReport {
        run_at: chrono::Utc::now().to_rfc3339(),
        candidates: config.candidates.clone(),
        candidate_count: candidates.count,
        root_count: candidates.roots.len(),
        matched: set.records.len(),
        files: set.files,
        rows_scanned,
        export: config.export.clone(),
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
