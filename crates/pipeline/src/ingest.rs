//! Raw extracts -> one Parquet file per source (plus an optional combined file).

use std::fs;
use std::path::{Path, PathBuf};

use cnpj_io::{columnar_file_name, ColumnarWriter, IoError, RawFormat, RawReader};

use crate::config::IngestConfig;
use crate::error::PipelineError;
use crate::model::{IngestReport, IngestedFile};
use crate::progress::{Progress, ROW_STEP};

/// Convert every file in `config.input_dir`.
///
/// Sources are processed in file-name order. A malformed row aborts the run;
/// the failing file's output is never written.
pub fn run_ingest(config: &IngestConfig, progress: &mut dyn Progress) -> Result<IngestReport, PipelineError> {
    config.validate()?;

    let format = RawFormat::new(config.delimiter_byte()?, config.encoding()?, config.schema.len());
    let indices = config.projection_indices()?;
    let columns = config.projected_columns();

    let sources = list_sources(&config.input_dir)?;
    fs::create_dir_all(&config.output_dir).map_err(|e| IoError::from_io(&config.output_dir, e))?;

    log::info!(
        "ingesting {} file(s) from {} into {} (columns: {})",
        sources.len(),
        config.input_dir.display(),
        config.output_dir.display(),
        columns.join(", ")
    );

    let mut combined = match &config.combined_file {
        Some(name) => {
            let clash = sources.iter().any(|s| columnar_file_name(&file_name(s)) == *name);
            if clash {
                return Err(PipelineError::ConfigValidation(format!(
                    "combined file '{name}' has the same name as a per-source output"
                )));
            }
            let path = config.output_dir.join(name);
            Some(ColumnarWriter::create_combined(&path, &columns, config.batch_size)?)
        }
        None => None,
    };

    progress.stage("ingest", sources.len());

    let mut files = Vec::with_capacity(sources.len());
    let mut total_rows = 0u64;

    for source in &sources {
        let name = file_name(source);
        let output = config.output_dir.join(columnar_file_name(&name));

        progress.file_started(&name, None);
        let rows = convert_file(
            source,
            &output,
            format,
            &indices,
            &columns,
            config.batch_size,
            combined.as_mut(),
            progress,
        )?;
        progress.file_finished(&name, rows);

        let blake3 = file_digest(&output)?;
        log::info!("{} -> {} ({} rows)", source.display(), output.display(), rows);

        total_rows += rows;
        files.push(IngestedFile {
            source: source.clone(),
            output,
            rows,
            blake3,
        });
    }

    let combined = match combined {
        Some(writer) => {
            let output = writer.path().to_path_buf();
            let rows = writer.finish()?;
            let blake3 = file_digest(&output)?;
            log::info!("combined {} rows into {}", rows, output.display());
            Some(IngestedFile {
                source: config.input_dir.clone(),
                output,
                rows,
                blake3,
            })
        }
        None => None,
    };

    progress.stage_finished("ingest");

    Ok(IngestReport {
        run_at: chrono::Utc::now().to_rfc3339(),
        input_dir: config.input_dir.clone(),
        output_dir: config.output_dir.clone(),
        columns,
        files,
        combined,
        total_rows,
    })
}

#[allow(clippy::too_many_arguments)]
fn convert_file(
    source: &Path,
    output: &Path,
    format: RawFormat,
    indices: &[usize],
    columns: &[String],
    batch_size: usize,
    mut combined: Option<&mut ColumnarWriter>,
    progress: &mut dyn Progress,
) -> Result<u64, PipelineError> {
    let mut reader = RawReader::open(source, format)?;
    let mut writer = ColumnarWriter::create(output, columns, batch_size)?;

    while let Some(row) = reader.next_row()? {
        let values: Vec<&str> = indices.iter().map(|&i| row.fields[i].as_str()).collect();
        writer.write_row(&values)?;
        if let Some(all) = combined.as_deref_mut() {
            all.write_row(&values)?;
        }
        if writer.rows() % ROW_STEP == 0 {
            progress.rows(ROW_STEP);
        }
    }

    let rows = writer.finish()?;
    progress.rows(rows % ROW_STEP);
    Ok(rows)
}

/// Regular, non-hidden files directly under `dir`, sorted by name.
pub fn list_sources(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingDirectory(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|e| IoError::from_io(dir, e))?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IoError::from_io(dir, e))?.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if !hidden && path.is_file() {
            sources.push(path);
        }
    }
    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(sources)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn file_digest(path: &Path) -> Result<String, PipelineError> {
    let file = fs::File::open(path).map_err(|e| IoError::from_io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    hasher
        .update_reader(file)
        .map_err(|e| IoError::from_io(path, e))?;
    Ok(hasher.finalize().to_hex().to_string())
}
